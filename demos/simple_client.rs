//! Simple IRC client example
//!
//! Connects to a server, joins a channel, answers CTCP VERSION, and echoes
//! a greeting to anyone who says `!ping`. Run with:
//!
//! ```sh
//! cargo run --example simple_client -- irc.libera.chat:6667 '#slirc-test'
//! ```

use std::env;
use std::thread;
use std::time::Duration;

use slirc_client::Client;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slirc_client=debug".into()),
        )
        .init();

    let mut args = env::args().skip(1);
    let address = args.next().unwrap_or_else(|| "127.0.0.1:6667".to_owned());
    let channel = args.next().unwrap_or_else(|| "#slirc-test".to_owned());

    let mut client = Client::new("slircbot", "slirc", Some("slirc example bot"));

    let chan = channel.clone();
    client.events.on_connect(move |conn| {
        println!("registered; joining {chan}");
        if let Err(e) = conn.join(&chan, None) {
            eprintln!("join failed: {e}");
        }
    });

    client.events.on_successful_join(|conn, chan| {
        let _ = conn.send(chan, "hello from slirc-client");
    });

    client.events.on_message(|conn, from, target, text| {
        println!("<{}> {target}: {text}", from.nick());
        if text.trim() == "!ping" {
            let _ = conn.send(target, &format!("{}: pong", from.nick()));
        }
    });

    client.events.on_ctcp_query(|conn, from, _target, tag, _msg| {
        if tag == "VERSION" {
            let _ = conn.ctcp_reply(from.nick(), "VERSION", Some("slirc-client 0.1"));
        }
    });

    client.events.on_nick_in_use(|conn, old| {
        let fallback = format!("{old}_");
        println!("nick {old} taken, trying {fallback}");
        conn.raw(&format!("NICK {fallback}")).is_ok()
    });

    println!("connecting to {address}");
    client.connect(&address, None)?;

    while client.poll()? {
        thread::sleep(Duration::from_millis(50));
    }

    println!("disconnected");
    Ok(())
}
