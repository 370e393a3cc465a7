//! End-to-end engine scenarios over an in-memory socket and manual clock:
//! feed server lines, poll, and assert on outbound traffic, tracked state,
//! and fired callbacks.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::{connected_client, MockSocket};
use slirc_client::{Client, ClientError, IrcUser};

type Log = Rc<RefCell<Vec<String>>>;

fn log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

#[test]
fn registration_sends_nick_and_user() {
    let clock = common::MockClock::new();
    let mut client = Client::with_clock("Neko", "neko", Some("A Cat"), Box::new(clock.clone()));
    let (socket, handle) = MockSocket::pair();
    client.connect_with(Box::new(socket), Some("hunter2")).unwrap();

    assert_eq!(
        handle.sent_lines(),
        vec!["PASS hunter2", "NICK Neko", "USER neko 0 * :A Cat"]
    );

    assert!(matches!(
        client.connect("127.0.0.1:6667", None),
        Err(ClientError::AlreadyConnected)
    ));
}

#[test]
fn ping_is_answered_with_pong_and_no_events() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client.events.on_message(move |_, _, _, _| seen.borrow_mut().push("message".into()));
    let seen = Rc::clone(&events);
    client.events.on_notice(move |_, _, _, _| seen.borrow_mut().push("notice".into()));
    let seen = Rc::clone(&events);
    client.events.on_connect(move |_| seen.borrow_mut().push("connect".into()));

    handle.push_line("PING :12345");
    assert!(client.poll().unwrap());

    assert_eq!(handle.sent_lines(), vec!["PONG :12345"]);
    assert!(events.borrow().is_empty());
}

#[test]
fn welcome_fires_on_connect() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client.events.on_connect(move |_| seen.borrow_mut().push("connect".into()));

    handle.push_line(":irc.example.net 001 Neko :Welcome to ExampleNet Neko!neko@host");
    client.poll().unwrap();
    assert_eq!(*events.borrow(), vec!["connect"]);
}

#[test]
fn long_privmsg_splits_into_two_reconstructable_lines() {
    let (mut client, handle, _clock) = connected_client("Neko");

    let payload = "A".repeat(500);
    client.send("#x", &payload).unwrap();

    let lines = handle.sent_lines();
    assert_eq!(lines.len(), 2);
    let mut rejoined = String::new();
    for line in &lines {
        assert!(line.len() <= slirc_client::LINE_BUDGET);
        let body = line.strip_prefix("PRIVMSG #x :").expect("split keeps the form");
        rejoined.push_str(body);
    }
    assert_eq!(rejoined, payload);
}

#[test]
fn self_join_creates_channel_and_fires_successful_join() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client
        .events
        .on_successful_join(move |_, chan| seen.borrow_mut().push(format!("joined {chan}")));
    let seen = Rc::clone(&events);
    client
        .events
        .on_join(move |_, user, chan| seen.borrow_mut().push(format!("join {} {chan}", user.nick())));

    handle.push_line(":Neko!u@h JOIN #test");
    client.poll().unwrap();

    assert_eq!(*events.borrow(), vec!["joined #test"]);
    let chan = client.channel("#test").expect("channel created");
    assert_eq!(chan.member_count(), 1);
    assert!(chan.has_member("Neko"));
    assert!(client.tracker().myself().in_channel("#test"));
}

#[test]
fn names_reply_tracks_users_and_prefixes() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client
        .events
        .on_name_list_end(move |_, chan| seen.borrow_mut().push(format!("names end {chan}")));

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":server 353 Neko = #x :@alice +bob carol");
    handle.push_line(":server 366 Neko #x :End of /NAMES list");
    client.poll().unwrap();

    let chan = client.channel("#x").unwrap();
    assert!(chan.has_member("alice"));
    assert!(chan.has_member("bob"));
    assert!(chan.has_member("carol"));
    assert_eq!(chan.mode_of("alice"), Some('@'));
    assert_eq!(chan.mode_of("bob"), Some('+'));
    assert_eq!(chan.mode_of("carol"), None);
    assert_eq!(client.tracker().user_count(), 3);

    assert_eq!(*events.borrow(), vec!["names end #x"]);
    assert_eq!(handle.sent_lines(), vec!["WHO #x"]);
}

#[test]
fn isupport_prefix_governs_names_parsing() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":s 005 Neko PREFIX=(ohv)@%+ :are supported by this server");
    client.poll().unwrap();

    assert_eq!(client.network_info().user_modes(), &['o', 'h', 'v']);
    assert_eq!(client.network_info().user_prefixes(), &['@', '%', '+']);

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":s 353 Neko = #x :%bob");
    client.poll().unwrap();

    let chan = client.channel("#x").unwrap();
    assert!(chan.has_member("bob"));
    assert_eq!(chan.mode_of("bob"), Some('%'));
}

#[test]
fn nick_rename_carries_channel_mode() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":alice!u@h JOIN #x");
    handle.push_line(":s MODE #x +o alice");
    handle.push_line(":alice!u@h NICK bob");
    client.poll().unwrap();

    let chan = client.channel("#x").unwrap();
    assert!(chan.has_member("bob"));
    assert!(!chan.has_member("alice"));
    assert_eq!(chan.mode_of("bob"), Some('@'));
    assert_eq!(chan.mode_of("alice"), None);

    let bob = client.get_user("bob").expect("renamed user tracked");
    assert!(bob.in_channel("#x"));
    assert!(client.get_user("alice").is_none());
}

#[test]
fn idle_timeout_pings_then_disconnects() {
    let (mut client, handle, clock) = connected_client("Neko");

    // Quiet but under the threshold: nothing happens.
    clock.advance(Duration::from_secs(29));
    assert!(client.poll().unwrap());
    assert!(handle.sent_lines().is_empty());

    // Threshold crossed: exactly one probe goes out.
    clock.advance(Duration::from_secs(1));
    assert!(client.poll().unwrap());
    assert_eq!(handle.sent_lines(), vec!["PING 12345"]);
    assert!(client.poll().unwrap());
    assert_eq!(handle.sent_lines(), vec!["PING 12345"]);

    // Another 30s of silence after the probe: give up.
    clock.advance(Duration::from_secs(30));
    assert!(!client.poll().unwrap());
    assert!(!client.is_connected());
    assert!(!client.poll().unwrap());
}

#[test]
fn inbound_traffic_resets_the_keepalive() {
    let (mut client, handle, clock) = connected_client("Neko");

    clock.advance(Duration::from_secs(30));
    client.poll().unwrap();
    assert_eq!(handle.sent_lines(), vec!["PING 12345"]);
    handle.drain_sent();

    // The server answers; the probe state clears.
    handle.push_line(":s PONG s :12345");
    client.poll().unwrap();

    // The next silent stretch probes again instead of disconnecting.
    clock.advance(Duration::from_secs(30));
    assert!(client.poll().unwrap());
    assert_eq!(handle.sent_lines(), vec!["PING 12345"]);
}

#[test]
fn join_throttle_reports_channel_and_seconds() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client
        .events
        .on_join_too_soon(move |_, chan, secs| seen.borrow_mut().push(format!("{chan} {secs}")));

    handle.push_line(":s 495 Neko #test :You must wait 5 seconds after being kicked to rejoin (+J)");
    client.poll().unwrap();
    assert_eq!(*events.borrow(), vec!["#test 5"]);
}

#[test]
fn privmsg_fires_on_message_with_sender_identity() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client.events.on_message(move |_, from, target, text| {
        seen.borrow_mut().push(format!("{} {target} {text}", from));
    });

    handle.push_line(":alice!ident@host PRIVMSG #x :hello there");
    client.poll().unwrap();
    assert_eq!(*events.borrow(), vec!["alice!ident@host #x hello there"]);
}

#[test]
fn ctcp_query_and_reply_are_split_from_plain_messages() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client.events.on_ctcp_query(move |_, from, _, tag, msg| {
        seen.borrow_mut().push(format!("query {} {tag} {msg:?}", from.nick()));
    });
    let seen = Rc::clone(&events);
    client.events.on_ctcp_reply(move |_, from, _, tag, msg| {
        seen.borrow_mut().push(format!("reply {} {tag} {msg:?}", from.nick()));
    });

    handle.push_line(":alice!u@h PRIVMSG Neko :\u{1}VERSION\u{1}");
    handle.push_line(":alice!u@h NOTICE Neko :\u{1}VERSION slirc 0.1\u{1}");
    client.poll().unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "query alice VERSION None",
            "reply alice VERSION Some(\"slirc 0.1\")"
        ]
    );
}

#[test]
fn callbacks_can_reply_through_the_connection() {
    let (mut client, handle, _clock) = connected_client("Neko");

    client.events.on_ctcp_query(|conn, from, _, tag, _| {
        if tag == "VERSION" {
            conn.ctcp_reply(from.nick(), "VERSION", Some("slirc-client 0.1"))
                .unwrap();
        }
    });

    handle.push_line(":alice!u@h PRIVMSG Neko :\u{1}VERSION\u{1}");
    client.poll().unwrap();
    assert_eq!(
        handle.sent_lines(),
        vec!["NOTICE alice :\u{1}VERSION slirc-client 0.1\u{1}"]
    );
}

#[test]
fn part_and_kick_update_membership() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client
        .events
        .on_part(move |_, user, chan| seen.borrow_mut().push(format!("part {} {chan}", user.nick())));
    let seen = Rc::clone(&events);
    client.events.on_kick(move |_, kicker, chan, kicked, reason| {
        seen.borrow_mut()
            .push(format!("kick {} {chan} {kicked} {reason:?}", kicker.nick()));
    });

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":alice!u@h JOIN #x");
    handle.push_line(":bob!u@h JOIN #x");
    handle.push_line(":alice!u@h PART #x");
    handle.push_line(":Neko!u@h KICK #x bob :flooding");
    client.poll().unwrap();

    let chan = client.channel("#x").unwrap();
    assert!(!chan.has_member("alice"));
    assert!(!chan.has_member("bob"));
    assert!(client.get_user("alice").is_none());
    assert!(client.get_user("bob").is_none());
    assert_eq!(
        *events.borrow(),
        vec!["part alice #x", "kick Neko #x bob Some(\"flooding\")"]
    );
}

#[test]
fn being_kicked_destroys_the_channel() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":alice!u@h JOIN #x");
    handle.push_line(":op!u@h KICK #x Neko :begone");
    client.poll().unwrap();

    assert!(client.channel("#x").is_none());
    assert!(!client.tracker().myself().in_channel("#x"));
}

#[test]
fn quit_removes_user_from_all_channels() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client.events.on_quit(move |_, user, msg| {
        seen.borrow_mut().push(format!("quit {} {msg:?}", user.nick()));
    });

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":Neko!u@h JOIN #y");
    handle.push_line(":alice!u@h JOIN #x");
    handle.push_line(":alice!u@h JOIN #y");
    handle.push_line(":alice!u@h QUIT :Leaving");
    client.poll().unwrap();

    assert!(client.get_user("alice").is_none());
    assert!(!client.channel("#x").unwrap().has_member("alice"));
    assert!(!client.channel("#y").unwrap().has_member("alice"));
    assert_eq!(*events.borrow(), vec!["quit alice Some(\"Leaving\")"]);
}

#[test]
fn taking_a_mode_requests_whois_resync() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":alice!u@h JOIN #x");
    handle.push_line(":s MODE #x +o alice");
    handle.push_line(":s MODE #x -o alice");
    client.poll().unwrap();

    assert_eq!(client.channel("#x").unwrap().mode_of("alice"), None);
    assert_eq!(handle.sent_lines(), vec!["WHOIS alice"]);
}

#[test]
fn server_error_line_tears_down_and_surfaces() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line("ERROR :Closing Link: flooding");
    let err = client.poll().unwrap_err();
    assert!(matches!(err, ClientError::Server(ref text) if text.contains("Closing Link")));

    assert!(!client.is_connected());
    assert!(client.channel("#x").is_none());
    assert!(!client.poll().unwrap());
}

#[test]
fn unhandled_nick_collision_disconnects() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":s 433 * Neko :Nickname is already in use");
    let err = client.poll().unwrap_err();
    assert!(matches!(err, ClientError::NickInUseUnhandled(ref nick) if nick == "Neko"));
    assert!(!client.is_connected());
}

#[test]
fn handled_nick_collision_keeps_the_session() {
    let (mut client, handle, _clock) = connected_client("Neko");

    client.events.on_nick_in_use(|conn, old| {
        conn.raw(&format!("NICK {old}_")).unwrap();
        true
    });

    handle.push_line(":s 433 * Neko :Nickname is already in use");
    assert!(client.poll().unwrap());
    assert_eq!(handle.sent_lines(), vec!["NICK Neko_"]);
    assert!(client.is_connected());
}

#[test]
fn whois_reply_upserts_identity() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client
        .events
        .on_whois_reply(move |_, user: &IrcUser| seen.borrow_mut().push(user.to_string()));
    let seen = Rc::clone(&events);
    client
        .events
        .on_whois_idle_reply(move |_, nick, secs| seen.borrow_mut().push(format!("{nick} idle {secs}")));
    let seen = Rc::clone(&events);
    client
        .events
        .on_whois_end(move |_, nick| seen.borrow_mut().push(format!("end {nick}")));

    handle.push_line(":s 311 Neko alice ident example.org * :Alice Liddell");
    handle.push_line(":s 317 Neko alice 42 1609459200 :seconds idle, signon time");
    handle.push_line(":s 318 Neko alice :End of /WHOIS list");
    client.poll().unwrap();

    assert_eq!(
        *events.borrow(),
        vec!["alice!ident@example.org", "alice idle 42", "end alice"]
    );
}

#[test]
fn who_reply_fills_identity_and_channel_mode() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":s 353 Neko = #x :alice");
    handle.push_line(":s 352 Neko #x ident example.org irc.s alice H@ :0 Alice Liddell");
    client.poll().unwrap();

    let alice = client.get_user("alice").unwrap();
    assert_eq!(alice.user(), "ident");
    assert_eq!(alice.host(), "example.org");
    assert_eq!(alice.real_name(), "Alice Liddell");
    assert_eq!(client.channel("#x").unwrap().mode_of("alice"), Some('@'));
}

#[test]
fn displayed_host_updates_self() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":s 396 Neko cloaked/neko :is now your displayed host");
    client.poll().unwrap();
    assert_eq!(client.tracker().myself().host(), "cloaked/neko");
}

#[test]
fn motd_and_topic_events_fire_in_order() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client.events.on_motd_start(move |_, t| seen.borrow_mut().push(format!("start {t}")));
    let seen = Rc::clone(&events);
    client.events.on_motd_line(move |_, t| seen.borrow_mut().push(format!("line {t}")));
    let seen = Rc::clone(&events);
    client.events.on_motd_end(move |_, t| seen.borrow_mut().push(format!("end {t}")));
    let seen = Rc::clone(&events);
    client.events.on_topic(move |_, c, t| seen.borrow_mut().push(format!("topic {c} {t}")));
    let seen = Rc::clone(&events);
    client.events.on_topic_info(move |_, c, who, at| {
        seen.borrow_mut().push(format!("info {c} {who} {at}"));
    });

    handle.push_line(":s 375 Neko :- server Message of the Day -");
    handle.push_line(":s 372 Neko :- Be excellent to each other");
    handle.push_line(":s 376 Neko :End of /MOTD command.");
    handle.push_line(":s 332 Neko #x :welcome to #x");
    handle.push_line(":s 333 Neko #x alice 1609459200");
    client.poll().unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "start - server Message of the Day -",
            "line - Be excellent to each other",
            "end End of /MOTD command.",
            "topic #x welcome to #x",
            "info #x alice 1609459200",
        ]
    );
}

#[test]
fn quit_is_idempotent_and_clears_state() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":Neko!u@h JOIN #x");
    handle.push_line(":s 396 Neko cloak :is now your displayed host");
    client.poll().unwrap();

    client.quit(Some("bye")).unwrap();
    client.quit(Some("bye again")).unwrap();

    let quits: Vec<_> = handle
        .sent_lines()
        .into_iter()
        .filter(|l| l.starts_with("QUIT"))
        .collect();
    assert_eq!(quits, vec!["QUIT :bye"]);

    assert!(!client.is_connected());
    assert!(client.channel("#x").is_none());
    assert_eq!(client.tracker().myself().host(), "");
    assert!(!client.poll().unwrap());
}

#[test]
fn peer_close_ends_the_session() {
    let (mut client, handle, _clock) = connected_client("Neko");
    handle.push_line(":Neko!u@h JOIN #x");
    client.poll().unwrap();

    handle.close();
    assert!(!client.poll().unwrap());
    assert!(client.channel("#x").is_none());
}

#[test]
fn malformed_line_is_dropped_but_session_lives() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line("@broken-tags-no-colon PING");
    handle.push_line("PING :still-here");
    assert!(client.poll().unwrap());
    assert_eq!(handle.sent_lines(), vec!["PONG :still-here"]);
}

#[test]
fn malformed_isupport_does_not_partially_apply() {
    let (mut client, handle, _clock) = connected_client("Neko");

    handle.push_line(":s 005 Neko NICKLEN=30 PREFIX=broken :are supported");
    assert!(client.poll().unwrap());
    assert_eq!(client.network_info().max_nick_len(), 0);

    handle.push_line(":s 005 Neko NICKLEN=30 :are supported");
    client.poll().unwrap();
    assert_eq!(client.network_info().max_nick_len(), 30);

    // And the negotiated limit now gates set_nick.
    let err = client.set_nick(&"N".repeat(31)).unwrap_err();
    assert!(matches!(err, ClientError::NickTooLong { .. }));
}

#[test]
fn online_nick_change_round_trips_through_the_server() {
    let (mut client, handle, _clock) = connected_client("Neko");

    client.set_nick("Neko2").unwrap();
    assert_eq!(handle.sent_lines(), vec!["NICK Neko2"]);
    // Still the old nick until the server confirms.
    assert_eq!(client.nick(), "Neko");

    handle.push_line(":Neko!u@h NICK Neko2");
    client.poll().unwrap();
    assert_eq!(client.nick(), "Neko2");
}

#[test]
fn user_and_real_name_are_fixed_while_connected() {
    let (mut client, _handle, _clock) = connected_client("Neko");
    assert!(matches!(
        client.set_user("other"),
        Err(ClientError::InUseWhileConnected("user"))
    ));
    assert!(matches!(
        client.set_real_name("Other"),
        Err(ClientError::InUseWhileConnected("real name"))
    ));
}

#[test]
fn invite_and_topic_change_carry_the_sender() {
    let (mut client, handle, _clock) = connected_client("Neko");
    let events = log();

    let seen = Rc::clone(&events);
    client.events.on_invite(move |_, sender, target, chan| {
        seen.borrow_mut().push(format!("invite {} {target} {chan}", sender.nick()));
    });
    let seen = Rc::clone(&events);
    client.events.on_topic_change(move |_, user, chan, topic| {
        seen.borrow_mut().push(format!("topic {} {chan} {topic}", user.nick()));
    });

    handle.push_line(":alice!u@h INVITE Neko #secret");
    handle.push_line(":alice!u@h TOPIC #x :fresh topic");
    client.poll().unwrap();

    assert_eq!(
        *events.borrow(),
        vec!["invite alice Neko #secret", "topic alice #x fresh topic"]
    );
}
