//! # slirc-client
//!
//! A single-connection IRC client engine for RFC 1459 / 2812 servers with
//! the common modern extensions (ISUPPORT, CTCP, server-initiated tags,
//! rejoin throttling).
//!
//! The engine sits between one TCP socket and the embedding application:
//! it frames and parses server lines, keeps a live model of the channels we
//! are in (members and their channel-user modes, negotiated via `005`),
//! splits oversized outbound messages across protocol lines, answers
//! PING, detects dead connections with its own keep-alive probe, and
//! delivers typed events to registered callbacks.
//!
//! ## Design
//!
//! - **Host-driven**: no threads, no timers. The host calls
//!   [`Client::poll`] in a loop; one poll performs one non-blocking read
//!   pass and everything that follows from it.
//! - **Narrow I/O seams**: the socket is a [`transport::Socket`] and time a
//!   [`transport::Clock`], so the whole engine runs against in-memory fakes
//!   in tests.
//! - **State before events**: callbacks always observe tracked state after
//!   the transition their event reports.
//!
//! ## Quick start
//!
//! ```no_run
//! use slirc_client::Client;
//!
//! let mut client = Client::new("mybot", "bot", None);
//! client.events.on_connect(|conn| {
//!     conn.join("#rust", None).ok();
//! });
//! client.events.on_message(|conn, from, target, text| {
//!     println!("<{}> {target}: {text}", from.nick());
//! });
//!
//! client.connect("irc.libera.chat:6667", None).unwrap();
//! while client.poll().unwrap() {
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! ```

#![deny(clippy::all)]

pub mod casemap;
pub mod channel;
pub mod client;
pub mod ctcp;
mod dispatch;
pub mod encode;
pub mod error;
pub mod event;
pub mod isupport;
pub mod line;
pub mod message;
pub mod response;
pub mod tracker;
pub mod transport;
pub mod user;

pub use self::casemap::{irc_eq, irc_to_lower};
pub use self::channel::Channel;
pub use self::client::{Client, Connection};
pub use self::ctcp::Ctcp;
pub use self::encode::LINE_BUDGET;
pub use self::error::{ClientError, Result};
pub use self::event::Events;
pub use self::isupport::NetworkInfo;
pub use self::line::MAX_LINE_LEN;
pub use self::message::MessageRef;
pub use self::response::Response;
pub use self::tracker::Tracker;
pub use self::transport::{Clock, RecvStatus, Socket, SystemClock, TcpSocket};
pub use self::user::IrcUser;
