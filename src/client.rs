//! The client engine.
//!
//! [`Client`] owns one connection and the registered event callbacks. The
//! host drives it by calling [`Client::poll`] in a loop: each poll performs
//! one non-blocking read pass, frames and parses the bytes, updates tracked
//! state, and fires callbacks. Outbound operations write synchronously, one
//! line at a time.
//!
//! [`Connection`] is everything callbacks may touch: the socket, the
//! tracker, negotiated network info, and every outbound operation. Keeping
//! it separate from the callback lists is what lets a callback send
//! messages and inspect state while the engine is mid-dispatch.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::channel::Channel;
use crate::dispatch;
use crate::encode;
use crate::error::{ClientError, Result};
use crate::event::{Event, Events};
use crate::isupport::NetworkInfo;
use crate::line::{LineBuffer, PullStatus};
use crate::tracker::Tracker;
use crate::transport::{Clock, Socket, SystemClock, TcpSocket};
use crate::user::IrcUser;

/// Inbound silence before we probe the server, and after the probe, before
/// we give up.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Token sent with keep-alive pings. Any inbound line answers the probe, so
/// the value carries no meaning.
const PING_TOKEN: &str = "12345";

/// The connection half of the engine: socket, tracked state, and every
/// outbound operation.
pub struct Connection {
    pub(crate) socket: Option<Box<dyn Socket>>,
    pub(crate) clock: Box<dyn Clock>,
    pub(crate) framer: LineBuffer,
    pub(crate) tracker: Tracker,
    pub(crate) info: NetworkInfo,
    pub(crate) last_net: Instant,
    pub(crate) timing_out: bool,
}

impl Connection {
    fn new(myself: IrcUser, clock: Box<dyn Clock>) -> Self {
        let last_net = clock.now();
        Self {
            socket: None,
            clock,
            framer: LineBuffer::new(),
            tracker: Tracker::new(myself),
            info: NetworkInfo::default(),
            last_net,
            timing_out: false,
        }
    }

    /// Whether a live transport is attached.
    pub fn is_connected(&self) -> bool {
        self.socket.as_ref().is_some_and(|s| s.is_alive())
    }

    /// Our current nickname.
    pub fn nick(&self) -> &str {
        self.tracker.myself().nick()
    }

    /// Change nickname. Offline this takes effect immediately; online it
    /// sends `NICK` and the server's echo performs the rename.
    pub fn set_nick(&mut self, nick: &str) -> Result<()> {
        if nick.is_empty() {
            return Err(ClientError::InvalidArgument("nick"));
        }
        let max = self.info.max_nick_len();
        if max > 0 && nick.len() > max as usize {
            return Err(ClientError::NickTooLong {
                nick: nick.to_owned(),
                len: nick.len(),
                max,
            });
        }

        if self.is_connected() {
            self.write_line(&format!("NICK {nick}"))
        } else {
            self.tracker.myself_mut().set_nick(nick);
            Ok(())
        }
    }

    /// Our username (ident).
    pub fn user(&self) -> &str {
        self.tracker.myself().user()
    }

    /// Change the username. Only possible while disconnected.
    pub fn set_user(&mut self, user: &str) -> Result<()> {
        if user.is_empty() {
            return Err(ClientError::InvalidArgument("user"));
        }
        if self.is_connected() {
            return Err(ClientError::InUseWhileConnected("user"));
        }
        self.tracker.myself_mut().set_user(user);
        Ok(())
    }

    /// Our real name (GECOS).
    pub fn real_name(&self) -> &str {
        self.tracker.myself().real_name()
    }

    /// Change the real name. Only possible while disconnected.
    pub fn set_real_name(&mut self, real_name: &str) -> Result<()> {
        if real_name.is_empty() {
            return Err(ClientError::InvalidArgument("real name"));
        }
        if self.is_connected() {
            return Err(ClientError::InUseWhileConnected("real name"));
        }
        self.tracker.myself_mut().set_real_name(real_name);
        Ok(())
    }

    /// Tracked state: users, channels, self.
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Look up a tracked user by nick (self included).
    pub fn get_user(&self, nick: &str) -> Option<&IrcUser> {
        self.tracker.get_user(nick)
    }

    /// Look up a tracked channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.tracker.channel(name)
    }

    /// All channels we are currently in.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.tracker.channels()
    }

    /// What the server advertised via `005`.
    pub fn network_info(&self) -> &NetworkInfo {
        &self.info
    }

    /// Send a PRIVMSG, splitting oversized payloads across lines.
    pub fn send(&mut self, target: &str, message: &str) -> Result<()> {
        if target.is_empty() {
            return Err(ClientError::InvalidArgument("target"));
        }
        if message.is_empty() {
            return Err(ClientError::InvalidArgument("message"));
        }
        for line in encode::split_message("PRIVMSG", target, message) {
            self.write_line(&line)?;
        }
        Ok(())
    }

    /// Send a NOTICE, splitting oversized payloads across lines.
    pub fn notice(&mut self, target: &str, message: &str) -> Result<()> {
        if target.is_empty() {
            return Err(ClientError::InvalidArgument("target"));
        }
        if message.is_empty() {
            return Err(ClientError::InvalidArgument("message"));
        }
        for line in encode::split_message("NOTICE", target, message) {
            self.write_line(&line)?;
        }
        Ok(())
    }

    /// Send a CTCP query (PRIVMSG-carried).
    pub fn ctcp_query(&mut self, target: &str, tag: &str, message: Option<&str>) -> Result<()> {
        self.ctcp("PRIVMSG", target, tag, message)
    }

    /// Send a CTCP reply (NOTICE-carried).
    pub fn ctcp_reply(&mut self, target: &str, tag: &str, message: Option<&str>) -> Result<()> {
        self.ctcp("NOTICE", target, tag, message)
    }

    /// Send a `/me` action.
    pub fn action(&mut self, target: &str, text: &str) -> Result<()> {
        self.ctcp_query(target, "ACTION", Some(text))
    }

    fn ctcp(&mut self, cmd: &str, target: &str, tag: &str, message: Option<&str>) -> Result<()> {
        if target.is_empty() {
            return Err(ClientError::InvalidArgument("target"));
        }
        if tag.is_empty() {
            return Err(ClientError::InvalidArgument("tag"));
        }
        for line in encode::split_ctcp(cmd, target, tag, message) {
            self.write_line(&line)?;
        }
        Ok(())
    }

    /// Join a channel, optionally with a key.
    pub fn join(&mut self, channel: &str, key: Option<&str>) -> Result<()> {
        self.require_channel_name(channel)?;
        match key {
            Some(key) => self.write_line(&format!("JOIN {channel} {key}")),
            None => self.write_line(&format!("JOIN {channel}")),
        }
    }

    /// Leave a channel we are in.
    pub fn part(&mut self, channel: &str, message: Option<&str>) -> Result<()> {
        self.require_channel_name(channel)?;
        if self.tracker.channel(channel).is_none() {
            return Err(ClientError::ChannelNotTracked(channel.to_owned()));
        }
        match message {
            Some(msg) => self.write_line(&format!("PART {channel} :{msg}")),
            None => self.write_line(&format!("PART {channel}")),
        }
    }

    /// Kick a user from a channel.
    pub fn kick(&mut self, channel: &str, nick: &str, reason: Option<&str>) -> Result<()> {
        self.require_channel_name(channel)?;
        if nick.is_empty() {
            return Err(ClientError::InvalidArgument("nick"));
        }
        match reason {
            Some(reason) => self.write_line(&format!("KICK {channel} {nick} :{reason}")),
            None => self.write_line(&format!("KICK {channel} {nick}")),
        }
    }

    /// Set or unset modes: `MODE <target> {+|-}<modes> [args…]`.
    pub fn mode(&mut self, target: &str, direction: char, modes: &str, args: &[&str]) -> Result<()> {
        if target.is_empty() {
            return Err(ClientError::InvalidArgument("target"));
        }
        if !matches!(direction, '+' | '-') {
            return Err(ClientError::InvalidArgument("mode direction"));
        }
        if modes.is_empty() {
            return Err(ClientError::InvalidArgument("modes"));
        }

        let mut line = format!("MODE {target} {direction}{modes}");
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.write_line(&line)
    }

    /// Give ourselves user modes.
    pub fn add_user_modes(&mut self, modes: &str) -> Result<()> {
        let nick = self.nick().to_owned();
        self.mode(&nick, '+', modes, &[])
    }

    /// Take user modes off ourselves.
    pub fn remove_user_modes(&mut self, modes: &str) -> Result<()> {
        let nick = self.nick().to_owned();
        self.mode(&nick, '-', modes, &[])
    }

    /// Set channel modes.
    pub fn add_channel_modes(&mut self, channel: &str, modes: &str) -> Result<()> {
        self.require_channel_name(channel)?;
        self.mode(channel, '+', modes, &[])
    }

    /// Unset channel modes.
    pub fn remove_channel_modes(&mut self, channel: &str, modes: &str) -> Result<()> {
        self.require_channel_name(channel)?;
        self.mode(channel, '-', modes, &[])
    }

    /// Add an entry to a channel list mode (ban list and friends).
    pub fn add_to_channel_list(&mut self, channel: &str, mode: char, mask: &str) -> Result<()> {
        self.require_channel_name(channel)?;
        if mask.is_empty() {
            return Err(ClientError::InvalidArgument("mask"));
        }
        self.mode(channel, '+', &mode.to_string(), &[mask])
    }

    /// Remove an entry from a channel list mode.
    pub fn remove_from_channel_list(&mut self, channel: &str, mode: char, mask: &str) -> Result<()> {
        self.require_channel_name(channel)?;
        if mask.is_empty() {
            return Err(ClientError::InvalidArgument("mask"));
        }
        self.mode(channel, '-', &mode.to_string(), &[mask])
    }

    /// Ban a mask from a channel.
    pub fn ban(&mut self, channel: &str, mask: &str) -> Result<()> {
        self.add_to_channel_list(channel, 'b', mask)
    }

    /// Lift a ban.
    pub fn unban(&mut self, channel: &str, mask: &str) -> Result<()> {
        self.remove_from_channel_list(channel, 'b', mask)
    }

    /// Ban, then kick.
    pub fn kick_ban(&mut self, channel: &str, nick: &str, reason: Option<&str>) -> Result<()> {
        self.ban(channel, nick)?;
        self.kick(channel, nick, reason)
    }

    /// Ask the server about a user.
    pub fn whois(&mut self, target: &str) -> Result<()> {
        if target.is_empty() {
            return Err(ClientError::InvalidArgument("target"));
        }
        self.write_line(&format!("WHOIS {target}"))
    }

    /// List users matching a mask (or a channel).
    pub fn who(&mut self, target: &str) -> Result<()> {
        if target.is_empty() {
            return Err(ClientError::InvalidArgument("target"));
        }
        self.write_line(&format!("WHO {target}"))
    }

    /// WHO restricted to one user within a channel.
    pub fn who_in(&mut self, channel: &str, nick: &str) -> Result<()> {
        self.require_channel_name(channel)?;
        if nick.is_empty() {
            return Err(ClientError::InvalidArgument("nick"));
        }
        self.write_line(&format!("WHO {channel} {nick}"))
    }

    /// Send a raw protocol line (CRLF appended).
    pub fn raw(&mut self, line: &str) -> Result<()> {
        if line.is_empty() {
            return Err(ClientError::InvalidArgument("line"));
        }
        self.write_line(line)
    }

    /// Send QUIT (best effort), shut the socket down, and drop all tracked
    /// state. Calling this when already disconnected is a no-op.
    pub fn quit(&mut self, message: Option<&str>) -> Result<()> {
        if self.socket.is_none() {
            return Ok(());
        }
        let line = match message {
            Some(msg) => format!("QUIT :{msg}"),
            None => "QUIT".to_owned(),
        };
        if let Err(e) = self.write_line(&line) {
            debug!("QUIT not delivered: {e}");
        }
        self.teardown();
        Ok(())
    }

    /// A name is a channel iff it is non-empty and starts with `#`.
    fn require_channel_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(ClientError::InvalidArgument("channel"));
        }
        if !name.starts_with('#') {
            return Err(ClientError::NotAChannel(name.to_owned()));
        }
        Ok(())
    }

    pub(crate) fn now(&self) -> Instant {
        self.clock.now()
    }

    pub(crate) fn write_line(&mut self, line: &str) -> Result<()> {
        let socket = self
            .socket
            .as_mut()
            .filter(|s| s.is_alive())
            .ok_or(ClientError::NotConnected)?;

        trace!("→ {line}");
        let mut buf = Vec::with_capacity(line.len() + 2);
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(b"\r\n");
        socket.send_all(&buf)?;
        self.last_net = self.clock.now();
        Ok(())
    }

    /// One framer read against the attached socket.
    fn pull_lines(&mut self) -> Result<PullStatus> {
        let Self { socket, framer, .. } = self;
        match socket.as_mut() {
            Some(socket) => framer.pull(socket.as_mut()),
            None => Ok(PullStatus::Closed),
        }
    }

    /// Drop the transport and all per-connection state.
    pub(crate) fn teardown(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.shutdown();
        }
        self.framer.clear();
        self.tracker.clear();
        self.tracker.myself_mut().set_host("");
        self.timing_out = false;
    }
}

/// The IRC client engine.
///
/// Dereferences to [`Connection`], so every outbound operation is available
/// directly on the client; `events` holds the callback registry.
///
/// # Example
///
/// ```no_run
/// use slirc_client::Client;
///
/// let mut client = Client::new("mybot", "bot", Some("Example Bot"));
/// client.events.on_connect(|conn| {
///     conn.join("#rust", None).ok();
/// });
/// client.events.on_message(|conn, from, target, text| {
///     if text == "!ping" {
///         conn.send(target, &format!("{}: pong", from.nick())).ok();
///     }
/// });
///
/// client.connect("irc.libera.chat:6667", None).unwrap();
/// while client.poll().unwrap() {
///     std::thread::sleep(std::time::Duration::from_millis(50));
/// }
/// ```
pub struct Client {
    /// Callback registry; see [`Events`].
    pub events: Events,
    conn: Connection,
}

impl Client {
    /// Create an engine for `nick`. The real name defaults to the username
    /// when not given.
    pub fn new(nick: &str, user: &str, real_name: Option<&str>) -> Self {
        Self::with_clock(nick, user, real_name, Box::new(SystemClock))
    }

    /// Create an engine with an explicit time source.
    pub fn with_clock(
        nick: &str,
        user: &str,
        real_name: Option<&str>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let mut myself = IrcUser::new(nick, clock.now());
        myself.set_user(user);
        myself.set_real_name(real_name.unwrap_or(user));

        Self {
            events: Events::default(),
            conn: Connection::new(myself, clock),
        }
    }

    /// Connect over TCP and register (`PASS`? `NICK` `USER`).
    pub fn connect(&mut self, address: &str, password: Option<&str>) -> Result<()> {
        if self.conn.socket.is_some() {
            return Err(ClientError::AlreadyConnected);
        }
        self.check_identity()?;
        let socket = TcpSocket::connect(address)?;
        self.attach(Box::new(socket), password)
    }

    /// Connect over an already-established transport and register. This is
    /// the seam custom transports and tests plug into.
    pub fn connect_with(&mut self, socket: Box<dyn Socket>, password: Option<&str>) -> Result<()> {
        if self.conn.socket.is_some() {
            return Err(ClientError::AlreadyConnected);
        }
        self.check_identity()?;
        self.attach(socket, password)
    }

    fn check_identity(&self) -> Result<()> {
        if self.conn.nick().is_empty() {
            return Err(ClientError::MissingField("nick"));
        }
        if self.conn.user().is_empty() {
            return Err(ClientError::MissingField("user"));
        }
        Ok(())
    }

    fn attach(&mut self, socket: Box<dyn Socket>, password: Option<&str>) -> Result<()> {
        self.conn.socket = Some(socket);
        self.conn.last_net = self.conn.now();
        self.conn.timing_out = false;

        if let Some(password) = password {
            self.conn.write_line(&format!("PASS {password}"))?;
        }
        let nick = self.conn.nick().to_owned();
        let user = self.conn.user().to_owned();
        let real = self.conn.real_name().to_owned();
        self.conn.write_line(&format!("NICK {nick}"))?;
        self.conn
            .write_line(&format!("USER {user} 0 * :{real}"))?;
        Ok(())
    }

    /// One engine step: read what the socket has, dispatch it, run the
    /// keep-alive check. Returns `false` once disconnected.
    ///
    /// Lines are dispatched in arrival order; state mutations land before
    /// the corresponding callbacks fire. A malformed line is dropped with a
    /// warning; `ERROR` from the server, an unhandled nick collision, and
    /// socket failures tear the connection down and surface as errors.
    pub fn poll(&mut self) -> Result<bool> {
        let Client { events, conn } = self;

        if !conn.is_connected() {
            conn.teardown();
            return Ok(false);
        }

        loop {
            match conn.pull_lines() {
                Err(ClientError::Io(e)) => {
                    conn.teardown();
                    return Err(ClientError::Io(e));
                }
                Err(e) => {
                    warn!("dropping inbound data: {e}");
                    continue;
                }
                Ok(PullStatus::Closed) => {
                    conn.teardown();
                    return Ok(false);
                }
                Ok(PullStatus::WouldBlock) => {
                    let now = conn.now();
                    if now.saturating_duration_since(conn.last_net) >= PING_INTERVAL {
                        if conn.timing_out {
                            debug!("no traffic since keep-alive ping; disconnecting");
                            conn.teardown();
                            return Ok(false);
                        }
                        conn.write_line(&format!("PING {PING_TOKEN}"))?;
                        conn.timing_out = true;
                    }
                    break;
                }
                Ok(PullStatus::Lines(lines)) => {
                    conn.last_net = conn.now();
                    conn.timing_out = false;

                    for line in lines {
                        trace!("← {line}");
                        let produced = match dispatch::handle(conn, &line) {
                            Ok(produced) => produced,
                            Err(e @ ClientError::Protocol(_)) => {
                                warn!("dropping line: {e}");
                                continue;
                            }
                            Err(e) => {
                                conn.teardown();
                                return Err(e);
                            }
                        };

                        for event in produced {
                            match event {
                                Event::NickInUse { nick } => {
                                    if !events.fire_nick_in_use(conn, &nick) {
                                        conn.teardown();
                                        return Err(ClientError::NickInUseUnhandled(nick));
                                    }
                                }
                                event => events.fire(conn, &event),
                            }
                        }

                        // A callback may have called quit().
                        if conn.socket.is_none() {
                            return Ok(false);
                        }
                    }
                }
            }
        }

        Ok(conn.is_connected())
    }
}

impl Deref for Client {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl DerefMut for Client {
    fn deref_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}
