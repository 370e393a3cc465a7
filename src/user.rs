//! Tracked IRC users.

use std::fmt;
use std::time::{Duration, Instant};

use crate::casemap::irc_eq;

/// One user visible to the client, self included.
///
/// Identity is the `(nick, user, host, real name)` tuple from the server's
/// point of view; `channels` is the insertion-ordered list of channels this
/// user is known to share with us. `last_action` feeds idle detection and
/// is refreshed whenever the user demonstrably does something (speaks,
/// kicks, …).
#[derive(Clone, Debug)]
pub struct IrcUser {
    nick: String,
    user: String,
    host: String,
    real_name: String,
    channels: Vec<String>,
    last_action: Instant,
}

impl IrcUser {
    /// Create a user known only by nick.
    pub fn new(nick: impl Into<String>, now: Instant) -> Self {
        Self {
            nick: nick.into(),
            user: String::new(),
            host: String::new(),
            real_name: String::new(),
            channels: Vec::new(),
            last_action: now,
        }
    }

    /// Build a user from a message prefix.
    ///
    /// The prefix is partitioned at the first `!` (nick) and the rest at the
    /// first `@` (user, host); missing pieces come out empty. A bare server
    /// name therefore lands entirely in `nick`.
    pub fn from_prefix(prefix: &str, now: Instant) -> Self {
        let (nick, rest) = match prefix.find('!') {
            Some(i) => (&prefix[..i], &prefix[i + 1..]),
            None => (prefix, ""),
        };
        let (user, host) = match rest.find('@') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => (rest, ""),
        };

        let mut u = Self::new(nick, now);
        u.user = user.to_owned();
        u.host = host.to_owned();
        u
    }

    /// Current nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Username (ident), possibly empty.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Hostname, possibly empty.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Real name (GECOS), possibly empty.
    pub fn real_name(&self) -> &str {
        &self.real_name
    }

    pub(crate) fn set_nick(&mut self, nick: impl Into<String>) {
        self.nick = nick.into();
    }

    pub(crate) fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    pub(crate) fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    pub(crate) fn set_real_name(&mut self, real_name: impl Into<String>) {
        self.real_name = real_name.into();
    }

    /// Fill in user/host from a prefix when the stored fields are emptier
    /// than what just arrived. Never overwrites known values.
    pub(crate) fn patch_from(&mut self, other: &IrcUser) {
        if self.user.is_empty() && !other.user.is_empty() {
            self.user = other.user.clone();
        }
        if self.host.is_empty() && !other.host.is_empty() {
            self.host = other.host.clone();
        }
    }

    /// Channels this user is tracked in, insertion order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(String::as_str)
    }

    /// Whether the user is tracked in `channel` (case-insensitive).
    pub fn in_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| irc_eq(c, channel))
    }

    pub(crate) fn add_channel(&mut self, channel: &str) {
        if !self.in_channel(channel) {
            self.channels.push(channel.to_owned());
        }
    }

    pub(crate) fn remove_channel(&mut self, channel: &str) {
        self.channels.retain(|c| !irc_eq(c, channel));
    }

    pub(crate) fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Mark the user active now.
    pub fn reset_action_time(&mut self, now: Instant) {
        self.last_action = now;
    }

    /// Whether the user has been quiet for at least `threshold`.
    pub fn is_idle(&self, now: Instant, threshold: Duration) -> bool {
        now.saturating_duration_since(self.last_action) >= threshold
    }

    /// How long the user has been quiet.
    pub fn idle_time(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_action)
    }
}

impl fmt::Display for IrcUser {
    /// The full `nick!user@host` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}@{}", self.nick, self.user, self.host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Instant {
        Instant::now()
    }

    #[test]
    fn prefix_round_trip() {
        let u = IrcUser::from_prefix("nick!user@host", now());
        assert_eq!(u.nick(), "nick");
        assert_eq!(u.user(), "user");
        assert_eq!(u.host(), "host");
        assert_eq!(u.to_string(), "nick!user@host");
    }

    #[test]
    fn server_name_is_all_nick() {
        let u = IrcUser::from_prefix("irc.server.net", now());
        assert_eq!(u.nick(), "irc.server.net");
        assert_eq!(u.user(), "");
        assert_eq!(u.host(), "");
    }

    #[test]
    fn partial_prefix() {
        let u = IrcUser::from_prefix("nick!user", now());
        assert_eq!(u.nick(), "nick");
        assert_eq!(u.user(), "user");
        assert_eq!(u.host(), "");
    }

    #[test]
    fn channel_membership_is_case_insensitive() {
        let mut u = IrcUser::new("alice", now());
        u.add_channel("#Test");
        u.add_channel("#TEST");
        assert_eq!(u.channel_count(), 1);
        assert!(u.in_channel("#test"));

        u.remove_channel("#TeSt");
        assert_eq!(u.channel_count(), 0);
    }

    #[test]
    fn idle_accounting() {
        let t0 = now();
        let mut u = IrcUser::new("alice", t0);
        let later = t0 + Duration::from_secs(45);

        assert!(u.is_idle(later, Duration::from_secs(30)));
        assert_eq!(u.idle_time(later), Duration::from_secs(45));

        u.reset_action_time(later);
        assert!(!u.is_idle(later, Duration::from_secs(1)));
    }

    #[test]
    fn patch_only_fills_gaps() {
        let t = now();
        let mut known = IrcUser::from_prefix("alice!ident@real.host", t);
        let sparse = IrcUser::from_prefix("alice", t);
        known.patch_from(&sparse);
        assert_eq!(known.user(), "ident");
        assert_eq!(known.host(), "real.host");

        let mut sparse = IrcUser::from_prefix("alice", t);
        let rich = IrcUser::from_prefix("alice!ident@real.host", t);
        sparse.patch_from(&rich);
        assert_eq!(sparse.user(), "ident");
        assert_eq!(sparse.host(), "real.host");
    }
}
