//! The client's view of the network: users, channels, and self.
//!
//! Users live in one arena keyed by RFC 1459-lowercased nick; channels hold
//! member *nicks*, not user references, so every mutation routes through the
//! tracker, which keeps the two sides in lockstep:
//! for every user `u` and channel `c`,
//! `u ∈ c.members  ⇔  c.name ∈ u.channels`.
//!
//! Self is held separately and is never duplicated in the arena; nick
//! lookups short-circuit to self case-insensitively.

use std::collections::HashMap;
use std::time::Instant;

use crate::casemap::{irc_eq, irc_to_lower};
use crate::channel::Channel;
use crate::user::IrcUser;

/// Owner of all tracked protocol state.
#[derive(Clone, Debug)]
pub struct Tracker {
    myself: IrcUser,
    users: HashMap<String, IrcUser>,
    // Keyed case-sensitively, exactly as the server emits channel names.
    channels: HashMap<String, Channel>,
}

impl Tracker {
    /// Create a tracker around the local user.
    pub fn new(myself: IrcUser) -> Self {
        Self {
            myself,
            users: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    /// The local user.
    pub fn myself(&self) -> &IrcUser {
        &self.myself
    }

    pub(crate) fn myself_mut(&mut self) -> &mut IrcUser {
        &mut self.myself
    }

    /// Whether `nick` names the local user (case-insensitive).
    pub fn is_self(&self, nick: &str) -> bool {
        irc_eq(nick, self.myself.nick())
    }

    /// Look up a user by nick; self wins over the arena.
    pub fn get_user(&self, nick: &str) -> Option<&IrcUser> {
        if self.is_self(nick) {
            return Some(&self.myself);
        }
        self.users.get(&irc_to_lower(nick))
    }

    pub(crate) fn get_user_mut(&mut self, nick: &str) -> Option<&mut IrcUser> {
        if self.is_self(nick) {
            return Some(&mut self.myself);
        }
        self.users.get_mut(&irc_to_lower(nick))
    }

    /// Resolve a message sender, creating the user on first sighting and
    /// patching in user/host when the prefix is richer than what we hold.
    pub(crate) fn get_or_make_user(&mut self, prefix: &str, now: Instant) -> &mut IrcUser {
        let parsed = IrcUser::from_prefix(prefix, now);
        if irc_eq(parsed.nick(), self.myself.nick()) {
            self.myself.patch_from(&parsed);
            return &mut self.myself;
        }

        let key = irc_to_lower(parsed.nick());
        let user = self
            .users
            .entry(key)
            .or_insert_with(|| IrcUser::new(parsed.nick(), now));
        user.patch_from(&parsed);
        user
    }

    /// Ensure a user exists for `nick` (no identity beyond the nick).
    pub(crate) fn ensure_user(&mut self, nick: &str, now: Instant) -> &mut IrcUser {
        if self.is_self(nick) {
            return &mut self.myself;
        }
        self.users
            .entry(irc_to_lower(nick))
            .or_insert_with(|| IrcUser::new(nick, now))
    }

    /// Number of tracked users, self excluded.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Look up a channel by its server-emitted name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub(crate) fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(name)
    }

    /// All tracked channels, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Create a channel (self just joined it) and track self as a member.
    pub(crate) fn add_channel(&mut self, name: &str) {
        let mut chan = Channel::new(name);
        chan.add_member(self.myself.nick());
        self.myself.add_channel(name);
        self.channels.insert(name.to_owned(), chan);
    }

    /// Drop a channel (self left) and unlink every member from it.
    pub(crate) fn remove_channel(&mut self, name: &str) {
        let Some(chan) = self.channels.remove(name) else {
            return;
        };
        self.myself.remove_channel(name);
        for nick in chan.members() {
            if let Some(user) = self.users.get_mut(&irc_to_lower(nick)) {
                user.remove_channel(name);
            }
        }
        self.prune_channelless();
    }

    /// Put `nick` into `channel`, creating the user if needed. Keeps the
    /// user's channel list and the channel's member list in lockstep.
    pub(crate) fn track_membership(&mut self, nick: &str, channel: &str, now: Instant) {
        let Some(chan) = self.channels.get_mut(channel) else {
            return;
        };
        chan.add_member(nick);

        if self.is_self(nick) {
            self.myself.add_channel(channel);
        } else {
            self.ensure_user(nick, now).add_channel(channel);
        }
    }

    /// Remove `nick` from `channel`; a user left in no channels is dropped.
    pub(crate) fn drop_membership(&mut self, nick: &str, channel: &str) {
        if let Some(chan) = self.channels.get_mut(channel) {
            chan.remove_member(nick);
        }
        if self.is_self(nick) {
            self.myself.remove_channel(channel);
            return;
        }
        if let Some(user) = self.users.get_mut(&irc_to_lower(nick)) {
            user.remove_channel(channel);
            if user.channel_count() == 0 {
                self.users.remove(&irc_to_lower(nick));
            }
        }
    }

    /// Remove a user from every channel and forget it (QUIT).
    pub(crate) fn remove_user(&mut self, nick: &str) {
        for chan in self.channels.values_mut() {
            chan.remove_member(nick);
        }
        self.users.remove(&irc_to_lower(nick));
    }

    /// Rename a user across every channel it appears in, carrying modes.
    ///
    /// Two users cannot share a nick, so a record already held under the
    /// new nick must describe the same real user: its fields and channel
    /// memberships are merged into the renamed user rather than lost.
    pub(crate) fn rename_user(&mut self, old: &str, new: &str) {
        if self.is_self(old) {
            for chan in self.channels.values_mut() {
                chan.rename_member(old, new);
            }
            self.myself.set_nick(new);
            return;
        }

        let stale = if irc_eq(old, new) {
            None
        } else {
            self.users.remove(&irc_to_lower(new))
        };

        match self.users.remove(&irc_to_lower(old)) {
            Some(mut user) => {
                if let Some(stale) = &stale {
                    user.patch_from(stale);
                    for chan in stale.channels() {
                        user.add_channel(chan);
                    }
                }
                for chan in self.channels.values_mut() {
                    chan.rename_member(old, new);
                }
                user.set_nick(new);
                self.users.insert(irc_to_lower(new), user);
            }
            // The old nick was never tracked; keep whatever we already
            // knew under the new one.
            None => {
                if let Some(stale) = stale {
                    self.users.insert(irc_to_lower(new), stale);
                }
            }
        }
    }

    /// Drop everything except self's identity (disconnect).
    pub(crate) fn clear(&mut self) {
        self.channels.clear();
        self.users.clear();
        let channels: Vec<String> = self.myself.channels().map(str::to_owned).collect();
        for chan in channels {
            self.myself.remove_channel(&chan);
        }
    }

    fn prune_channelless(&mut self) {
        self.users.retain(|_, user| user.channel_count() > 0);
    }
}
