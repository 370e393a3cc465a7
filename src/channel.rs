//! Tracked channels and per-member privilege state.

use std::collections::HashMap;

use crate::casemap::{irc_eq, irc_to_lower};
use crate::error::{ClientError, Result};
use crate::isupport::NetworkInfo;

/// A channel the client is currently in.
///
/// Members are nicks in join/NAMES order; `user_modes` maps each member to
/// its current *highest* prefix sigil (`@` over `+`). Channels exist only
/// while self is in them.
#[derive(Clone, Debug)]
pub struct Channel {
    name: String,
    members: Vec<String>,
    user_modes: HashMap<String, char>,
}

/// Direction of the current mode walk.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ModeOp {
    Give,
    Take,
}

impl Channel {
    /// Create an empty channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            user_modes: HashMap::new(),
        }
    }

    /// Channel name as the server emitted it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member nicks in insertion order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Number of tracked members.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Whether `nick` is a member (case-insensitive).
    pub fn has_member(&self, nick: &str) -> bool {
        self.members.iter().any(|m| irc_eq(m, nick))
    }

    pub(crate) fn add_member(&mut self, nick: &str) {
        if !self.has_member(nick) {
            self.members.push(nick.to_owned());
        }
    }

    pub(crate) fn remove_member(&mut self, nick: &str) {
        self.members.retain(|m| !irc_eq(m, nick));
        self.user_modes.remove(&irc_to_lower(nick));
    }

    /// The member's current prefix sigil, if any.
    pub fn mode_of(&self, nick: &str) -> Option<char> {
        self.user_modes.get(&irc_to_lower(nick)).copied()
    }

    /// Record a prefix sigil for a member. Sigils outside the server's
    /// advertised prefix table are dropped.
    pub(crate) fn set_mode(&mut self, nick: &str, prefix: char, info: &NetworkInfo) {
        if info.is_user_prefix(prefix) {
            self.user_modes.insert(irc_to_lower(nick), prefix);
        }
    }

    pub(crate) fn clear_mode(&mut self, nick: &str) {
        self.user_modes.remove(&irc_to_lower(nick));
    }

    /// Rename a member in place, carrying any mode to the new nick.
    ///
    /// If a row already exists under the new nick (the two records describe
    /// the same user), the old row folds into it instead of duplicating it,
    /// and an existing mode on the new nick is kept.
    pub(crate) fn rename_member(&mut self, old: &str, new: &str) {
        if !irc_eq(old, new) && self.has_member(new) {
            self.members.retain(|m| !irc_eq(m, old));
        } else if let Some(slot) = self.members.iter_mut().find(|m| irc_eq(m, old)) {
            *slot = new.to_owned();
        }
        if let Some(mode) = self.user_modes.remove(&irc_to_lower(old)) {
            self.user_modes.entry(irc_to_lower(new)).or_insert(mode);
        }
    }

    /// Apply a `MODE` word (`+ov-b` style) with its positional arguments.
    ///
    /// Only channel-user modes touch tracked state; anything else is
    /// consumed without using an argument. Returns the nicks whose
    /// privileges were taken away: the caller re-synchronizes those via
    /// WHOIS, since the server may still grant privilege through a mode we
    /// no longer see.
    ///
    /// A user mode before any `+`/`-` is a protocol error.
    pub(crate) fn apply_mode(
        &mut self,
        modes: &str,
        args: &[&str],
        info: &NetworkInfo,
    ) -> Result<Vec<String>> {
        let mut op = None;
        let mut args = args.iter();
        let mut resync = Vec::new();

        for c in modes.chars() {
            match c {
                '+' => op = Some(ModeOp::Give),
                '-' => op = Some(ModeOp::Take),
                c if info.is_user_mode(c) => {
                    let op = op.ok_or_else(|| {
                        ClientError::protocol(format!(
                            "user mode '{c}' before +/- in MODE {modes}"
                        ))
                    })?;
                    let Some(nick) = args.next() else { continue };
                    if !self.has_member(nick) {
                        continue;
                    }

                    match op {
                        ModeOp::Give => self.give(nick, c, info),
                        ModeOp::Take => {
                            self.clear_mode(nick);
                            resync.push((*nick).to_owned());
                        }
                    }
                }
                _ => {}
            }
        }

        Ok(resync)
    }

    /// Grant the prefix for mode `c` unless the member already holds an
    /// equal or more privileged one.
    fn give(&mut self, nick: &str, c: char, info: &NetworkInfo) {
        let Some(rank) = info.mode_rank(c) else { return };

        let current = self.mode_of(nick).and_then(|p| info.prefix_rank(p));
        if matches!(current, Some(held) if held <= rank) {
            return;
        }
        if let Some(prefix) = info.prefix_at(rank) {
            self.set_mode(nick, prefix, info);
        }
    }
}
