//! Negotiated server capabilities (`005` RPL_ISUPPORT).
//!
//! The engine consumes four ISUPPORT keys: `PREFIX`, `CHANMODES`, `NICKLEN`
//! and `NETWORK`. Everything else a server advertises is ignored. Defaults
//! are the RFC 1459 baseline (`PREFIX=(ov)@+`, list modes `b`).

use crate::error::{ClientError, Result};

/// What the server has told us about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Channel-user mode letters, most privileged first (e.g. `o`, `v`).
    user_modes: Vec<char>,
    /// Matching prefix sigils (e.g. `@`, `+`). Always as long as
    /// `user_modes`; index i in one corresponds to index i in the other.
    user_prefixes: Vec<char>,
    /// CHANMODES class A: list modes (bans and friends).
    list_modes: String,
    /// CHANMODES class B: modes that always take a parameter.
    param_modes: String,
    /// CHANMODES class C: modes that take a parameter only when set.
    set_param_modes: String,
    /// CHANMODES class D: parameterless flag modes.
    flag_modes: String,
    /// NICKLEN; 0 means unlimited.
    max_nick_len: u32,
    /// NETWORK name, if advertised.
    network: Option<String>,
}

impl Default for NetworkInfo {
    fn default() -> Self {
        Self {
            user_modes: vec!['o', 'v'],
            user_prefixes: vec!['@', '+'],
            list_modes: "b".to_owned(),
            param_modes: String::new(),
            set_param_modes: String::new(),
            flag_modes: String::new(),
            max_nick_len: 0,
            network: None,
        }
    }
}

impl NetworkInfo {
    /// Apply one `005` line. `args` are the numeric's arguments: our nick,
    /// the `KEY[=VALUE]` tokens, and a trailing human-readable message.
    ///
    /// A malformed `PREFIX` or `CHANMODES` aborts the whole line without
    /// applying any of its tokens.
    pub fn apply_isupport(&mut self, args: &[&str]) -> Result<()> {
        if args.len() < 3 {
            return Ok(());
        }

        // Stage onto a copy so a bad token cannot leave us half-updated.
        let mut staged = self.clone();
        for token in &args[1..args.len() - 1] {
            staged.apply_token(token)?;
        }
        *self = staged;
        Ok(())
    }

    fn apply_token(&mut self, token: &str) -> Result<()> {
        let (key, value) = match token.find('=') {
            Some(i) => (&token[..i], &token[i + 1..]),
            None => (token, ""),
        };

        match key {
            "PREFIX" => self.apply_prefix(value),
            "CHANMODES" => self.apply_chanmodes(value),
            "NICKLEN" => {
                if let Ok(len) = value.parse::<u32>() {
                    self.max_nick_len = len;
                } else {
                    tracing::debug!(value, "ignoring unparseable NICKLEN");
                }
                Ok(())
            }
            "NETWORK" => {
                if !value.is_empty() {
                    self.network = Some(value.to_owned());
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// `PREFIX=(modes)prefixes`. An empty value is silently skipped, which
    /// some servers use to advertise "no prefixes".
    fn apply_prefix(&mut self, value: &str) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }

        let inner = value
            .strip_prefix('(')
            .ok_or_else(|| ClientError::protocol(format!("malformed PREFIX: {value}")))?;
        let close = inner
            .find(')')
            .ok_or_else(|| ClientError::protocol(format!("malformed PREFIX: {value}")))?;

        let modes: Vec<char> = inner[..close].chars().collect();
        let prefixes: Vec<char> = inner[close + 1..].chars().collect();
        if modes.len() != prefixes.len() {
            return Err(ClientError::protocol(format!(
                "PREFIX modes/prefixes length mismatch: {value}"
            )));
        }

        self.user_modes = modes;
        self.user_prefixes = prefixes;
        Ok(())
    }

    /// `CHANMODES=A,B,C,D`.
    fn apply_chanmodes(&mut self, value: &str) -> Result<()> {
        let mut parts = value.split(',');
        let (Some(a), Some(b), Some(c), Some(d)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ClientError::protocol(format!(
                "malformed CHANMODES: {value}"
            )));
        };

        self.list_modes = a.to_owned();
        self.param_modes = b.to_owned();
        self.set_param_modes = c.to_owned();
        self.flag_modes = d.to_owned();
        Ok(())
    }

    /// Channel-user mode letters, most privileged first.
    pub fn user_modes(&self) -> &[char] {
        &self.user_modes
    }

    /// Channel-user prefix sigils, most privileged first.
    pub fn user_prefixes(&self) -> &[char] {
        &self.user_prefixes
    }

    /// List modes (CHANMODES class A).
    pub fn list_modes(&self) -> &str {
        &self.list_modes
    }

    /// NICKLEN limit; 0 means unlimited.
    pub fn max_nick_len(&self) -> u32 {
        self.max_nick_len
    }

    /// NETWORK name, if the server advertised one.
    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    /// Whether `c` is a known channel-user mode letter.
    pub fn is_user_mode(&self, c: char) -> bool {
        self.user_modes.contains(&c)
    }

    /// Whether `c` is a known channel-user prefix sigil.
    pub fn is_user_prefix(&self, c: char) -> bool {
        self.user_prefixes.contains(&c)
    }

    /// Privilege rank of a mode letter (0 is the most privileged).
    pub fn mode_rank(&self, c: char) -> Option<usize> {
        self.user_modes.iter().position(|&m| m == c)
    }

    /// Privilege rank of a prefix sigil (0 is the most privileged).
    pub fn prefix_rank(&self, c: char) -> Option<usize> {
        self.user_prefixes.iter().position(|&p| p == c)
    }

    /// The prefix sigil at a privilege rank.
    pub fn prefix_at(&self, rank: usize) -> Option<char> {
        self.user_prefixes.get(rank).copied()
    }

    /// Split a NAMES-style token into its leading prefix run and the nick.
    pub fn strip_prefixes<'a>(&self, token: &'a str) -> (&'a str, &'a str) {
        let split = token
            .char_indices()
            .find(|&(_, c)| !self.is_user_prefix(c))
            .map(|(i, _)| i)
            .unwrap_or(token.len());
        token.split_at(split)
    }
}
