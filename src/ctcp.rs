//! CTCP (Client-to-Client Protocol) framing.
//!
//! CTCP payloads ride inside ordinary PRIVMSG/NOTICE bodies, wrapped in
//! `\x01` delimiters: `\x01TAG[ message]\x01`. The engine treats the tag as
//! an opaque token; interpretation (VERSION, ACTION, …) belongs to the
//! embedding application.

use std::fmt;

/// The CTCP delimiter byte.
pub const CTCP_DELIM: char = '\x01';

/// A CTCP payload split into its tag and optional message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The CTCP tag (e.g. `VERSION`, `ACTION`).
    pub tag: &'a str,
    /// Optional free-form data after the tag.
    pub message: Option<&'a str>,
}

impl<'a> Ctcp<'a> {
    /// Whether a PRIVMSG/NOTICE body is a CTCP payload.
    #[inline]
    pub fn is_ctcp(text: &str) -> bool {
        text.len() >= 2 && text.starts_with(CTCP_DELIM) && text.ends_with(CTCP_DELIM)
    }

    /// Parse a message body as CTCP. Returns `None` for plain text.
    pub fn parse(text: &'a str) -> Option<Ctcp<'a>> {
        let inner = text.strip_prefix(CTCP_DELIM)?;
        let inner = inner.strip_suffix(CTCP_DELIM).unwrap_or(inner);
        if inner.is_empty() {
            return None;
        }

        match inner.find(' ') {
            Some(i) => {
                let message = &inner[i + 1..];
                Some(Ctcp {
                    tag: &inner[..i],
                    message: if message.is_empty() {
                        None
                    } else {
                        Some(message)
                    },
                })
            }
            None => Some(Ctcp {
                tag: inner,
                message: None,
            }),
        }
    }
}

impl fmt::Display for Ctcp<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x01{}", self.tag)?;
        if let Some(message) = self.message {
            write!(f, " {message}")?;
        }
        write!(f, "\x01")
    }
}
