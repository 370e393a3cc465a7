//! Inbound line parser.
//!
//! Splits one CRLF-stripped line into its raw components:
//! `[@tags] [:prefix] <command> [args...] [:trailing]`.
//!
//! The parse is deliberately lenient where real servers are sloppy:
//! - the tag block ends at the first `:` that is preceded by a space
//!   (tag values may themselves contain colons);
//! - a trailing argument introduced by a bare `:` (no leading space) is
//!   accepted, compensating for servers that omit the separator space.
//!
//! Components are borrowed from the input line; nothing is interpreted
//! here. Unknown commands are the dispatcher's problem, not the parser's.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0},
    sequence::{preceded, terminated},
    IResult,
};

use crate::error::{ClientError, Result};

/// One parsed server line, borrowing from the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef<'a> {
    /// Raw tag fragments (the `@…` block split on `;`, no unescaping).
    pub tags: Vec<&'a str>,
    /// Message source (`nick!user@host` or a server name); empty if absent.
    pub prefix: &'a str,
    /// Command token: a word like `PRIVMSG` or a three-digit numeric.
    pub command: &'a str,
    /// Positional arguments; a trailing argument keeps its inner spaces.
    pub args: Vec<&'a str>,
}

/// Tag block: everything between `@` and the space before the prefix colon.
fn tag_block(input: &str) -> IResult<&str, &str> {
    terminated(preceded(char('@'), take_until(" :")), char(' '))(input)
}

/// Prefix: `:` followed by one space-delimited token.
fn prefix_token(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Command: one space-delimited token.
fn command_token(input: &str) -> IResult<&str, &str> {
    preceded(space0, take_while1(|c| c != ' '))(input)
}

impl<'a> MessageRef<'a> {
    /// Parse one line (CRLF optional and ignored).
    pub fn parse(line: &'a str) -> Result<MessageRef<'a>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(ClientError::protocol("empty line"));
        }

        let (rest, tags) = if line.starts_with('@') {
            let (rest, block) = tag_block(line)
                .map_err(|_| ClientError::protocol(format!("malformed tag block: {line}")))?;
            (rest, block.split(';').collect())
        } else {
            (line, Vec::new())
        };

        let (rest, prefix) = match prefix_token(rest) {
            Ok((rest, p)) => (rest, p),
            Err(_) => (rest, ""),
        };

        let (rest, command) = command_token(rest)
            .map_err(|_| ClientError::protocol(format!("missing command: {line}")))?;

        Ok(MessageRef {
            tags,
            prefix,
            command,
            args: split_args(rest),
        })
    }

    /// Argument at `index`, or `""`.
    pub fn arg(&self, index: usize) -> &'a str {
        self.args.get(index).copied().unwrap_or("")
    }
}

/// Split the post-command remainder into head tokens plus optional trailing.
fn split_args(rest: &str) -> Vec<&str> {
    let (head, trailing) = match rest.find(" :") {
        Some(i) => (&rest[..i], Some(&rest[i + 2..])),
        // Malformed-server compensation: a trailing introduced by a bare
        // colon with no separator space.
        None => match rest.find(':') {
            Some(i) => (&rest[..i], Some(&rest[i + 1..])),
            None => (rest, None),
        },
    };

    let mut args: Vec<&str> = head.split_whitespace().collect();
    if let Some(trailing) = trailing {
        args.push(trailing);
    }
    args
}
