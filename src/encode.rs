//! Outbound message splitting.
//!
//! Servers relay our PRIVMSG/NOTICE lines with a `:nick!user@host` source
//! prefix prepended, so the usable payload per line is well under the
//! 512-byte protocol ceiling. The splitter fragments oversized messages
//! across several protocol lines, preferring word boundaries, and re-wraps
//! CTCP payloads so every fragment is a self-contained `\x01…\x01` frame.

use crate::line::MAX_LINE_LEN;

/// Outbound content budget per line: the 512-byte ceiling minus CRLF and
/// the worst-case server-prepended source prefix (63-byte host, 10-byte
/// user, separator).
pub const LINE_BUDGET: usize = MAX_LINE_LEN - 2 - (63 + 10 + 1);

/// Truncate to at most `max_bytes` without splitting a UTF-8 codepoint.
fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Fragment `{cmd} {target} :{text}` into lines of at most [`LINE_BUDGET`]
/// bytes, splitting at the last space that fits and hard-splitting
/// space-free runs.
pub fn split_message(cmd: &str, target: &str, text: &str) -> Vec<String> {
    let colon = cmd.len() + target.len() + 2;
    let mut line = format!("{cmd} {target} :{text}");
    let mut out = Vec::new();

    // A target so long the fixed part eats the budget cannot be split.
    if colon + 1 >= LINE_BUDGET {
        return vec![line];
    }

    while line.len() > LINE_BUDGET {
        let window = truncate_utf8_safe(&line, LINE_BUDGET);
        let head = match window[colon + 1..].rfind(' ') {
            Some(i) => colon + 1 + i,
            None => window.len(),
        };

        let rest = if line.as_bytes().get(head) == Some(&b' ') {
            line[head + 1..].to_owned()
        } else {
            line[head..].to_owned()
        };
        out.push(line[..head].to_owned());
        line = format!("{cmd} {target} :{rest}");
    }

    out.push(line);
    out
}

/// Fragment a CTCP payload (`\x01{tag}[ {message}]\x01`) onto
/// `{cmd} {target} :…` lines. Each fragment is closed with `\x01` and each
/// continuation re-opens with the tag, so receivers see well-formed CTCP
/// frames throughout. A message-less CTCP is always a single frame.
pub fn split_ctcp(cmd: &str, target: &str, tag: &str, message: Option<&str>) -> Vec<String> {
    let prefix_len = cmd.len() + target.len() + 3;
    let form = |payload: &str| format!("{cmd} {target} :{payload}");

    let mut wrapped = match message {
        Some(m) => format!("\x01{tag} {m}\x01"),
        None => return vec![form(&format!("\x01{tag}\x01"))],
    };

    // One byte reserved for the closing delimiter of each fragment.
    let budget = LINE_BUDGET.saturating_sub(prefix_len + 1);
    // Unsplittable: the re-wrap overhead alone would exceed the budget.
    if budget <= tag.len() + 3 {
        return vec![form(&wrapped)];
    }

    let mut out = Vec::new();
    while wrapped.len() > budget {
        let window = truncate_utf8_safe(&wrapped, budget);
        // Prefer the last space after the first one, keeping the tag
        // attached to the head of this fragment.
        let head = window
            .find(' ')
            .and_then(|fs| window[fs + 1..].rfind(' ').map(|i| fs + 1 + i))
            .unwrap_or(window.len());

        let rest = if wrapped.as_bytes().get(head) == Some(&b' ') {
            wrapped[head + 1..].to_owned()
        } else {
            wrapped[head..].to_owned()
        };
        out.push(form(&format!("{}\x01", &wrapped[..head])));
        wrapped = format!("\x01{tag} {rest}");
    }

    out.push(form(&wrapped));
    out
}
