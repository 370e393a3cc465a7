//! Streaming line framer.
//!
//! IRC is a line protocol: `\r\n`-terminated records of at most 512 bytes
//! including the terminator. The framer turns the socket's byte stream into
//! complete lines, carrying any trailing partial line over to the next poll.
//!
//! Invariants:
//! - a partial line is never surfaced;
//! - no surfaced line exceeds 510 content bytes (the buffer is capped at
//!   512, so a completed record always fits);
//! - exactly one carry slot survives across polls.

use bytes::BytesMut;

use crate::error::{ClientError, Result};
use crate::transport::{RecvStatus, Socket};

/// Maximum IRC line length in bytes, `\r\n` included.
pub const MAX_LINE_LEN: usize = 512;

/// Outcome of one framer pull.
#[derive(Debug, PartialEq, Eq)]
pub enum PullStatus {
    /// Zero or more complete lines arrived (CRLF stripped).
    Lines(Vec<String>),
    /// The socket had nothing to offer.
    WouldBlock,
    /// The peer closed the connection.
    Closed,
}

/// Byte buffer that frames a socket stream into `\r\n`-separated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    carry: BytesMut,
}

impl LineBuffer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self {
            carry: BytesMut::with_capacity(MAX_LINE_LEN),
        }
    }

    /// Drop any partial line held from a previous poll.
    pub fn clear(&mut self) {
        self.carry.clear();
    }

    /// Read once from `socket` and return the complete lines that produced.
    ///
    /// Reads at most `512 − carry` bytes so the working buffer never grows
    /// past one maximum-length record. A carry that fills the buffer without
    /// containing a terminator can never complete; it is dropped and
    /// reported as a protocol error, leaving the session usable.
    pub fn pull(&mut self, socket: &mut dyn Socket) -> Result<PullStatus> {
        let budget = MAX_LINE_LEN - self.carry.len();
        if budget == 0 {
            self.carry.clear();
            return Err(ClientError::protocol(
                "inbound line exceeds 512 bytes without CRLF",
            ));
        }

        let mut scratch = [0u8; MAX_LINE_LEN];
        match socket.recv_nonblocking(&mut scratch[..budget])? {
            RecvStatus::WouldBlock => Ok(PullStatus::WouldBlock),
            RecvStatus::Closed => Ok(PullStatus::Closed),
            RecvStatus::Data(n) => {
                self.carry.extend_from_slice(&scratch[..n]);
                Ok(PullStatus::Lines(self.take_complete()))
            }
        }
    }

    /// Split everything up to the last `\r\n` out of the carry.
    fn take_complete(&mut self) -> Vec<String> {
        let Some(end) = last_crlf(&self.carry) else {
            return Vec::new();
        };

        let complete = self.carry.split_to(end + 2);
        split_crlf(&complete)
            .filter(|frag| !frag.is_empty())
            .map(|frag| String::from_utf8_lossy(frag).into_owned())
            .collect()
    }
}

/// Index of the `\r` of the last `\r\n` in `buf`, if any.
fn last_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).rposition(|w| w == b"\r\n")
}

/// Iterate the `\r\n`-separated fragments of `buf`.
fn split_crlf(buf: &[u8]) -> impl Iterator<Item = &[u8]> {
    let mut rest = buf;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.windows(2).position(|w| w == b"\r\n") {
            Some(i) => {
                let (head, tail) = rest.split_at(i);
                rest = &tail[2..];
                Some(head)
            }
            None => {
                let head = rest;
                rest = &[];
                Some(head)
            }
        }
    })
}
