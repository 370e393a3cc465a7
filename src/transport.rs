//! Socket and clock collaborators.
//!
//! The engine performs no name resolution, TLS, or reconnection; it drives
//! one already-chosen transport through the narrow [`Socket`] trait and
//! takes all timing from a [`Clock`]. Both traits exist so the whole engine
//! can run against in-memory fakes in tests.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Instant;

/// Outcome of one non-blocking receive attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvStatus {
    /// This many bytes were written into the buffer (never zero).
    Data(usize),
    /// No data available right now.
    WouldBlock,
    /// The peer closed the connection.
    Closed,
}

/// The transport the engine talks through.
///
/// Sends are small (one line) and may block; receives must never block.
pub trait Socket {
    /// Write the whole buffer, blocking until it is on the wire.
    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read available bytes without blocking.
    ///
    /// The implementation is responsible for switching the descriptor to
    /// non-blocking for the duration of the call and restoring it before
    /// returning.
    fn recv_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<RecvStatus>;

    /// Whether the transport is still usable.
    fn is_alive(&self) -> bool;

    /// Tear the transport down. Further sends fail, receives report closed.
    fn shutdown(&mut self);
}

/// A [`Socket`] over a plain `std::net::TcpStream`.
pub struct TcpSocket {
    stream: TcpStream,
    alive: bool,
}

impl TcpSocket {
    /// Connect to `address` (anything `ToSocketAddrs` accepts).
    pub fn connect(address: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream,
            alive: true,
        })
    }
}

impl Socket for TcpSocket {
    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        match self.stream.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.alive = false;
                Err(e)
            }
        }
    }

    fn recv_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<RecvStatus> {
        self.stream.set_nonblocking(true)?;
        let result = self.stream.read(buf);
        // Restore blocking mode before surfacing the outcome.
        self.stream.set_nonblocking(false)?;

        match result {
            Ok(0) => {
                self.alive = false;
                Ok(RecvStatus::Closed)
            }
            Ok(n) => Ok(RecvStatus::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(RecvStatus::WouldBlock),
            Err(e) => {
                self.alive = false;
                Err(e)
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn shutdown(&mut self) {
        if self.alive {
            let _ = self.stream.shutdown(Shutdown::Both);
            self.alive = false;
        }
    }
}

/// Monotonic time source.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The process monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
