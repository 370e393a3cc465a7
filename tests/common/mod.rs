//! Shared in-memory fakes for engine tests: a scriptable socket and a
//! manually-advanced clock.

// Each test binary uses a different slice of this module.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::time::{Duration, Instant};

use slirc_client::{Client, Clock, RecvStatus, Socket};

#[derive(Default)]
struct MockState {
    inbound: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
    alive: bool,
}

/// The socket half handed to the client.
pub struct MockSocket {
    state: Rc<RefCell<MockState>>,
}

/// The test's half: inject inbound bytes, observe outbound lines.
#[derive(Clone)]
pub struct MockHandle {
    state: Rc<RefCell<MockState>>,
}

impl MockSocket {
    pub fn pair() -> (MockSocket, MockHandle) {
        let state = Rc::new(RefCell::new(MockState {
            alive: true,
            ..MockState::default()
        }));
        (
            MockSocket {
                state: Rc::clone(&state),
            },
            MockHandle { state },
        )
    }
}

impl Socket for MockSocket {
    fn send_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.alive {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "socket closed"));
        }
        state.outbound.extend_from_slice(bytes);
        Ok(())
    }

    fn recv_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<RecvStatus> {
        let mut state = self.state.borrow_mut();
        if !state.alive {
            return Ok(RecvStatus::Closed);
        }
        match state.inbound.front_mut() {
            None => Ok(RecvStatus::WouldBlock),
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                chunk.drain(..n);
                if chunk.is_empty() {
                    state.inbound.pop_front();
                }
                Ok(RecvStatus::Data(n))
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.state.borrow().alive
    }

    fn shutdown(&mut self) {
        self.state.borrow_mut().alive = false;
    }
}

impl MockHandle {
    /// Queue one server line (CRLF appended) for the next poll.
    pub fn push_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        bytes.extend_from_slice(b"\r\n");
        self.state.borrow_mut().inbound.push_back(bytes);
    }

    /// Queue raw bytes, exactly as given.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.state.borrow_mut().inbound.push_back(bytes.to_vec());
    }

    /// Simulate the peer closing the connection.
    pub fn close(&self) {
        self.state.borrow_mut().alive = false;
    }

    pub fn is_alive(&self) -> bool {
        self.state.borrow().alive
    }

    /// Everything the client has sent, split into CRLF lines.
    pub fn sent_lines(&self) -> Vec<String> {
        let state = self.state.borrow();
        String::from_utf8_lossy(&state.outbound)
            .split("\r\n")
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Drop the outbound log (e.g. after registration).
    pub fn drain_sent(&self) {
        self.state.borrow_mut().outbound.clear();
    }
}

/// A clock the test advances by hand.
#[derive(Clone)]
pub struct MockClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

/// A registered client over a mock socket, registration lines discarded.
pub fn connected_client(nick: &str) -> (Client, MockHandle, MockClock) {
    let clock = MockClock::new();
    let mut client = Client::with_clock(nick, "user", Some("Real Name"), Box::new(clock.clone()));
    let (socket, handle) = MockSocket::pair();
    client
        .connect_with(Box::new(socket), None)
        .expect("mock connect");
    handle.drain_sent();
    (client, handle, clock)
}
