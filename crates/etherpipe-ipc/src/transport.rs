//! Write side of the connection.
//!
//! The state machine never touches a socket directly: it hands complete
//! request frames to a [`Transport`]. The socket driver uses an [`Outbox`]
//! and flushes it after every event it feeds to the client.

use std::collections::VecDeque;
use std::io;

/// Accepts request frames bound for the daemon.
pub trait Transport {
    /// Accept one complete frame. Returns the number of bytes taken; zero
    /// counts as a failed write.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<usize>;

    /// Discard frames that have not been flushed yet.
    fn reset(&mut self) {}
}

/// In-memory frame buffer flushed by the socket driver.
#[derive(Debug, Default)]
pub struct Outbox {
    frames: VecDeque<Vec<u8>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every buffered frame, oldest first.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        self.frames.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl Transport for Outbox {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<usize> {
        self.frames.push_back(frame.to_vec());
        Ok(frame.len())
    }

    fn reset(&mut self) {
        self.frames.clear();
    }
}
