//! Sequence-tagged holder for the line currently on screen

use super::WELCOME_LINE;

/// Latest dialogue line plus the sequence number of the newest request.
///
/// Requests may resolve out of order; only a reply to the most recently
/// issued request is allowed to replace the line.
#[derive(Debug, Clone)]
pub struct DialogueBoard {
    line: String,
    latest_seq: u64,
}

impl DialogueBoard {
    pub fn new() -> Self {
        Self {
            line: WELCOME_LINE.to_string(),
            latest_seq: 0,
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Reserve a sequence number for a new request
    pub fn issue(&mut self) -> u64 {
        self.latest_seq += 1;
        self.latest_seq
    }

    /// Apply a reply. Returns false (and keeps the current line) when a
    /// newer request has been issued since `seq`
    pub fn accept(&mut self, seq: u64, line: String) -> bool {
        if seq != self.latest_seq {
            return false;
        }
        self.line = line;
        true
    }
}

impl Default for DialogueBoard {
    fn default() -> Self {
        Self::new()
    }
}
