//! Console ring buffer — stores recent output lines with sequential IDs
//! so a polling front end can fetch everything it missed.

use std::collections::VecDeque;

use super::events::{current_timestamp, LineSource, OutputLine};

/// Maximum number of console lines kept in memory.
const DEFAULT_CONSOLE_BUFFER: usize = 10_000;

pub struct ConsoleBuffer {
    lines: VecDeque<OutputLine>,
    next_id: u64,
    max_size: usize,
}

impl ConsoleBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CONSOLE_BUFFER)
    }

    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(max_size),
            next_id: 0,
            max_size,
        }
    }

    /// Push a new line and return the created [`OutputLine`].
    pub fn push(&mut self, source: LineSource, content: String) -> OutputLine {
        let line = OutputLine {
            id: self.next_id,
            timestamp: current_timestamp(),
            source,
            content,
        };
        self.next_id += 1;

        if self.lines.len() >= self.max_size {
            self.lines.pop_front();
        }
        self.lines.push_back(line.clone());
        line
    }

    /// All lines with id > `since_id` (for polling).
    pub fn get_since(&self, since_id: u64) -> Vec<OutputLine> {
        self.lines
            .iter()
            .filter(|l| l.id > since_id)
            .cloned()
            .collect()
    }

    /// The most recent `count` lines, oldest first.
    pub fn get_recent(&self, count: usize) -> Vec<OutputLine> {
        self.lines.iter().rev().take(count).rev().cloned().collect()
    }
}

impl Default for ConsoleBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_query() {
        let mut buffer = ConsoleBuffer::new();
        buffer.push(LineSource::Stdout, "line 0".into());
        buffer.push(LineSource::Stdout, "line 1".into());
        buffer.push(LineSource::Stderr, "err 0".into());

        assert_eq!(buffer.lines.len(), 3);
        // since_id = 0 -> lines with id > 0
        assert_eq!(buffer.get_since(0).len(), 2);
        assert_eq!(buffer.get_recent(2).len(), 2);
        assert_eq!(buffer.get_recent(100).len(), 3);
    }

    #[test]
    fn recent_preserves_order() {
        let mut buffer = ConsoleBuffer::new();
        for i in 0..5 {
            buffer.push(LineSource::Stdout, format!("line {}", i));
        }
        let recent = buffer.get_recent(3);
        assert_eq!(recent[0].content, "line 2");
        assert_eq!(recent[2].content, "line 4");
    }

    #[test]
    fn ring_evicts_oldest() {
        let mut buffer = ConsoleBuffer::with_capacity(100);
        for i in 0..150 {
            buffer.push(LineSource::Stdout, format!("line {}", i));
        }
        assert_eq!(buffer.lines.len(), 100);
        // earliest lines evicted, ids keep counting
        assert!(buffer.lines.front().unwrap().id > 0);
        assert_eq!(buffer.lines.back().unwrap().id, 149);
    }
}
