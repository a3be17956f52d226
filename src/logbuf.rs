//! Fixed-capacity ring buffer of record-read attempts.
//!
//! When a section fails to decode under `nofail`, the driver attaches the
//! last [`RecordLog::CAPACITY`] record reads to the error so a caller can see
//! what was being attempted at the point of failure, without paying the cost
//! of keeping a full transcript for sections that succeed.

use std::fmt::{self, Display};

/// One attempted record read, recorded before the read was known to succeed.
#[derive(Clone, Debug)]
pub struct RecordLogEntry {
    /// Line offset the attempt started at.
    pub offset: usize,
    /// Raw line content at that offset.
    pub line: String,
    /// Name of the recipe production being executed (e.g. `"head_line"`).
    pub rule: String,
}

impl Display for RecordLogEntry {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "  [{}] {} <- {}", self.offset, self.rule, self.line)
    }
}

/// A ring buffer holding the most recent [`RecordLog::CAPACITY`] record-log
/// entries for one section's decode attempt.
#[derive(Clone, Debug, Default)]
pub struct RecordLog {
    entries: std::collections::VecDeque<RecordLogEntry>,
}

impl RecordLog {
    /// Maximum number of entries retained.
    pub const CAPACITY: usize = 20;

    /// Create an empty log.
    pub fn new() -> Self {
        RecordLog {
            entries: std::collections::VecDeque::with_capacity(Self::CAPACITY),
        }
    }

    /// Record one attempted read, evicting the oldest entry if full.
    pub fn push(&mut self, offset: usize, line: impl Into<String>, rule: impl Into<String>) {
        if self.entries.len() == Self::CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(RecordLogEntry {
            offset,
            line: line.into(),
            rule: rule.into(),
        });
    }

    /// Entries oldest-first.
    pub fn entries(&self) -> impl Iterator<Item = &RecordLogEntry> {
        self.entries.iter()
    }

    /// Number of entries currently retained.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Display for RecordLog {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "record log (most recent {} of {}):", self.entries.len(), Self::CAPACITY)?;
        for entry in &self.entries {
            writeln!(fmt, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut log = RecordLog::new();
        for i in 0..(RecordLog::CAPACITY + 5) {
            log.push(i, format!("line {i}"), "cont_line");
        }
        assert_eq!(log.len(), RecordLog::CAPACITY);
        let first = log.entries().next().unwrap();
        assert_eq!(first.offset, 5);
    }

    #[test]
    fn empty_by_default() {
        let log = RecordLog::new();
        assert!(log.is_empty());
    }
}
