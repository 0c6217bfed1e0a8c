//! Command history: a bounded log of the commands run in this session.
//!
//! Entries are kept oldest first and numbered from 1 in that order, so the
//! newest entry always has the highest number. Only external commands are
//! recorded, and an exact repeat of the newest entry is skipped.

use crate::builtin;
use std::collections::VecDeque;

/// Capacity of a fresh history.
pub const DEFAULT_CAPACITY: usize = 5;
/// Largest capacity accepted by [`History::resize`].
pub const MAX_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds `command` unless it is blank, runs a builtin, or is the same as
    /// the newest entry. Evicts the oldest entry when full.
    ///
    /// `program` is the command name after variable expansion; the line is
    /// stored as typed.
    ///
    /// Returns whether the command was stored.
    pub fn record(&mut self, command: &str, program: &str) -> bool {
        let command = command.trim();
        if command.is_empty() || self.capacity == 0 || builtin::is_builtin(program) {
            return false;
        }
        if self.entries.back().is_some_and(|last| last == command) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(command.to_string());
        log::trace!("history: recorded {command:?} ({}/{})", self.len(), self.capacity);
        true
    }

    /// Entries with their display index, oldest (index 1) first.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, cmd)| (i + 1, cmd.as_str()))
    }

    /// Entry at display index `n`, if `1 <= n <= len()`.
    pub fn get(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    /// Changes the capacity, dropping the oldest entries that no longer fit.
    ///
    /// Survivors keep their relative order. Capacities above [`MAX_CAPACITY`]
    /// are rejected and leave the history unchanged.
    pub fn resize(&mut self, capacity: usize) -> Result<(), HistoryError> {
        if capacity > MAX_CAPACITY {
            return Err(HistoryError::CapacityTooLarge(capacity));
        }
        let excess = self.entries.len().saturating_sub(capacity);
        self.entries.drain(..excess);
        self.capacity = capacity;
        log::debug!("history: capacity {capacity}, {} entries kept", self.len());
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("invalid history size {0} (must be between 0 and {MAX_CAPACITY})")]
    CapacityTooLarge(usize),
}
