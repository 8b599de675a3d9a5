//! Fixed-capacity rings of the lines and pids the shell has seen.
use std::{collections::VecDeque, fmt};

use crate::{
    common::{CommandLine, Error},
    system::interface::ProcessId,
};

pub const COMMAND_HISTORY_CAPACITY: usize = 50;
pub const PID_HISTORY_CAPACITY: usize = 15;

/// A ring that drops its oldest entry once it is full.
#[derive(Clone, Debug)]
struct Ring<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }
}

#[derive(Clone, Debug)]
pub struct CommandHistory(Ring<CommandLine>);

impl Default for CommandHistory {
    fn default() -> Self {
        Self(Ring::with_capacity(COMMAND_HISTORY_CAPACITY))
    }
}

impl CommandHistory {
    pub fn record(&mut self, line: CommandLine) {
        self.0.push(line)
    }

    /// The line at 1-based `position`, oldest first.
    pub fn recall(&self, position: usize) -> Result<CommandLine, Error> {
        position
            .checked_sub(1)
            .and_then(|index| self.0.entries.get(index))
            .cloned()
            .ok_or(Error::NotInHistory)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.entries.len()
    }
}

/// Listing used by the `history` built-in: `{n}: {line}`, 1-indexed.
impl fmt::Display for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, line) in self.0.entries.iter().enumerate() {
            writeln!(f, "{}: {line}", index + 1)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct PidHistory(Ring<ProcessId>);

impl Default for PidHistory {
    fn default() -> Self {
        Self(Ring::with_capacity(PID_HISTORY_CAPACITY))
    }
}

impl PidHistory {
    pub fn record(&mut self, pid: ProcessId) {
        self.0.push(pid)
    }

    pub fn extend(&mut self, pids: impl IntoIterator<Item = ProcessId>) {
        for pid in pids {
            self.record(pid);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.0.entries.iter().copied()
    }
}

/// Listing used by the `listpids` built-in: `{i}: {pid}`, 0-indexed.
impl fmt::Display for PidHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, pid) in self.iter().enumerate() {
            writeln!(f, "{index}: {pid}")?;
        }
        Ok(())
    }
}

/// What a coordinator is handed of the controller's history.
#[derive(Clone, Debug, Default)]
pub struct HistorySnapshot {
    pub commands: CommandHistory,
    pub pids: PidHistory,
}
