//! Execution log: an append-only undo stack of completed memory operations.
//!
//! One log is shared by every process of a session so operations interleaved
//! across processes unwind in true chronological order. Entries are never
//! edited once pushed; they leave the stack only by being popped.

use std::fmt;

use crate::constants::*;
use crate::process::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write { old: u8, new: u8 },
    /// `released_frame` is the frame base the page was bound to, if any
    Unmap { released_frame: Option<usize> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Read => "READ",
            Action::Write { .. } => "WRITE",
            Action::Unmap { .. } => "UNMAP",
        }
    }
}

/// One completed operation.
///
/// The acting process is referenced by id only; the log never keeps a
/// process alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecLogEntry {
    pub pid: Pid,
    pub action: Action,
    pub virt_addr: usize,
    /// The operation faulted in a fresh page mapping
    pub did_map: bool,
}

impl ExecLogEntry {
    pub fn read(pid: Pid, virt_addr: usize) -> Self {
        ExecLogEntry { pid, action: Action::Read, virt_addr, did_map: false }
    }

    pub fn write(pid: Pid, virt_addr: usize, old: u8, new: u8, did_map: bool) -> Self {
        ExecLogEntry { pid, action: Action::Write { old, new }, virt_addr, did_map }
    }

    pub fn unmap(pid: Pid, virt_addr: usize, released_frame: Option<usize>) -> Self {
        ExecLogEntry {
            pid,
            action: Action::Unmap { released_frame },
            virt_addr,
            did_map: false,
        }
    }

    pub fn old_value(&self) -> Option<u8> {
        match self.action {
            Action::Write { old, .. } => Some(old),
            _ => None,
        }
    }

    pub fn new_value(&self) -> Option<u8> {
        match self.action {
            Action::Write { new, .. } => Some(new),
            _ => None,
        }
    }

    /// Render the entry with an arbitrary label for the acting process
    pub(crate) fn describe(&self, f: &mut impl fmt::Write, actor: &dyn fmt::Display) -> fmt::Result {
        write!(f, ">> Action: {}, ", self.action.name())?;
        match self.action {
            Action::Write { old, new } => write!(
                f,
                "old data: {}, new data: {}, at {:#x}, did_map: {}, ",
                printable(old),
                printable(new),
                self.virt_addr,
                self.did_map
            )?,
            Action::Read => write!(f, "at {:#x}, ", self.virt_addr)?,
            Action::Unmap { released_frame: Some(frame_addr) } => {
                write!(f, "addr: {:#x}, frame: {:#x}, ", self.virt_addr, frame_addr)?
            }
            Action::Unmap { released_frame: None } => write!(f, "addr: {:#x}, ", self.virt_addr)?,
        }
        write!(f, "by proc: {}", actor)
    }
}

fn printable(byte: u8) -> String {
    if byte.is_ascii_graphic() || byte == b' ' {
        format!("{:?}", byte as char)
    } else {
        format!("{:#04x}", byte)
    }
}

impl fmt::Display for ExecLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.describe(f, &self.pid)
    }
}

/// LIFO stack of [`ExecLogEntry`]
#[derive(Debug, Clone)]
pub struct ExecLog {
    stack: Vec<ExecLogEntry>,
}

impl ExecLog {
    pub fn new() -> Self {
        ExecLog {
            stack: Vec::with_capacity(DEFAULT_EXEC_LOG_SIZE),
        }
    }

    pub fn push(&mut self, entry: ExecLogEntry) {
        self.stack.push(entry);
    }

    /// Remove the most recent entry
    pub fn pop(&mut self) -> Option<ExecLogEntry> {
        self.stack.pop()
    }

    /// Most recent entry, left in place
    pub fn peek(&self) -> Option<&ExecLogEntry> {
        self.stack.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Entries from the most recent to the oldest
    pub fn iter(&self) -> impl Iterator<Item = &ExecLogEntry> + '_ {
        self.stack.iter().rev()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }
}

impl Default for ExecLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------------------ExecLog Stack--------------------")?;
        for entry in self.iter() {
            writeln!(f, "{}", entry)?;
        }
        write!(f, "-----------------------------------------------------")
    }
}
