use std::fmt;

use crate::config::MemoryConfig;
use crate::translation::PageTable;

/// Process identifier, unique within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub usize);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pid {}", self.0)
    }
}

/// A simulated process: a name, an id and its own page table.
///
/// Memory access goes through [`Session`](crate::session::Session), which
/// owns the physical memory, the frame allocator and the execution log the
/// process shares with everyone else.
#[derive(Debug, Clone)]
pub struct Process {
    pid: Pid,
    name: String,
    page_table: PageTable,
}

impl Process {
    pub fn new(pid: Pid, name: impl Into<String>, config: &MemoryConfig) -> Self {
        Process {
            pid,
            name: name.into(),
            page_table: PageTable::new(config.page_table_size(), config.frame_size()),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }

    #[inline]
    pub(crate) fn page_table_mut(&mut self) -> &mut PageTable {
        &mut self.page_table
    }

    /// Identity check by id only
    pub fn same(&self, other: &Process) -> bool {
        self.pid == other.pid
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Process {}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.pid)
    }
}
