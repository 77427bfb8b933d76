//! Error types for the paging simulator.
//!
//! `MemoryError` covers every fault a memory operation can report back to the
//! caller. None of them poison the session: the caller decides whether a
//! segmentation fault ends the simulated program or not.

use std::fmt;

use crate::process::Pid;

/// Faults raised by memory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Access to an unmapped page or to a page outside the page table.
    SegFault { pid: Pid, virt_addr: usize },
    /// Translation hit an empty entry where a mapping was required.
    InvalidPage { virt_addr: usize },
    /// No free frame left after a full revolution of the allocator cursor.
    OutOfMemory { pid: Pid, page: usize },
    /// Attempt to map the guard page (page 0).
    GuardPageViolation { pid: Pid, virt_addr: usize },
    /// The process id does not name a live process.
    NoSuchProcess(Pid),
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::SegFault { pid, virt_addr } => {
                write!(f, "segmentation fault in {} at {:#x}", pid, virt_addr)
            }
            MemoryError::InvalidPage { virt_addr } => {
                write!(f, "invalid page while translating {:#x}", virt_addr)
            }
            MemoryError::OutOfMemory { pid, page } => {
                write!(f, "out of memory: no free frame for page {} of {}", page, pid)
            }
            MemoryError::GuardPageViolation { pid, virt_addr } => {
                write!(f, "{} attempted to map guard page at {:#x}", pid, virt_addr)
            }
            MemoryError::NoSuchProcess(pid) => write!(f, "no such process: {}", pid),
        }
    }
}

impl std::error::Error for MemoryError {}

pub type MemoryResult<T> = Result<T, MemoryError>;

/// Rejected simulator configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidFrameSize(usize),
    InvalidMemorySize { memory_size: usize, frame_size: usize },
    InvalidPageTableSize(usize),
    Parse { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidFrameSize(size) => {
                write!(f, "frame size {} is not a nonzero power of two", size)
            }
            ConfigError::InvalidMemorySize { memory_size, frame_size } => write!(
                f,
                "memory size {} must be a multiple of frame size {} holding at least two frames",
                memory_size, frame_size
            ),
            ConfigError::InvalidPageTableSize(size) => {
                write!(f, "page table size {} must be at least 2", size)
            }
            ConfigError::Parse { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_address_in_hex() {
        let err = MemoryError::SegFault { pid: Pid(3), virt_addr: 0x1fff };
        let msg = err.to_string();
        assert!(msg.contains("0x1fff"));
        assert!(msg.contains("segmentation fault"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Parse {
            key: "PAGING_SIM_FRAME_SIZE".to_string(),
            value: "four".to_string(),
        };
        assert!(err.to_string().contains("PAGING_SIM_FRAME_SIZE"));
    }
}
