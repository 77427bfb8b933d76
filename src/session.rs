//! Simulation session.
//!
//! A `Session` owns everything that is shared between processes: physical
//! memory, the frame allocator and the execution log. Processes live in an
//! arena keyed by [`Pid`], so log entries can refer to a process without
//! owning it and rollback can notice when one has been destroyed.
//!
//! Every operation runs to completion before the next one starts; nothing
//! here is meant to be shared across threads.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, error, info, trace, warn};

use crate::config::MemoryConfig;
use crate::error::{ConfigError, MemoryError, MemoryResult};
use crate::exec_log::{Action, ExecLog, ExecLogEntry};
use crate::frame_allocator::{FrameAllocator, FrameOwner};
use crate::memory::PhysicalMemory;
use crate::process::{Pid, Process};
use crate::translation::VirtualAddress;

pub struct Session {
    config: MemoryConfig,
    memory: PhysicalMemory,
    allocator: FrameAllocator,
    log: ExecLog,
    processes: BTreeMap<Pid, Process>,
    next_pid: usize,
}

impl Session {
    pub fn new(config: MemoryConfig) -> Self {
        debug!(
            "session: {} bytes of memory, {} frames of {} bytes, {} page table slots",
            config.memory_size(),
            config.num_frames(),
            config.frame_size(),
            config.page_table_size()
        );
        Session {
            memory: PhysicalMemory::new(&config),
            allocator: FrameAllocator::new(&config),
            log: ExecLog::new(),
            processes: BTreeMap::new(),
            next_pid: 1,
            config,
        }
    }

    /// Build a session sized by the `PAGING_SIM_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(MemoryConfig::from_env()?))
    }

    #[inline]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    // =========================================================================
    // Process lifecycle
    // =========================================================================

    pub fn create_process(&mut self, name: impl Into<String>) -> Pid {
        let pid = Pid(self.next_pid);
        self.next_pid += 1;

        let process = Process::new(pid, name, &self.config);
        info!("created process {}", process);
        self.processes.insert(pid, process);
        pid
    }

    /// Tear down a process and give its frames back to the allocator.
    ///
    /// Log entries written by the process stay on the stack; rolling them
    /// back later is a no-op.
    pub fn destroy_process(&mut self, pid: Pid) -> MemoryResult<Process> {
        let process = self
            .processes
            .remove(&pid)
            .ok_or(MemoryError::NoSuchProcess(pid))?;
        let released = self.allocator.release_all(pid);
        info!("destroyed process {}, released {} frame(s)", process, released);
        Ok(process)
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    /// Live processes in pid order
    pub fn processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.processes.values()
    }

    fn lookup(&self, pid: Pid) -> MemoryResult<&Process> {
        self.processes.get(&pid).ok_or(MemoryError::NoSuchProcess(pid))
    }

    // =========================================================================
    // Memory access
    // =========================================================================

    /// Read one byte. An unmapped or out-of-range page is a segmentation
    /// fault: nothing is logged and no state changes.
    pub fn read_byte(&mut self, pid: Pid, virt_addr: usize) -> MemoryResult<u8> {
        let process = self
            .processes
            .get(&pid)
            .ok_or(MemoryError::NoSuchProcess(pid))?;

        let phys_addr = match process.page_table().translate(virt_addr) {
            Ok(phys_addr) => phys_addr,
            Err(_) => {
                error!("page fault while accessing {:#x}", virt_addr);
                error!("{}: Segmentation fault", process.name());
                return Err(MemoryError::SegFault { pid, virt_addr });
            }
        };

        self.log.push(ExecLogEntry::read(pid, virt_addr));
        let value = self.memory.read(phys_addr);
        trace!("{} read {:#04x} at {:#x}", pid, value, virt_addr);
        Ok(value)
    }

    /// Write one byte, mapping a fresh zeroed frame on a page fault
    pub fn write_byte(&mut self, pid: Pid, virt_addr: usize, value: u8) -> MemoryResult<()> {
        let frame_size = self.config.frame_size();
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(MemoryError::NoSuchProcess(pid))?;

        let va = VirtualAddress::from_raw(virt_addr, frame_size);
        if !process.page_table().in_range(va.page) {
            error!("{}: Segmentation fault writing {:#x}", process.name(), virt_addr);
            return Err(MemoryError::SegFault { pid, virt_addr });
        }

        let mut did_map = false;
        if !process.page_table().is_mapped(va.page) {
            let frame_addr = self
                .allocator
                .allocate_frame(pid, process.page_table(), virt_addr)?;
            let frame = self.memory.address_to_frame(frame_addr);
            self.memory.zero_frame(frame);
            process.page_table_mut().map(va.page, frame_addr);
            did_map = true;
            debug!("{}: page {} mapped to frame {}", process.name(), va.page, frame);
        }

        let phys_addr = process.page_table().translate(virt_addr).map_err(|err| {
            error!("[FATAL] {}: {} after page fault handling", process.name(), err);
            err
        })?;

        let old = self.memory.read(phys_addr);
        self.log
            .push(ExecLogEntry::write(pid, virt_addr, old, value, did_map));
        self.memory.write(phys_addr, value);
        trace!("{} wrote {:#04x} at {:#x} (was {:#04x})", pid, value, virt_addr, old);
        Ok(())
    }

    /// Read a byte without faulting or logging. Unmapped addresses read as 0.
    pub fn inspect_byte(&self, pid: Pid, virt_addr: usize) -> MemoryResult<u8> {
        let process = self.lookup(pid)?;
        Ok(process
            .page_table()
            .translate(virt_addr)
            .map(|phys_addr| self.memory.read(phys_addr))
            .unwrap_or(0))
    }

    /// `len` consecutive bytes starting at `start`, sampled with `inspect_byte`
    pub fn inspect_range(&self, pid: Pid, start: usize, len: usize) -> MemoryResult<Vec<u8>> {
        let process = self.lookup(pid)?;
        let table = process.page_table();
        Ok((start..start.saturating_add(len))
            .map(|addr| {
                table
                    .translate(addr)
                    .map(|phys_addr| self.memory.read(phys_addr))
                    .unwrap_or(0)
            })
            .collect())
    }

    /// Drop the mapping of the page containing `virt_addr` and release its
    /// frame. Returns the frame base the page was bound to.
    ///
    /// The old binding is not kept anywhere that rollback could use, so an
    /// unmap cannot be undone.
    pub fn unmap_page(&mut self, pid: Pid, virt_addr: usize) -> MemoryResult<Option<usize>> {
        let frame_size = self.config.frame_size();
        let process = self
            .processes
            .get_mut(&pid)
            .ok_or(MemoryError::NoSuchProcess(pid))?;

        let va = VirtualAddress::from_raw(virt_addr, frame_size);
        if !process.page_table().in_range(va.page) {
            error!("{}: Segmentation fault unmapping {:#x}", process.name(), virt_addr);
            return Err(MemoryError::SegFault { pid, virt_addr });
        }

        let released = process.page_table_mut().unmap(va.page);
        if let Some(frame_addr) = released {
            self.allocator.release(frame_addr);
        }
        debug!("{}: page {} unmapped", process.name(), va.page);

        let page_base = VirtualAddress::page_base(va.page, frame_size);
        self.log.push(ExecLogEntry::unmap(pid, page_base, released));
        Ok(released)
    }

    // =========================================================================
    // Rollback
    // =========================================================================

    /// Undo the most recent logged operation and return its entry.
    ///
    /// Writes are reversed directly on physical memory and the page table,
    /// so undoing never pushes anything onto the log. Reads and unmaps are
    /// only popped.
    pub fn rollback(&mut self) -> Option<ExecLogEntry> {
        let entry = self.log.pop()?;
        if let Action::Write { old, .. } = entry.action {
            self.undo_write(&entry, old);
        }
        Some(entry)
    }

    fn undo_write(&mut self, entry: &ExecLogEntry, old: u8) {
        let frame_size = self.config.frame_size();
        let Some(process) = self.processes.get_mut(&entry.pid) else {
            warn!("rollback: {} no longer exists, skipping write at {:#x}", entry.pid, entry.virt_addr);
            return;
        };

        match process.page_table().translate(entry.virt_addr) {
            Ok(phys_addr) => self.memory.write(phys_addr, old),
            Err(_) => {
                warn!(
                    "rollback: {} page at {:#x} is no longer mapped",
                    process.name(),
                    entry.virt_addr
                );
                return;
            }
        }

        if entry.did_map {
            let page = VirtualAddress::from_raw(entry.virt_addr, frame_size).page;
            if let Some(frame_addr) = process.page_table_mut().unmap(page) {
                self.allocator.release(frame_addr);
            }
        }
        info!(
            "rolled back write by {} at {:#x}{}",
            process.name(),
            entry.virt_addr,
            if entry.did_map { " (page unmapped)" } else { "" }
        );
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn dump_page_table(&self, pid: Pid) -> MemoryResult<Vec<(usize, Option<usize>)>> {
        Ok(self.lookup(pid)?.page_table().dump())
    }

    #[inline]
    pub fn exec_log(&self) -> &ExecLog {
        &self.log
    }

    pub fn frame_owner(&self, frame: usize) -> Option<FrameOwner> {
        self.allocator.owner(frame)
    }

    pub fn free_frames(&self) -> usize {
        self.allocator.free_frames()
    }

    /// The execution log, most recent first, labelled with process names
    pub fn describe_log(&self) -> String {
        let mut out = String::new();
        for entry in self.log.iter() {
            let actor = Actor(entry.pid, self.processes.get(&entry.pid));
            // writing into a String cannot fail
            let _ = entry.describe(&mut out, &actor);
            out.push('\n');
        }
        out
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

struct Actor<'a>(Pid, Option<&'a Process>);

impl fmt::Display for Actor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            Some(process) => write!(f, "{}", process.name()),
            None => write!(f, "<{} destroyed>", self.0),
        }
    }
}
