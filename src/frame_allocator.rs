//! Frame allocator for demand paging.
//!
//! A single cursor walks the frame indices round-robin and is shared by every
//! process in a session. Next to the cursor the allocator keeps an ownership
//! table (frame index -> owning process and page) so a frame bound in one
//! process's page table is never handed to another one.
//!
//! Frame 0 is never handed out: its base address is 0, which page tables use
//! to mean "unmapped".

use log::{debug, error, warn};

use crate::config::MemoryConfig;
use crate::constants::*;
use crate::error::{MemoryError, MemoryResult};
use crate::process::Pid;
use crate::translation::{PageTable, VirtualAddress};

/// Which process page currently holds a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOwner {
    pub pid: Pid,
    pub page: usize,
}

#[derive(Debug, Clone)]
pub struct FrameAllocator {
    /// Index of the frame handed out last
    cursor: usize,
    frame_size: usize,
    owners: Vec<Option<FrameOwner>>,
}

impl FrameAllocator {
    pub fn new(config: &MemoryConfig) -> Self {
        FrameAllocator {
            cursor: 0,
            frame_size: config.frame_size(),
            owners: vec![None; config.num_frames()],
        }
    }

    /// Find a free frame for the page containing `virt_addr` and record
    /// `pid` as its owner. Returns the frame base address.
    ///
    /// The search starts right after the previous allocation and gives up
    /// after one full revolution. The frame is not zeroed here.
    pub fn allocate_frame(
        &mut self,
        pid: Pid,
        page_table: &PageTable,
        virt_addr: usize,
    ) -> MemoryResult<usize> {
        let page = VirtualAddress::from_raw(virt_addr, self.frame_size).page;
        if page == GUARD_PAGE {
            warn!("{} attempted to map guard page ({:#x}) to a frame", pid, virt_addr);
            return Err(MemoryError::GuardPageViolation { pid, virt_addr });
        }

        let total_frames = self.owners.len();
        for _ in 0..total_frames {
            self.cursor = (self.cursor + 1) % total_frames;
            if self.cursor == 0 {
                continue;
            }

            let frame_addr = self.cursor * self.frame_size;
            if self.owners[self.cursor].is_none() && !page_table.contains_frame(frame_addr) {
                self.owners[self.cursor] = Some(FrameOwner { pid, page });
                debug!("frame {} assigned to page {} of {}", self.cursor, page, pid);
                return Ok(frame_addr);
            }
        }

        error!("no free frame for page {} of {}: memory is full", page, pid);
        Err(MemoryError::OutOfMemory { pid, page })
    }

    /// Return a frame to the pool, yielding its previous owner
    pub fn release(&mut self, frame_addr: usize) -> Option<FrameOwner> {
        let frame = frame_addr / self.frame_size;
        let owner = self.owners.get_mut(frame)?.take();
        if let Some(owner) = owner {
            debug!("frame {} released by page {} of {}", frame, owner.page, owner.pid);
        }
        owner
    }

    /// Release every frame owned by `pid`, returning how many were freed
    pub fn release_all(&mut self, pid: Pid) -> usize {
        let mut released = 0;
        for slot in self.owners.iter_mut() {
            if matches!(slot, Some(owner) if owner.pid == pid) {
                *slot = None;
                released += 1;
            }
        }
        released
    }

    pub fn owner(&self, frame: usize) -> Option<FrameOwner> {
        self.owners.get(frame).copied().flatten()
    }

    /// Number of frames still available (frame 0 excluded)
    pub fn free_frames(&self) -> usize {
        self.owners.iter().skip(1).filter(|slot| slot.is_none()).count()
    }

    #[inline]
    pub fn total_frames(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
