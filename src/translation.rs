use std::fmt;

use crate::constants::*;
use crate::error::{MemoryError, MemoryResult};

/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: usize,
    pub page: usize,
    pub offset: usize,
}

impl VirtualAddress {
    /// Decompose a raw VA into page index and byte offset
    pub fn from_raw(va: usize, frame_size: usize) -> Self {
        debug_assert!(frame_size.is_power_of_two());
        VirtualAddress {
            va,
            page: va / frame_size,
            offset: va & (frame_size - 1),
        }
    }

    /// First virtual address of a page
    #[inline]
    pub fn page_base(page: usize, frame_size: usize) -> usize {
        page * frame_size
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA({:#x}) = (p={}, w={:#x})", self.va, self.page, self.offset)
    }
}

/// Single-level page table: index is the page number, value is the base
/// address of the mapped frame or `UNMAPPED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTable {
    entries: Vec<usize>,
    frame_size: usize,
}

impl PageTable {
    pub fn new(size: usize, frame_size: usize) -> Self {
        PageTable {
            entries: vec![UNMAPPED; size],
            frame_size,
        }
    }

    /// Number of slots in the table
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    #[inline]
    pub fn in_range(&self, page: usize) -> bool {
        page < self.entries.len()
    }

    /// Frame base address mapped at `page`, if any
    pub fn frame_of(&self, page: usize) -> Option<usize> {
        match self.entries.get(page) {
            Some(&frame_addr) if frame_addr != UNMAPPED => Some(frame_addr),
            _ => None,
        }
    }

    #[inline]
    pub fn is_mapped(&self, page: usize) -> bool {
        self.frame_of(page).is_some()
    }

    /// Bind `page` to `frame_addr`. The caller has already checked that the
    /// frame is free.
    pub fn map(&mut self, page: usize, frame_addr: usize) {
        self.entries[page] = frame_addr;
    }

    /// Clear `page`, returning the frame it was bound to
    pub fn unmap(&mut self, page: usize) -> Option<usize> {
        let previous = self.frame_of(page);
        if self.in_range(page) {
            self.entries[page] = UNMAPPED;
        }
        previous
    }

    /// Does any slot reference this frame base address?
    pub fn contains_frame(&self, frame_addr: usize) -> bool {
        self.entries.iter().any(|&entry| entry == frame_addr)
    }

    /// Translate a virtual address to a physical address
    pub fn translate(&self, virt_addr: usize) -> MemoryResult<usize> {
        let va = VirtualAddress::from_raw(virt_addr, self.frame_size);
        match self.frame_of(va.page) {
            Some(frame_addr) => Ok(frame_addr + va.offset),
            None => Err(MemoryError::InvalidPage { virt_addr }),
        }
    }

    /// Iterate over `(page, frame_addr)` for every mapped page
    pub fn mapped(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|&(_, &frame_addr)| frame_addr != UNMAPPED)
            .map(|(page, &frame_addr)| (page, frame_addr))
    }

    /// Ordered `(page, frame)` listing of every slot, `None` when unmapped
    pub fn dump(&self) -> Vec<(usize, Option<usize>)> {
        (0..self.entries.len())
            .map(|page| (page, self.frame_of(page)))
            .collect()
    }
}

impl fmt::Display for PageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "size: {}", self.entries.len())?;
        for row in self.entries.chunks(DUMP_ENTRIES_PER_ROW) {
            let cells: Vec<String> = row.iter().map(|entry| format!("{:#8x}", entry)).collect();
            writeln!(f, "{}", cells.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Address decomposition
    // =========================================================================

    #[test]
    fn test_va_decomposition() {
        let va = VirtualAddress::from_raw(0x1FFF, FRAME_SIZE);
        assert_eq!(va.page, 1);
        assert_eq!(va.offset, 0xFFF);

        let va = VirtualAddress::from_raw(0x5_0010, FRAME_SIZE);
        assert_eq!(va.page, 0x50);
        assert_eq!(va.offset, 0x10);
    }

    #[test]
    fn test_va_decomposition_edge_cases() {
        let va = VirtualAddress::from_raw(0, FRAME_SIZE);
        assert_eq!(va.page, 0);
        assert_eq!(va.offset, 0);

        // first byte of page 1
        let va = VirtualAddress::from_raw(FRAME_SIZE, FRAME_SIZE);
        assert_eq!(va.page, 1);
        assert_eq!(va.offset, 0);
    }

    #[test]
    fn test_va_reconstruction() {
        for &original in &[0usize, 0x1000, 0x1FFF, 0x2345, 0xF_FFFF] {
            let va = VirtualAddress::from_raw(original, FRAME_SIZE);
            let reconstructed = VirtualAddress::page_base(va.page, FRAME_SIZE) + va.offset;
            assert_eq!(reconstructed, original, "Failed for VA={:#x}", original);
        }
    }

    #[test]
    fn test_display() {
        let va = VirtualAddress::from_raw(0x1FFF, FRAME_SIZE);
        let display = format!("{}", va);
        assert!(display.contains("0x1fff"));
        assert!(display.contains("p=1"));
    }

    // =========================================================================
    // Page table
    // =========================================================================

    fn setup_table() -> PageTable {
        let mut pt = PageTable::new(DEFAULT_PAGE_TABLE_SIZE, FRAME_SIZE);
        // page 1 -> frame 9, page 5 -> frame 3
        pt.map(1, 9 * FRAME_SIZE);
        pt.map(5, 3 * FRAME_SIZE);
        pt
    }

    #[test]
    fn test_new_table_is_unmapped() {
        let pt = PageTable::new(16, FRAME_SIZE);
        assert_eq!(pt.len(), 16);
        assert_eq!(pt.mapped().count(), 0);
        assert!(!pt.is_mapped(0));
    }

    #[test]
    fn test_translate_mapped() {
        let pt = setup_table();
        assert_eq!(pt.translate(0x1000), Ok(9 * FRAME_SIZE));
        assert_eq!(pt.translate(0x1FFF), Ok(9 * FRAME_SIZE + 0xFFF));
        assert_eq!(pt.translate(0x5123), Ok(3 * FRAME_SIZE + 0x123));
    }

    #[test]
    fn test_translate_unmapped_is_invalid_page() {
        let pt = setup_table();
        assert_eq!(
            pt.translate(0x2000),
            Err(MemoryError::InvalidPage { virt_addr: 0x2000 })
        );
        // guard page is never mapped
        assert_eq!(pt.translate(0), Err(MemoryError::InvalidPage { virt_addr: 0 }));
    }

    #[test]
    fn test_translate_out_of_range_is_invalid_page() {
        let pt = setup_table();
        let beyond = DEFAULT_PAGE_TABLE_SIZE * FRAME_SIZE;
        assert_eq!(
            pt.translate(beyond),
            Err(MemoryError::InvalidPage { virt_addr: beyond })
        );
    }

    #[test]
    fn test_unmap_returns_previous_frame() {
        let mut pt = setup_table();
        assert_eq!(pt.unmap(1), Some(9 * FRAME_SIZE));
        assert!(!pt.is_mapped(1));
        assert_eq!(pt.unmap(1), None);
        // out of range is harmless
        assert_eq!(pt.unmap(DEFAULT_PAGE_TABLE_SIZE + 3), None);
    }

    #[test]
    fn test_contains_frame() {
        let pt = setup_table();
        assert!(pt.contains_frame(9 * FRAME_SIZE));
        assert!(pt.contains_frame(3 * FRAME_SIZE));
        assert!(!pt.contains_frame(4 * FRAME_SIZE));
    }

    #[test]
    fn test_dump_lists_every_slot_in_order() {
        let pt = setup_table();
        let dump = pt.dump();
        assert_eq!(dump.len(), DEFAULT_PAGE_TABLE_SIZE);
        assert_eq!(dump[0], (0, None));
        assert_eq!(dump[1], (1, Some(9 * FRAME_SIZE)));
        assert_eq!(dump[5], (5, Some(3 * FRAME_SIZE)));
        assert!(dump.iter().enumerate().all(|(i, &(page, _))| i == page));
    }

    #[test]
    fn test_display_grid() {
        let pt = setup_table();
        let text = pt.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "size: 256");
        // 256 entries, 16 per row
        assert_eq!(lines.len(), 1 + DEFAULT_PAGE_TABLE_SIZE / DUMP_ENTRIES_PER_ROW);
        assert!(lines[1].contains("0x9000"));
    }
}
