use crate::config::MemoryConfig;

/// Flat byte-addressable physical memory, partitioned into frames
pub struct PhysicalMemory {
    data: Box<[u8]>,
    frame_size: usize,
}

impl PhysicalMemory {
    /// Create a new physical memory initialized to all zeros
    pub fn new(config: &MemoryConfig) -> Self {
        PhysicalMemory {
            data: vec![0u8; config.memory_size()].into_boxed_slice(),
            frame_size: config.frame_size(),
        }
    }

    /// Read a byte from physical memory
    #[inline]
    pub fn read(&self, address: usize) -> u8 {
        self.data[address]
    }

    /// Write a byte to physical memory
    #[inline]
    pub fn write(&mut self, address: usize, value: u8) {
        self.data[address] = value;
    }

    /// Calculate the starting address of a frame
    #[inline]
    pub fn frame_to_address(&self, frame: usize) -> usize {
        frame * self.frame_size
    }

    /// Frame index containing a physical address
    #[inline]
    pub fn address_to_frame(&self, address: usize) -> usize {
        address / self.frame_size
    }

    /// Zero-fill a whole frame so a new tenant never sees stale bytes
    pub fn zero_frame(&mut self, frame: usize) {
        let start = self.frame_to_address(frame);
        self.data[start..start + self.frame_size].fill(0);
    }

    /// Borrow the bytes of one frame
    pub fn frame(&self, frame: usize) -> &[u8] {
        let start = self.frame_to_address(frame);
        &self.data[start..start + self.frame_size]
    }

    #[inline]
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.frame_size
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Get direct access to the underlying data (for memory dumps)
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl Default for PhysicalMemory {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}
