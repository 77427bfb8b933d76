// frame/page size in bytes, must be a power of two
pub const FRAME_SIZE: usize = 4 * 1024;
pub const PAGE_SIZE: usize = FRAME_SIZE;

pub const OFFSET_BITS: u32 = FRAME_SIZE.trailing_zeros();
pub const OFFSET_MASK: usize = FRAME_SIZE - 1;

// 1 MiB of simulated physical memory
pub const DEFAULT_MEMORY_SIZE: usize = 1024 * 1024;
pub const NUM_FRAMES: usize = DEFAULT_MEMORY_SIZE / FRAME_SIZE;
pub const DEFAULT_PAGE_TABLE_SIZE: usize = DEFAULT_MEMORY_SIZE / FRAME_SIZE;

// page table value for "no frame mapped"; also the base of frame 0
pub const UNMAPPED: usize = 0;
pub const GUARD_PAGE: usize = 0;

pub const DEFAULT_EXEC_LOG_SIZE: usize = 5;

// page table dump layout
pub const DUMP_ENTRIES_PER_ROW: usize = 16;

pub const ENV_FRAME_SIZE: &str = "PAGING_SIM_FRAME_SIZE";
pub const ENV_MEMORY_SIZE: &str = "PAGING_SIM_MEMORY_SIZE";
pub const ENV_PAGE_TABLE_SIZE: &str = "PAGING_SIM_PAGE_TABLE_SIZE";

const _: () = assert!(FRAME_SIZE.is_power_of_two());
const _: () = assert!(DEFAULT_MEMORY_SIZE % FRAME_SIZE == 0);
