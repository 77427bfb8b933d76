pub mod config;
pub mod constants;
pub mod error;
pub mod exec_log;
pub mod frame_allocator;
pub mod memory;
pub mod process;
pub mod session;
pub mod translation;

// Re-export commonly used items for convenience
pub use config::MemoryConfig;
pub use error::{ConfigError, MemoryError, MemoryResult};
pub use exec_log::{Action, ExecLog, ExecLogEntry};
pub use process::{Pid, Process};
pub use session::Session;
pub use translation::{PageTable, VirtualAddress};
