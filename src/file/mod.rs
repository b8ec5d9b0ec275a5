mod buffer_pool;
mod db_file;
mod error;
mod mem_file;
mod page;
mod paged_file;

pub use buffer_pool::{BufferPool, PoolStats, SlotId};
pub use db_file::DbFile;
pub use error::{FileError, FileResult};
pub use mem_file::MemFile;
pub use page::{Page, PageId};
pub use paged_file::PagedFile;

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Number of slots in the buffer pool when no capacity is configured
pub const DEFAULT_POOL_CAPACITY: usize = 50;
