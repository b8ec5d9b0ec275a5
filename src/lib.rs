pub mod catalog;
pub mod config;
pub mod database;
pub mod file;
pub mod shell;

pub use catalog::FileCatalog;
pub use config::{ConfigError, ConfigResult, PoolConfig};
pub use database::{Database, DatabaseError, DatabaseResult};
pub use file::{
    BufferPool, DEFAULT_POOL_CAPACITY, DbFile, FileError, FileResult, MemFile, PAGE_SIZE, Page,
    PageId, PagedFile, PoolStats, SlotId,
};
