use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::FileCatalog;
use crate::config::{ConfigError, PoolConfig};
use crate::file::{BufferPool, DbFile, FileError, MemFile, Page, PageId, PagedFile};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Cannot read/write file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("File error: {0}")]
    FileError(#[from] FileError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// A set of page files and the one buffer pool that caches them.
///
/// All page access goes through here so that the pool stays the only
/// writer of cached pages. Dropping the database writes back every dirty
/// page; call [`Database::close`] to see any error from doing so.
pub struct Database {
    /// Where new files are created; `None` keeps everything in memory
    data_dir: Option<PathBuf>,
    files: FileCatalog,
    pool: BufferPool,
}

impl Database {
    /// Create a database whose files live only in memory
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            data_dir: None,
            files: FileCatalog::new(),
            pool: BufferPool::with_capacity(capacity),
        }
    }

    /// Open the database in `config.data_dir`, registering every file found there
    pub fn open(config: &PoolConfig) -> DatabaseResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let mut paths: Vec<PathBuf> = fs::read_dir(&config.data_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                // Catalog keys are file names, which must round-trip exactly
                let utf8 = path.file_name().and_then(|n| n.to_str()).is_some();
                if !utf8 {
                    warn!("skipping {}: file name is not valid UTF-8", path.display());
                }
                utf8
            })
            .collect();
        paths.sort();

        let mut files = FileCatalog::new();
        for path in paths {
            files.add(Box::new(PagedFile::open(&path)?))?;
        }

        let mut pool = BufferPool::with_capacity(config.capacity);
        pool.set_sync_on_flush(config.sync_on_flush);

        info!(
            "opened {} with {} files and {} buffer slots",
            config.data_dir.display(),
            files.len(),
            config.capacity
        );

        Ok(Self {
            data_dir: Some(config.data_dir.clone()),
            files,
            pool,
        })
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    // File operations

    /// Create a file of `pages` zeroed pages and register it
    pub fn create_file(&mut self, name: &str, pages: usize) -> DatabaseResult<()> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(DatabaseError::InvalidFileName(name.to_string()));
        }
        if self.files.contains(name) {
            return Err(FileError::FileAlreadyExists(name.to_string()).into());
        }

        let file: Box<dyn DbFile> = match &self.data_dir {
            Some(dir) => {
                let mut file = PagedFile::create(dir.join(name))?;
                for _ in 0..pages {
                    file.append_page()?;
                }
                Box::new(file)
            }
            None => Box::new(MemFile::new(name, pages)),
        };

        debug!("created {name} with {pages} pages");
        self.add_file(file)
    }

    /// Register an existing file under its own name
    pub fn add_file(&mut self, file: Box<dyn DbFile>) -> DatabaseResult<()> {
        self.files.add(file)?;
        Ok(())
    }

    /// Detach a file after writing back its dirty pages.
    ///
    /// Its pages are dropped from the pool so that nothing cached can
    /// outlive the file's registration.
    pub fn remove_file(&mut self, name: &str) -> DatabaseResult<Box<dyn DbFile>> {
        if !self.files.contains(name) {
            return Err(FileError::FileNotFound(name.to_string()).into());
        }

        self.pool.flush_file(&mut self.files, name)?;
        self.pool.discard_file(name);
        let file = self.files.remove(name)?;

        debug!("removed {name}");
        Ok(file)
    }

    pub fn file(&self, name: &str) -> DatabaseResult<&dyn DbFile> {
        Ok(self.files.get(name)?)
    }

    pub fn files(&self) -> &FileCatalog {
        &self.files
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    // Page operations

    pub fn fetch(&mut self, pid: &PageId) -> DatabaseResult<&mut Page> {
        Ok(self.pool.fetch(&mut self.files, pid)?)
    }

    pub fn mark_dirty(&mut self, pid: &PageId) {
        self.pool.mark_dirty(pid);
    }

    pub fn is_dirty(&self, pid: &PageId) -> bool {
        self.pool.is_dirty(pid)
    }

    pub fn contains(&self, pid: &PageId) -> bool {
        self.pool.contains(pid)
    }

    pub fn discard_page(&mut self, pid: &PageId) {
        self.pool.discard_page(pid);
    }

    pub fn flush_page(&mut self, pid: &PageId) -> DatabaseResult<()> {
        Ok(self.pool.flush_page(&mut self.files, pid)?)
    }

    pub fn flush_file(&mut self, name: &str) -> DatabaseResult<()> {
        Ok(self.pool.flush_file(&mut self.files, name)?)
    }

    pub fn flush_all(&mut self) -> DatabaseResult<()> {
        Ok(self.pool.flush_all(&mut self.files)?)
    }

    /// Write back all dirty pages and sync every file.
    ///
    /// Every dirty page is attempted even if some writes fail; the first
    /// failure is returned.
    pub fn close(mut self) -> DatabaseResult<()> {
        let flushed = self.pool.flush_all(&mut self.files);
        let synced = self.files.sync_all();
        flushed?;
        synced?;
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Flush all dirty pages when the database is dropped
        if let Err(err) = self.pool.flush_all(&mut self.files) {
            error!("failed to write back dirty pages on shutdown: {err}");
        }
    }
}

#[cfg(test)]
mod tests;
