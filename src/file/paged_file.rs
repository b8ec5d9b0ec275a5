use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::PAGE_SIZE;
use super::db_file::DbFile;
use super::error::{FileError, FileResult};
use super::page::Page;

/// A page file on disk. Page `n` lives at byte offset `n * PAGE_SIZE`.
pub struct PagedFile {
    name: String,
    path: PathBuf,
    file: File,
}

impl PagedFile {
    /// Create a new, empty file. Fails if the path already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> FileResult<Self> {
        let path = path.as_ref();

        if path.exists() {
            return Err(FileError::FileAlreadyExists(path.display().to_string()));
        }

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(Self::from_parts(path, file))
    }

    /// Open an existing file for reading and writing
    pub fn open<P: AsRef<Path>>(path: P) -> FileResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FileError::FileNotFound(path.display().to_string()));
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::from_parts(path, file))
    }

    fn from_parts(path: &Path, file: File) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            path: path.to_path_buf(),
            file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Grow the file by one zeroed page and return its index
    pub fn append_page(&mut self) -> FileResult<usize> {
        let index = self.page_count()?;
        self.file.set_len(((index + 1) * PAGE_SIZE) as u64)?;
        Ok(index)
    }
}

impl DbFile for PagedFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&mut self, page: &mut Page, index: usize) -> FileResult<()> {
        let page_count = self.page_count()?;
        if index >= page_count {
            return Err(FileError::PageOutOfRange {
                file: self.name.clone(),
                page: index,
                page_count,
            });
        }

        let offset = (index * PAGE_SIZE) as u64;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = self.file.read(&mut page[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        // A trailing partial page reads as zero-padded
        page[filled..].fill(0);

        Ok(())
    }

    fn write_page(&mut self, page: &Page, index: usize) -> FileResult<()> {
        let offset = (index * PAGE_SIZE) as u64;
        let required_size = offset + PAGE_SIZE as u64;

        // Extend file if necessary to ensure we can write at this offset
        let current_size = self.file.metadata()?.len();
        if current_size < required_size {
            self.file.set_len(required_size)?;
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page)?;
        Ok(())
    }

    fn page_count(&self) -> FileResult<usize> {
        let file_size = self.file.metadata()?.len();
        Ok(file_size.div_ceil(PAGE_SIZE as u64) as usize)
    }

    fn sync(&mut self) -> FileResult<()> {
        self.file.sync_data()?;
        Ok(())
    }
}
