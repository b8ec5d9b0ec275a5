use ahash::AHashMap;

use crate::file::{DbFile, FileError, FileResult};

/// Registry of the files known to a database, keyed by file name.
///
/// The catalog owns every file. The buffer pool borrows files from it one
/// operation at a time to satisfy misses and write-backs.
#[derive(Default)]
pub struct FileCatalog {
    files: AHashMap<String, Box<dyn DbFile>>,
}

impl FileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file under its own name
    pub fn add(&mut self, file: Box<dyn DbFile>) -> FileResult<()> {
        let name = file.name().to_string();
        if self.files.contains_key(&name) {
            return Err(FileError::FileAlreadyExists(name));
        }
        self.files.insert(name, file);
        Ok(())
    }

    /// Detach a file and hand ownership back to the caller.
    ///
    /// Dirty pages cached for the file are not flushed here; use
    /// `Database::remove_file` for that.
    pub fn remove(&mut self, name: &str) -> FileResult<Box<dyn DbFile>> {
        self.files
            .remove(name)
            .ok_or_else(|| FileError::FileNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> FileResult<&dyn DbFile> {
        self.files
            .get(name)
            .map(|f| f.as_ref())
            .ok_or_else(|| FileError::FileNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> FileResult<&mut dyn DbFile> {
        let file = self
            .files
            .get_mut(name)
            .ok_or_else(|| FileError::FileNotFound(name.to_string()))?;
        let file: &mut dyn DbFile = file.as_mut();
        Ok(file)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Names of all registered files, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Sync every file to stable storage
    pub fn sync_all(&mut self) -> FileResult<()> {
        for file in self.files.values_mut() {
            file.sync()?;
        }
        Ok(())
    }
}
