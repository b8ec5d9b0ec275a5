use super::db_file::DbFile;
use super::error::{FileError, FileResult};
use super::page::Page;

/// A page file held entirely in memory
#[derive(Debug, Clone)]
pub struct MemFile {
    name: String,
    pages: Vec<Page>,
}

impl MemFile {
    /// Create a file with `page_count` zeroed pages
    pub fn new(name: impl Into<String>, page_count: usize) -> Self {
        Self {
            name: name.into(),
            pages: vec![Page::new(); page_count],
        }
    }

    /// Grow the file by one zeroed page and return its index
    pub fn append_page(&mut self) -> usize {
        self.pages.push(Page::new());
        self.pages.len() - 1
    }

    /// Direct view of a stored page, bypassing any cache
    pub fn stored_page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }
}

impl DbFile for MemFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&mut self, page: &mut Page, index: usize) -> FileResult<()> {
        let stored = self
            .pages
            .get(index)
            .ok_or_else(|| FileError::PageOutOfRange {
                file: self.name.clone(),
                page: index,
                page_count: self.pages.len(),
            })?;
        page.copy_from_slice(stored);
        Ok(())
    }

    fn write_page(&mut self, page: &Page, index: usize) -> FileResult<()> {
        if index >= self.pages.len() {
            self.pages.resize_with(index + 1, Page::new);
        }
        self.pages[index].copy_from_slice(page);
        Ok(())
    }

    fn page_count(&self) -> FileResult<usize> {
        Ok(self.pages.len())
    }
}
