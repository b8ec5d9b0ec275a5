use super::error::FileResult;
use super::page::Page;

/// A file of fixed-size pages that the buffer pool reads from and writes back to.
///
/// Implementations own their storage. The buffer pool only borrows a file for
/// the duration of a single read or write and never keeps a reference to it.
pub trait DbFile {
    /// Stable logical name of the file; scopes every `PageId` in it
    fn name(&self) -> &str;

    /// Fill `page` with the contents of page `index`.
    ///
    /// Fails with `PageOutOfRange` when `index` is past the end of the file.
    fn read_page(&mut self, page: &mut Page, index: usize) -> FileResult<()>;

    /// Persist `page` as page `index`, growing the file if needed
    fn write_page(&mut self, page: &Page, index: usize) -> FileResult<()>;

    /// Number of pages currently stored in the file
    fn page_count(&self) -> FileResult<usize>;

    /// Flush OS buffers to stable storage
    fn sync(&mut self) -> FileResult<()> {
        Ok(())
    }
}
