use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("Page out of range: {file}:{page} (file has {page_count} pages)")]
    PageOutOfRange {
        file: String,
        page: usize,
        page_count: usize,
    },

    #[error("Dirty page {0} cannot be written back: its file is no longer registered")]
    OrphanedPage(String),

    #[error("Invalid page id: {0} (expected <file>:<page>)")]
    InvalidPageId(String),
}

pub type FileResult<T> = Result<T, FileError>;
