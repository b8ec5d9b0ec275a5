use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PAGE_SIZE;
use super::error::FileError;

/// Identifies a page by the name of its file and its index within that file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId {
    pub file: String,
    pub page: usize,
}

impl PageId {
    pub fn new(file: impl Into<String>, page: usize) -> Self {
        Self {
            file: file.into(),
            page,
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.page)
    }
}

impl FromStr for PageId {
    type Err = FileError;

    /// Parses `<file>:<page>`. The file name may itself contain colons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file, page) = s
            .rsplit_once(':')
            .ok_or_else(|| FileError::InvalidPageId(s.to_string()))?;
        if file.is_empty() {
            return Err(FileError::InvalidPageId(s.to_string()));
        }
        let page = page
            .parse()
            .map_err(|_| FileError::InvalidPageId(s.to_string()))?;
        Ok(Self::new(file, page))
    }
}

/// One page worth of bytes.
///
/// A page has no identity of its own: the buffer pool decides which
/// `PageId` the slot holding it currently represents.
#[derive(Clone)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
}

impl Page {
    /// Create a zero-filled page
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("head", &&self.data[..16])
            .finish_non_exhaustive()
    }
}

impl Deref for Page {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data[..]
    }
}

impl DerefMut for Page {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }
}
