use ahash::AHashSet;
use log::{debug, error, trace, warn};
use lru::LruCache;
use serde::Serialize;

use super::error::{FileError, FileResult};
use super::page::{Page, PageId};
use super::DEFAULT_POOL_CAPACITY;
use crate::catalog::FileCatalog;

/// Index of a slot in the buffer pool
pub type SlotId = usize;

/// Counters describing how the buffer pool has been used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub capacity: usize,
    pub resident: usize,
    pub dirty: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub write_backs: u64,
}

/// Fixed-capacity page cache with LRU eviction.
///
/// Pages live in a slot array allocated once at construction. A slot is
/// either on the free list or mapped to exactly one resident `PageId`.
/// Files are never stored here: every operation that touches disk borrows
/// the `FileCatalog` for the duration of the call.
pub struct BufferPool {
    /// Page storage, one entry per slot
    slots: Vec<Page>,
    /// Slots not holding any page
    free: Vec<SlotId>,
    /// Resident pages mapped to their slot, most recently used first.
    /// Serves as both the page index and the recency list.
    resident: LruCache<PageId, SlotId, ahash::RandomState>,
    /// Resident pages modified since their last write-back
    dirty: AHashSet<PageId>,
    /// Sync the file after every write-back
    sync_on_flush: bool,
    stats: PoolStats,
}

impl BufferPool {
    /// Create a buffer pool with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Create a buffer pool with `capacity` slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer pool capacity must be nonzero");

        Self {
            slots: vec![Page::new(); capacity],
            // Reversed so that slots are handed out in ascending order
            free: (0..capacity).rev().collect(),
            resident: LruCache::unbounded_with_hasher(ahash::RandomState::new()),
            dirty: AHashSet::new(),
            sync_on_flush: false,
            stats: PoolStats {
                capacity,
                ..PoolStats::default()
            },
        }
    }

    /// Sync the owning file after each write-back
    pub fn set_sync_on_flush(&mut self, sync_on_flush: bool) {
        self.sync_on_flush = sync_on_flush;
    }

    /// Get a page, reading it from its file on a miss.
    ///
    /// The page becomes the most recently used one whether or not it was
    /// already resident. When the pool is full the least recently used page
    /// is evicted first and written back if dirty.
    ///
    /// # Errors
    ///
    /// Fails with `FileNotFound` if `pid.file` is not in `files`, before any
    /// page is evicted. Fails with `OrphanedPage` if the eviction victim is
    /// dirty but its file has been removed from `files`; discard that page
    /// to unblock the pool. If the victim's write-back fails it stays
    /// resident and dirty. If the read fails after a completed eviction the
    /// victim stays evicted (already written back) and the slot is freed.
    ///
    /// # Panics
    ///
    /// Panics if the pool has no free slot and no resident page to evict,
    /// which means its bookkeeping is corrupt.
    pub fn fetch(&mut self, files: &mut FileCatalog, pid: &PageId) -> FileResult<&mut Page> {
        if let Some(&slot) = self.resident.get(pid) {
            self.stats.hits += 1;
            trace!("buffer pool hit: {pid} in slot {slot}");
            return Ok(&mut self.slots[slot]);
        }

        if !files.contains(&pid.file) {
            return Err(FileError::FileNotFound(pid.file.clone()));
        }

        self.stats.misses += 1;
        let slot = self.claim_slot(files)?;

        let loaded = files
            .get_mut(&pid.file)
            .and_then(|file| file.read_page(&mut self.slots[slot], pid.page));
        if let Err(err) = loaded {
            self.free.push(slot);
            return Err(err);
        }

        debug!("buffer pool miss: loaded {pid} into slot {slot}");
        self.resident.push(pid.clone(), slot);
        Ok(&mut self.slots[slot])
    }

    /// Mark a resident page as modified. Does nothing if the page is not resident.
    pub fn mark_dirty(&mut self, pid: &PageId) {
        if self.resident.contains(pid) {
            self.dirty.insert(pid.clone());
        }
    }

    pub fn is_dirty(&self, pid: &PageId) -> bool {
        self.dirty.contains(pid)
    }

    /// Check if a page is resident. Does not affect recency.
    pub fn contains(&self, pid: &PageId) -> bool {
        self.resident.contains(pid)
    }

    /// Drop a page from the pool without writing it back, dirty or not
    pub fn discard_page(&mut self, pid: &PageId) {
        if let Some(slot) = self.resident.pop(pid) {
            self.dirty.remove(pid);
            self.free.push(slot);
            debug!("discarded {pid} from slot {slot}");
        }
    }

    /// Drop every resident page of `file` without writing anything back
    pub fn discard_file(&mut self, file: &str) {
        for pid in self.resident_of(file) {
            self.discard_page(&pid);
        }
    }

    /// Write a page back to its file if it is resident and dirty
    pub fn flush_page(&mut self, files: &mut FileCatalog, pid: &PageId) -> FileResult<()> {
        let Some(&slot) = self.resident.peek(pid) else {
            return Ok(());
        };
        if !self.dirty.contains(pid) {
            return Ok(());
        }
        self.write_back(files, pid, slot)
    }

    /// Write back every dirty page belonging to `file`
    pub fn flush_file(&mut self, files: &mut FileCatalog, file: &str) -> FileResult<()> {
        let to_flush: Vec<PageId> = self
            .dirty
            .iter()
            .filter(|pid| pid.file == file)
            .cloned()
            .collect();
        self.flush_each(files, to_flush)
    }

    /// Write back every dirty page in the pool
    pub fn flush_all(&mut self, files: &mut FileCatalog) -> FileResult<()> {
        let to_flush: Vec<PageId> = self.dirty.iter().cloned().collect();
        self.flush_each(files, to_flush)
    }

    /// Try every page even if some writes fail; the first failure is returned
    /// and the failed pages stay dirty.
    fn flush_each(
        &mut self,
        files: &mut FileCatalog,
        mut to_flush: Vec<PageId>,
    ) -> FileResult<()> {
        to_flush.sort();

        let mut first_err = None;
        for pid in &to_flush {
            if let Err(err) = self.flush_page(files, pid) {
                warn!("failed to write back {pid}: {err}");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Number of resident pages
    pub fn len(&self) -> usize {
        self.resident.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resident.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Resident pages with their slot and dirty flag, most recently used first
    pub fn resident_pages(&self) -> Vec<(PageId, SlotId, bool)> {
        self.resident
            .iter()
            .map(|(pid, &slot)| (pid.clone(), slot, self.dirty.contains(pid)))
            .collect()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            resident: self.resident.len(),
            dirty: self.dirty.len(),
            ..self.stats
        }
    }

    fn resident_of(&self, file: &str) -> Vec<PageId> {
        self.resident
            .iter()
            .filter(|(pid, _)| pid.file == file)
            .map(|(pid, _)| pid.clone())
            .collect()
    }

    /// Take a free slot, or evict the least recently used page to make one.
    ///
    /// A dirty victim is written back before it leaves the pool. If that
    /// write fails the victim stays resident and dirty.
    fn claim_slot(&mut self, files: &mut FileCatalog) -> FileResult<SlotId> {
        if let Some(slot) = self.free.pop() {
            return Ok(slot);
        }

        let (victim, slot) = match self.resident.peek_lru() {
            Some((pid, &slot)) => (pid.clone(), slot),
            None => panic!(
                "buffer pool corrupt: no free slot and nothing to evict ({} slots)",
                self.slots.len()
            ),
        };

        if self.dirty.contains(&victim) {
            if !files.contains(&victim.file) {
                warn!("cannot evict {victim}: its file is no longer registered");
                return Err(FileError::OrphanedPage(victim.to_string()));
            }
            if let Err(err) = self.write_back(files, &victim, slot) {
                warn!("failed to write back {victim} during eviction: {err}");
                return Err(err);
            }
        }

        self.resident.pop(&victim);
        self.dirty.remove(&victim);
        self.stats.evictions += 1;
        debug!("evicted {victim} from slot {slot}");

        Ok(slot)
    }

    /// Write a slot to the page's file and clear its dirty flag
    fn write_back(
        &mut self,
        files: &mut FileCatalog,
        pid: &PageId,
        slot: SlotId,
    ) -> FileResult<()> {
        let file = files.get_mut(&pid.file)?;
        file.write_page(&self.slots[slot], pid.page)?;
        if self.sync_on_flush {
            file.sync()?;
        }

        self.dirty.remove(pid);
        self.stats.write_backs += 1;
        debug!("wrote back {pid} from slot {slot}");
        Ok(())
    }

    /// Check that index, recency list, dirty set and free list agree
    #[cfg(test)]
    fn assert_consistent(&self) {
        let mut seen = vec![false; self.slots.len()];
        for &slot in &self.free {
            assert!(!seen[slot], "slot {slot} listed twice");
            seen[slot] = true;
        }
        for (pid, &slot) in self.resident.iter() {
            assert!(!seen[slot], "slot {slot} of {pid} also free or shared");
            seen[slot] = true;
        }
        assert!(seen.iter().all(|&s| s), "a slot is unaccounted for");
        for pid in &self.dirty {
            assert!(self.resident.contains(pid), "{pid} dirty but not resident");
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Without a catalog there is nowhere to write; `Database` flushes before this runs
        if !self.dirty.is_empty() {
            error!(
                "buffer pool dropped with {} dirty pages that were never written back",
                self.dirty.len()
            );
        }
    }
}
