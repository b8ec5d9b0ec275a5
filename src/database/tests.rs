use super::*;
use crate::file::{FileResult, PAGE_SIZE};
use std::cell::Cell;
use std::rc::Rc;
use tempfile::TempDir;

/// In-memory file that counts its writes
struct CountingFile {
    inner: MemFile,
    writes: Rc<Cell<usize>>,
}

impl CountingFile {
    fn new(name: &str, page_count: usize) -> (Self, Rc<Cell<usize>>) {
        let writes = Rc::new(Cell::new(0));
        let file = Self {
            inner: MemFile::new(name, page_count),
            writes: Rc::clone(&writes),
        };
        (file, writes)
    }
}

impl DbFile for CountingFile {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read_page(&mut self, page: &mut Page, index: usize) -> FileResult<()> {
        self.inner.read_page(page, index)
    }

    fn write_page(&mut self, page: &Page, index: usize) -> FileResult<()> {
        self.writes.set(self.writes.get() + 1);
        self.inner.write_page(page, index)
    }

    fn page_count(&self) -> FileResult<usize> {
        self.inner.page_count()
    }
}

fn setup_test_db(capacity: usize) -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let config = PoolConfig {
        data_dir: temp_dir.path().join("pages"),
        capacity,
        sync_on_flush: false,
    };
    let db = Database::open(&config).unwrap();
    (temp_dir, db)
}

fn reopen(temp_dir: &TempDir, capacity: usize) -> Database {
    let config = PoolConfig {
        data_dir: temp_dir.path().join("pages"),
        capacity,
        sync_on_flush: false,
    };
    Database::open(&config).unwrap()
}

#[test]
fn test_open_creates_data_dir() {
    let (temp_dir, db) = setup_test_db(4);
    assert!(temp_dir.path().join("pages").is_dir());
    assert!(db.files().is_empty());
    assert_eq!(db.pool().capacity(), 4);
}

#[test]
fn test_open_rejects_zero_capacity() {
    let temp_dir = TempDir::new().unwrap();
    let config = PoolConfig {
        data_dir: temp_dir.path().to_path_buf(),
        capacity: 0,
        sync_on_flush: false,
    };
    let result = Database::open(&config);
    assert!(matches!(
        result,
        Err(DatabaseError::ConfigError(ConfigError::InvalidCapacity(0)))
    ));
}

#[test]
fn test_create_file_on_disk() {
    let (temp_dir, mut db) = setup_test_db(4);

    db.create_file("users.db", 3).unwrap();
    let path = temp_dir.path().join("pages").join("users.db");
    assert_eq!(fs::metadata(&path).unwrap().len(), (3 * PAGE_SIZE) as u64);
    assert_eq!(db.file("users.db").unwrap().page_count().unwrap(), 3);

    let result = db.create_file("users.db", 1);
    assert!(matches!(
        result,
        Err(DatabaseError::FileError(FileError::FileAlreadyExists(_)))
    ));
}

#[test]
fn test_create_file_rejects_paths() {
    let mut db = Database::in_memory(2);
    for name in ["", ".", "..", "a/b", "a\\b"] {
        let result = db.create_file(name, 1);
        assert!(matches!(result, Err(DatabaseError::InvalidFileName(_))));
    }
}

#[test]
fn test_writes_survive_reopen() {
    let (temp_dir, mut db) = setup_test_db(4);
    db.create_file("t.db", 2).unwrap();

    let pid = PageId::new("t.db", 1);
    db.fetch(&pid).unwrap()[0..4].copy_from_slice(b"page");
    db.mark_dirty(&pid);
    db.close().unwrap();

    let mut db = reopen(&temp_dir, 4);
    assert_eq!(&db.fetch(&pid).unwrap()[0..4], b"page");
    assert!(!db.is_dirty(&pid));
}

#[test]
fn test_drop_flushes_dirty_pages() {
    let (temp_dir, mut db) = setup_test_db(4);
    db.create_file("t.db", 1).unwrap();

    let pid = PageId::new("t.db", 0);
    db.fetch(&pid).unwrap()[0] = 88;
    db.mark_dirty(&pid);
    drop(db);

    let mut db = reopen(&temp_dir, 4);
    assert_eq!(db.fetch(&pid).unwrap()[0], 88);
}

#[test]
fn test_unmarked_changes_are_not_written() {
    let (temp_dir, mut db) = setup_test_db(4);
    db.create_file("t.db", 1).unwrap();

    let pid = PageId::new("t.db", 0);
    db.fetch(&pid).unwrap()[0] = 88;
    drop(db);

    let mut db = reopen(&temp_dir, 4);
    assert_eq!(db.fetch(&pid).unwrap()[0], 0);
}

#[test]
fn test_teardown_writes_each_dirty_page_once() {
    let mut db = Database::in_memory(4);
    let (file, writes) = CountingFile::new("c.db", 4);
    db.add_file(Box::new(file)).unwrap();

    let dirty = PageId::new("c.db", 2);
    db.fetch(&dirty).unwrap()[0] = 1;
    db.mark_dirty(&dirty);
    db.fetch(&PageId::new("c.db", 3)).unwrap();
    assert_eq!(writes.get(), 0);

    drop(db);
    assert_eq!(writes.get(), 1);
}

#[test]
fn test_remove_file_flushes_and_forgets_pages() {
    let mut db = Database::in_memory(4);
    let (file, writes) = CountingFile::new("c.db", 4);
    db.add_file(Box::new(file)).unwrap();
    db.create_file("other.db", 1).unwrap();

    let p0 = PageId::new("c.db", 0);
    let p1 = PageId::new("c.db", 1);
    let other = PageId::new("other.db", 0);
    db.fetch(&p0).unwrap()[0] = 5;
    db.mark_dirty(&p0);
    db.fetch(&p1).unwrap();
    db.fetch(&other).unwrap();
    db.mark_dirty(&other);

    let mut removed = db.remove_file("c.db").unwrap();
    assert_eq!(writes.get(), 1);
    assert!(!db.contains(&p0));
    assert!(!db.contains(&p1));
    assert!(db.is_dirty(&other));
    assert!(!db.files().contains("c.db"));

    // The detached file holds the flushed bytes
    let mut page = Page::new();
    removed.read_page(&mut page, 0).unwrap();
    assert_eq!(page[0], 5);

    // Pages of a detached file can no longer be fetched
    let result = db.fetch(&p0);
    assert!(matches!(
        result,
        Err(DatabaseError::FileError(FileError::FileNotFound(_)))
    ));
}

#[test]
fn test_remove_missing_file() {
    let mut db = Database::in_memory(2);
    let result = db.remove_file("nope");
    assert!(matches!(
        result,
        Err(DatabaseError::FileError(FileError::FileNotFound(_)))
    ));
}

#[test]
fn test_flush_file_through_database() {
    let mut db = Database::in_memory(4);
    let (file_a, writes_a) = CountingFile::new("a.db", 2);
    let (file_b, writes_b) = CountingFile::new("b.db", 2);
    db.add_file(Box::new(file_a)).unwrap();
    db.add_file(Box::new(file_b)).unwrap();

    for pid in [
        PageId::new("a.db", 0),
        PageId::new("a.db", 1),
        PageId::new("b.db", 0),
    ] {
        db.fetch(&pid).unwrap();
        db.mark_dirty(&pid);
    }

    db.flush_file("a.db").unwrap();
    assert_eq!(writes_a.get(), 2);
    assert_eq!(writes_b.get(), 0);

    db.flush_page(&PageId::new("b.db", 0)).unwrap();
    assert_eq!(writes_b.get(), 1);
    assert_eq!(db.pool().dirty_count(), 0);
}

#[test]
fn test_eviction_across_reopen_boundary() {
    let (temp_dir, mut db) = setup_test_db(2);
    db.create_file("t.db", 3).unwrap();

    for i in 0..3 {
        let pid = PageId::new("t.db", i);
        db.fetch(&pid).unwrap()[0] = i as u8 + 10;
        db.mark_dirty(&pid);
    }
    // Page 0 was evicted and written back on the third fetch
    assert!(!db.contains(&PageId::new("t.db", 0)));
    assert_eq!(db.pool().stats().write_backs, 1);

    db.discard_page(&PageId::new("t.db", 2));
    db.close().unwrap();

    let mut db = reopen(&temp_dir, 2);
    assert_eq!(db.fetch(&PageId::new("t.db", 0)).unwrap()[0], 10);
    assert_eq!(db.fetch(&PageId::new("t.db", 1)).unwrap()[0], 11);
    assert_eq!(db.fetch(&PageId::new("t.db", 2)).unwrap()[0], 0);
}

/// File whose writes always fail
struct BrokenFile {
    inner: MemFile,
}

impl DbFile for BrokenFile {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn read_page(&mut self, page: &mut Page, index: usize) -> FileResult<()> {
        self.inner.read_page(page, index)
    }

    fn write_page(&mut self, _page: &Page, _index: usize) -> FileResult<()> {
        Err(std::io::Error::other("disk unwritable").into())
    }

    fn page_count(&self) -> FileResult<usize> {
        self.inner.page_count()
    }
}

fn setup_broken_and_healthy() -> (Database, Rc<Cell<usize>>) {
    let mut db = Database::in_memory(4);
    let broken = BrokenFile {
        inner: MemFile::new("a.db", 2),
    };
    let (healthy, writes) = CountingFile::new("b.db", 2);
    db.add_file(Box::new(broken)).unwrap();
    db.add_file(Box::new(healthy)).unwrap();

    for pid in [PageId::new("a.db", 0), PageId::new("b.db", 0)] {
        db.fetch(&pid).unwrap();
        db.mark_dirty(&pid);
    }
    (db, writes)
}

#[test]
fn test_drop_writes_healthy_files_when_another_fails() {
    let (db, writes) = setup_broken_and_healthy();
    drop(db);
    assert_eq!(writes.get(), 1);
}

#[test]
fn test_close_writes_healthy_files_when_another_fails() {
    let (db, writes) = setup_broken_and_healthy();
    let result = db.close();
    assert!(matches!(result, Err(DatabaseError::FileError(FileError::Io(_)))));
    assert_eq!(writes.get(), 1);
}

#[cfg(target_os = "linux")]
#[test]
fn test_open_skips_non_utf8_file_names() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let (temp_dir, mut db) = setup_test_db(2);
    db.create_file("ok.db", 1).unwrap();
    db.close().unwrap();

    let pages = temp_dir.path().join("pages");
    fs::write(pages.join(OsStr::from_bytes(b"bad\xff.db")), [0u8; 8]).unwrap();
    fs::write(pages.join(OsStr::from_bytes(b"bad\xfe.db")), [0u8; 8]).unwrap();

    let db = reopen(&temp_dir, 2);
    assert_eq!(db.files().names(), vec!["ok.db"]);
}
