//! Line-oriented commands for poking at a database interactively

use prettytable::{Cell, Row, Table};
use thiserror::Error;

use crate::database::{Database, DatabaseError};
use crate::file::{FileError, PAGE_SIZE, PageId};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Database(#[from] DatabaseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<FileError> for ShellError {
    fn from(err: FileError) -> Self {
        ShellError::Database(err.into())
    }
}

pub type ShellResult<T> = Result<T, ShellError>;

pub const HELP: &str = "\
commands:
  open <file> [pages]            create a file with the given number of pages
  files                          list registered files
  fetch <file:page> [len]        fetch a page and dump its first bytes
  write <file:page> <off> <hex>  patch bytes in a page and mark it dirty
  dirty <file:page>              mark a page dirty
  flush <file:page>              write back one page if dirty
  flushfile <file>               write back every dirty page of a file
  flushall                       write back every dirty page
  discard <file:page>            drop a page without writing it back
  detach <file>                  flush and unregister a file
  pages                          list resident pages, most recent first
  stats                          buffer pool counters as JSON
  help                           show this text
  quit                           leave the shell";

/// A parsed shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open { file: String, pages: usize },
    Files,
    Fetch { pid: PageId, len: usize },
    Write { pid: PageId, offset: usize, bytes: Vec<u8> },
    Dirty(PageId),
    Flush(PageId),
    FlushFile(String),
    FlushAll,
    Discard(PageId),
    Detach(String),
    Pages,
    Stats,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> ShellResult<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let command = match (name.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("open", [file]) => Command::Open {
                file: file.to_string(),
                pages: 0,
            },
            ("open", [file, pages]) => Command::Open {
                file: file.to_string(),
                pages: parse_number(pages)?,
            },
            ("files", []) => Command::Files,
            ("fetch", [pid]) => Command::Fetch {
                pid: pid.parse()?,
                len: 16,
            },
            ("fetch", [pid, len]) => Command::Fetch {
                pid: pid.parse()?,
                len: parse_number(len)?,
            },
            ("write", [pid, offset, hex]) => {
                let offset = parse_number(offset)?;
                let bytes = decode_hex(hex)?;
                let fits = offset
                    .checked_add(bytes.len())
                    .is_some_and(|end| end <= PAGE_SIZE);
                if !fits {
                    return Err(ShellError::Parse(format!(
                        "{} bytes at offset {offset} overrun the {PAGE_SIZE}-byte page",
                        bytes.len()
                    )));
                }
                Command::Write {
                    pid: pid.parse()?,
                    offset,
                    bytes,
                }
            }
            ("dirty", [pid]) => Command::Dirty(pid.parse()?),
            ("flush", [pid]) => Command::Flush(pid.parse()?),
            ("flushfile", [file]) => Command::FlushFile(file.to_string()),
            ("flushall", []) => Command::FlushAll,
            ("discard", [pid]) => Command::Discard(pid.parse()?),
            ("detach", [file]) => Command::Detach(file.to_string()),
            ("pages", []) => Command::Pages,
            ("stats", []) => Command::Stats,
            ("help", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => {
                return Err(ShellError::Parse(format!(
                    "unknown command or wrong arguments: {}",
                    line.trim()
                )));
            }
        };
        Ok(Some(command))
    }

    /// Run the command against `db` and return what to print
    pub fn execute(&self, db: &mut Database) -> ShellResult<String> {
        let output = match self {
            Command::Open { file, pages } => {
                db.create_file(file, *pages)?;
                format!("created {file} ({pages} pages)")
            }
            Command::Files => db.files().names().join("\n"),
            Command::Fetch { pid, len } => {
                let page = db.fetch(pid)?;
                hex_dump(&page[..(*len).min(PAGE_SIZE)])
            }
            Command::Write { pid, offset, bytes } => {
                let page = db.fetch(pid)?;
                let target = offset
                    .checked_add(bytes.len())
                    .and_then(|end| page.get_mut(*offset..end))
                    .ok_or_else(|| {
                        ShellError::Parse(format!("write at offset {offset} overruns the page"))
                    })?;
                target.copy_from_slice(bytes);
                db.mark_dirty(pid);
                format!("wrote {} bytes to {pid} at offset {offset}", bytes.len())
            }
            Command::Dirty(pid) => {
                db.mark_dirty(pid);
                if db.is_dirty(pid) {
                    format!("{pid} marked dirty")
                } else {
                    format!("{pid} is not resident")
                }
            }
            Command::Flush(pid) => {
                db.flush_page(pid)?;
                format!("flushed {pid}")
            }
            Command::FlushFile(file) => {
                db.flush_file(file)?;
                format!("flushed {file}")
            }
            Command::FlushAll => {
                db.flush_all()?;
                "flushed all dirty pages".to_string()
            }
            Command::Discard(pid) => {
                db.discard_page(pid);
                format!("discarded {pid}")
            }
            Command::Detach(file) => {
                db.remove_file(file)?;
                format!("detached {file}")
            }
            Command::Pages => render_pages(db),
            Command::Stats => serde_json::to_string_pretty(&db.pool().stats())?,
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        };
        Ok(output)
    }
}

fn parse_number(s: &str) -> ShellResult<usize> {
    s.parse()
        .map_err(|_| ShellError::Parse(format!("not a number: {s}")))
}

/// Decode a string of hex digit pairs, e.g. `deadBEEF`
pub fn decode_hex(s: &str) -> ShellResult<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 || !s.is_ascii() {
        return Err(ShellError::Parse(format!("bad hex string: {s}")));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| ShellError::Parse(format!("bad hex string: {s}")))
        })
        .collect()
}

/// Sixteen bytes per line, prefixed with the offset
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            format!("{:04x}: {}", i * 16, hex.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_pages(db: &Database) -> String {
    let pages = db.pool().resident_pages();
    if pages.is_empty() {
        return "no resident pages".to_string();
    }

    let mut table = Table::new();
    table.set_titles(Row::new(vec![
        Cell::new("page"),
        Cell::new("slot"),
        Cell::new("dirty"),
    ]));
    for (pid, slot, dirty) in pages {
        table.add_row(Row::new(vec![
            Cell::new(&pid.to_string()),
            Cell::new(&slot.to_string()),
            Cell::new(if dirty { "yes" } else { "" }),
        ]));
    }
    table.to_string()
}
