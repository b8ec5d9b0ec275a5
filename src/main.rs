use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use pagedb::shell::{self, Command as ShellCommand};
use pagedb::{Database, PageId, PoolConfig};

#[derive(Debug, Parser)]
#[command(name = "pagedb", about = "Inspect and edit page files through a buffer pool")]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the page files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Number of buffer pool slots
    #[arg(long)]
    capacity: Option<usize>,

    /// Keep files in memory instead of on disk
    #[arg(long)]
    in_memory: bool,

    /// More log output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a page file
    Create {
        name: String,
        #[arg(long, default_value_t = 0)]
        pages: usize,
    },
    /// Hex-dump bytes of a page
    Read {
        page: PageId,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 64)]
        len: usize,
    },
    /// Overwrite bytes of a page with the given hex string
    Write {
        page: PageId,
        hex: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Start an interactive shell
    Shell,
}

/// Writes log records to stderr
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn load_config(cli: &Cli) -> Result<PoolConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => PoolConfig::load(path)?,
        None => PoolConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(capacity) = cli.capacity {
        config.capacity = capacity;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    let mut db = if cli.in_memory {
        Database::in_memory(config.capacity)
    } else {
        Database::open(&config)?
    };

    match cli.command {
        Command::Create { name, pages } => {
            db.create_file(&name, pages)?;
            println!("created {name} ({pages} pages)");
        }
        Command::Read { page, offset, len } => {
            let bytes = db.fetch(&page)?;
            let end = offset.saturating_add(len).min(bytes.len());
            let start = offset.min(end);
            println!("{}", shell::hex_dump(&bytes[start..end]));
        }
        Command::Write { page, hex, offset } => {
            let patch = shell::decode_hex(&hex)?;
            let bytes = db.fetch(&page)?;
            let end = offset
                .checked_add(patch.len())
                .filter(|&end| end <= bytes.len())
                .ok_or("write runs past the end of the page")?;
            bytes[offset..end].copy_from_slice(&patch);
            db.mark_dirty(&page);
            println!("wrote {} bytes to {page} at offset {offset}", patch.len());
        }
        Command::Shell => run_shell(&mut db)?,
    }

    db.close()?;
    Ok(())
}

fn run_shell(db: &mut Database) -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = DefaultEditor::new()?;
    println!("pagedb shell, type `help` for commands");

    loop {
        match rl.readline("pagedb> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match ShellCommand::parse(&line) {
                    Ok(None) => continue,
                    Ok(Some(ShellCommand::Quit)) => break,
                    Ok(Some(command)) => match command.execute(db) {
                        Ok(output) => println!("{output}"),
                        Err(err) => eprintln!("error: {err}"),
                    },
                    Err(err) => eprintln!("error: {err}"),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
