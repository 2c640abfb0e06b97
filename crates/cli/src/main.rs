//! # storypack - archive build & query CLI
//!
//! Operator front end for the indexed binary text archive: bulk-build an
//! archive from a TSV snippet dump, then point-query or inspect it.
//!
//! ## Commands
//!
//! ```text
//! build INPUT              Build the archive from a TSV file
//! get LANG TEXT_ID [SRC]   Look up one snippet (optional TEXT/AUDIO filter)
//! stat                     Print header fields and region sizes
//! verify                   Walk the index and check structural invariants
//! shell                    Interactive query REPL on stdin
//! ```
//!
//! Build input is one record per line: `language<TAB>text_id<TAB>source<TAB>content`.
//! Lines starting with `#` and blank lines are skipped; tabs after the third
//! separator belong to the content.
//!
//! ## Configuration
//!
//! The archive path is resolved in order: `--archive` flag, then the
//! `STORYPACK_ARCHIVE` environment variable, then `stories.bin`. Set
//! `RUST_LOG` (e.g. `RUST_LOG=debug`) to surface write/open events.
//!
//! ## Example
//!
//! ```text
//! $ storypack build snippets.tsv
//! built stories.bin (8 records, 141 content bytes)
//! $ storypack get en 0
//! Hello, world!
//! $ storypack shell
//! storypack shell on stories.bin (8 records)
//! Commands: GET language text_id [source] | STATS | VERIFY | EXIT
//! > GET ja 6
//! こんにちは、世界！
//! > EXIT
//! bye
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use archive::{ArchiveError, ArchiveReader, ArchiveWriter};
use clap::{Parser, Subcommand};
use record::{ParseSourceError, Record, RecordSet, Source};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "storypack", version, about = "Build and query indexed binary text archives")]
struct Cli {
    /// Archive path (default: $STORYPACK_ARCHIVE, then "stories.bin")
    #[arg(long, global = true)]
    archive: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build the archive from a TSV file (language, text_id, source, content)
    Build {
        /// Input path; `#` lines and blank lines are skipped
        input: PathBuf,
    },
    /// Look up one snippet by key
    Get {
        language: String,
        text_id: String,
        /// Optional source filter: TEXT or AUDIO
        source: Option<String>,
    },
    /// Print header fields and region sizes
    Stat,
    /// Walk the index and check structural invariants
    Verify,
    /// Interactive query shell on stdin
    Shell,
}

/// Reads a configuration value from the environment, with a fallback.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn archive_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| PathBuf::from(env_or("STORYPACK_ARCHIVE", "stories.bin")))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let path = archive_path(cli.archive);

    match cli.cmd {
        Cmd::Build { input } => build(&input, &path),
        Cmd::Get {
            language,
            text_id,
            source,
        } => get(&path, &language, &text_id, source.as_deref()),
        Cmd::Stat => stat(&path),
        Cmd::Verify => verify(&path),
        Cmd::Shell => shell(&path),
    }
}

fn open_reader(path: &Path) -> Result<ArchiveReader<BufReader<File>>> {
    ArchiveReader::open(path).with_context(|| format!("opening archive {}", path.display()))
}

fn parse_source(arg: Option<&str>) -> Result<Option<Source>, ParseSourceError> {
    arg.map(Source::from_str).transpose()
}

fn build(input: &Path, out: &Path) -> Result<()> {
    let set = load_tsv(input)?;
    ArchiveWriter::write_set_to_path(out, &set)
        .with_context(|| format!("writing archive {}", out.display()))?;
    println!(
        "built {} ({} records, {} content bytes)",
        out.display(),
        set.len(),
        set.content_bytes()
    );
    Ok(())
}

fn load_tsv(path: &Path) -> Result<RecordSet> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut set = RecordSet::new();

    for (lineno, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Only the first three tabs separate; the content keeps the rest.
        let mut parts = line.splitn(4, '\t');
        let (Some(language), Some(text_id), Some(source), Some(content)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            bail!(
                "{}:{}: expected 4 tab-separated fields (language, text_id, source, content)",
                path.display(),
                lineno + 1
            );
        };
        let source = Source::from_str(source)
            .map_err(|e| anyhow::anyhow!("{}:{}: {e}", path.display(), lineno + 1))?;

        if let Some(prev) = set.insert(Record::new(language, text_id, source, content)) {
            bail!(
                "{}:{}: duplicate key ({}, {})",
                path.display(),
                lineno + 1,
                prev.language,
                prev.text_id
            );
        }
    }
    Ok(set)
}

fn get(path: &Path, language: &str, text_id: &str, source: Option<&str>) -> Result<()> {
    let source = parse_source(source)?;
    let reader = open_reader(path)?;
    let content = reader.lookup(language, text_id, source)?;
    println!("{content}");
    Ok(())
}

fn stat(path: &Path) -> Result<()> {
    let reader = open_reader(path)?;
    let header = reader.header();
    println!("archive:     {}", path.display());
    println!("records:     {}", header.record_count);
    println!("index bytes: {}", header.index_len);
    println!("data offset: {}", header.data_offset);
    println!("data bytes:  {}", reader.data_size());
    Ok(())
}

fn verify(path: &Path) -> Result<()> {
    let reader = open_reader(path)?;
    reader
        .verify()
        .with_context(|| format!("verifying {}", path.display()))?;
    println!("ok: {} records checked", reader.len());
    Ok(())
}

fn shell(path: &Path) -> Result<()> {
    let reader = open_reader(path)?;

    println!(
        "storypack shell on {} ({} records)",
        path.display(),
        reader.len()
    );
    println!("Commands: GET language text_id [source] | STATS | VERIFY | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "GET" => match (parts.next(), parts.next()) {
                    (Some(language), Some(text_id)) => match parse_source(parts.next()) {
                        Ok(source) => match reader.lookup(language, text_id, source) {
                            Ok(content) => println!("{content}"),
                            Err(ArchiveError::NotFound { .. }) => println!("(not found)"),
                            Err(e) => println!("ERR {e}"),
                        },
                        Err(e) => println!("ERR {e}"),
                    },
                    _ => println!("ERR usage: GET language text_id [source]"),
                },
                "STATS" => {
                    let header = reader.header();
                    println!(
                        "records={} index_len={} data_offset={} data_bytes={}",
                        header.record_count,
                        header.index_len,
                        header.data_offset,
                        reader.data_size()
                    );
                }
                "VERIFY" => match reader.verify() {
                    Ok(()) => println!("ok"),
                    Err(e) => println!("ERR {e}"),
                },
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
