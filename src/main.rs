//! bucket CLI - Command line interface for filebucket
//!
//! Upload, list, download and delete files kept in a filebucket store.

use anyhow::Context;
use chrono::{DateTime, Duration, Local, Utc};
use clap::{Parser, Subcommand};
use filebucket::{Config, FileManager, FileRecord};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bucket")]
#[command(about = "Store files under logical names in a catalogued blob bucket")]
#[command(version)]
struct Cli {
    /// Storage root directory (overrides the config file)
    #[arg(short, long, env = "FILEBUCKET_ROOT")]
    root: Option<PathBuf>,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Upload {
        /// Local file to upload
        path: PathBuf,
        /// Name to store it under (defaults to the file's basename)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Download a file by name
    Download {
        /// The stored file name
        filename: String,
        /// Write to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a file by name
    Delete {
        /// The stored file name
        filename: String,
    },

    /// Check whether a file is stored
    Exists {
        /// The stored file name
        filename: String,
    },

    /// List files by upload time
    List {
        /// Earliest upload time, inclusive (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Latest upload time, exclusive (RFC 3339, defaults to now)
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        /// Look back this many hours when --since is not given
        #[arg(long, default_value = "24")]
        hours: i64,
    },

    /// Show storage locations and counts
    Status,

    /// Interactive upload, list and download round trip
    Smoke,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(root) = cli.root.clone() {
        config.root = root;
    }
    let fm = FileManager::open(&config)
        .with_context(|| format!("Failed to open storage at {}", config.root.display()))?;

    match cli.command {
        Commands::Upload { path, name } => {
            let record = fm.upload_file(&path, name.as_deref())?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "id": record.id.to_hex(),
                    "filename": record.filename,
                    "size": record.file_size,
                    "upload_time": record.upload_time
                }),
            )?;
        }

        Commands::Download { filename, output: out } => {
            let bytes = fm.download_file(&filename)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "status": "ok",
                            "filename": filename,
                            "size": bytes.len(),
                            "output": path.display().to_string()
                        }),
                    )?;
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
            }
        }

        Commands::Delete { filename } => {
            let deleted = fm.delete_file(&filename)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "filename": filename,
                    "deleted": deleted
                }),
            )?;
        }

        Commands::Exists { filename } => {
            let exists = fm.exists(&filename)?;
            output(
                &cli.format,
                &serde_json::json!({
                    "filename": filename,
                    "exists": exists
                }),
            )?;
        }

        Commands::List {
            since,
            until,
            hours,
        } => {
            let begin = match since {
                Some(since) => since,
                None => Duration::try_hours(hours)
                    .and_then(|back| Utc::now().checked_sub_signed(back))
                    .ok_or_else(|| anyhow::anyhow!("--hours out of range: {}", hours))?,
            };
            let files = fm.list_files(begin, until)?;
            let items: Vec<_> = files.iter().map(record_json).collect();
            output(
                &cli.format,
                &serde_json::json!({
                    "since": begin,
                    "count": items.len(),
                    "files": items
                }),
            )?;
        }

        Commands::Status => {
            output(
                &cli.format,
                &serde_json::json!({
                    "root": config.root.display().to_string(),
                    "catalog": config.catalog_path().display().to_string(),
                    "blobs": config.bucket_path().display().to_string(),
                    "files": fm.count()?,
                    "objects": fm.blobs().object_count()
                }),
            )?;
        }

        Commands::Smoke => smoke(&fm)?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn record_json(record: &FileRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id.to_hex(),
        "filename": record.filename,
        "size": record.file_size,
        "upload_time": record.upload_time
    })
}

/// Prompt for a file, upload it, list the last day's uploads and download it back
fn smoke(fm: &FileManager) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    let path = prompt(&mut input, "File to upload:")?;
    if let Err(e) = fm.upload_file(&path, None) {
        println!("Upload skipped: {}", e);
    }

    let begin = Utc::now() - Duration::days(1);
    println!(
        "Files in bucket (uploaded after {}):",
        begin.with_timezone(&Local)
    );
    for info in fm.list_files(begin, None)? {
        println!(
            "filename:{}, time:{}",
            info.filename,
            info.upload_time.with_timezone(&Local)
        );
    }

    let filename = Path::new(path.trim_matches('"'))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    prompt(
        &mut input,
        &format!("Hit <ENTER> to download file '{}'", filename),
    )?;

    let bytes = fm.download_file(&filename)?;
    println!("File downloaded, size = {}bytes", bytes.len());
    Ok(())
}

fn prompt(input: &mut impl BufRead, message: &str) -> anyhow::Result<String> {
    print!("{}", message);
    std::io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn output(format: &OutputFormat, value: &serde_json::Value) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
