//! romdex - identify known game images by content hash.
//!
//! Usage:
//!   romdex games <PATH>      Identify games below PATH, write JSONL results
//!   romdex folders <PATH>    Rebuild the folder tree used for browsing
//!   romdex --help            Show help

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use romdex_core::EngineConfig;
use romdex_scan::{JsonlSink, RecordSink, ScanService, games_output_path};

#[derive(Parser)]
#[command(
    name = "romdex",
    version,
    about = "Identify known game images in ROM folders and zip archives",
    long_about = "romdex screens every recognized ROM file and zip member against the \
                  size and CRC filters of a databank, hashes the survivors and reports \
                  the games it finds."
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Databank to read instead of the configured one
    #[arg(long, global = true)]
    databank: Option<PathBuf>,

    /// Root of the data volume (overrides the configuration)
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify games below a folder
    Games {
        /// Folder to scan
        path: PathBuf,

        /// Results file (defaults to the mirrored path below the games cache)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every identified game
        #[arg(short, long)]
        print: bool,

        /// Additional extensions to treat as game images
        #[arg(short, long = "ext", value_delimiter = ',')]
        extensions: Vec<String>,
    },

    /// Build the folder tree below a folder
    Folders {
        /// Folder to scan
        path: PathBuf,

        /// Only list immediate sub-folders
        #[arg(long)]
        flat: bool,

        /// Output file (defaults to the configured folders database)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .wrap_err_with(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(root) = cli.data_root {
        config.data_root = root;
    }
    if let Some(databank) = cli.databank {
        config.databank_path = Some(databank);
    }

    match cli.command {
        Command::Games {
            path,
            output,
            print,
            extensions,
        } => {
            config.extra_extensions.extend(extensions);
            run_games(config, &path, output, print).await?;
        }
        Command::Folders { path, flat, output } => {
            run_folders(config, &path, !flat, output).await?;
        }
    }

    Ok(())
}

/// Stream a games scan into its results file and print a summary.
async fn run_games(
    config: EngineConfig,
    path: &Path,
    output: Option<PathBuf>,
    print: bool,
) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;
    let output = output.unwrap_or_else(|| games_output_path(&config.games_db_dir(), &path));
    let service = ScanService::new(config).context("Invalid configuration")?;

    eprintln!("Scanning {}...", path.display());

    let mut sink = JsonlSink::create(&output).context("Failed to create results file")?;
    let mut stream = service.scan_games(&path);
    while let Some(record) = stream.recv().await {
        if print && record.is_match() {
            println!(
                "{}/{}  {} [{}]",
                record.folder.trim_end_matches('/'),
                record.file,
                record.name,
                record.code
            );
        }
        sink.emit(record).context("Failed to write results")?;
    }
    let written = sink.written();
    let output = sink.finish().context("Failed to write results")?;
    let summary = stream.finish().await.context("Games scan failed")?;

    println!();
    println!("{}", "─".repeat(60));
    println!(" {}", path.display());
    println!(
        " {} candidates, {} identified, {} records written",
        summary.candidates, summary.matches, written
    );
    println!(
        " {} hashed in {} files, {} archives opened",
        format_size(summary.bytes_hashed),
        summary.digests_computed,
        summary.archives_opened
    );
    println!(
        " {} rejected by size, {} rejected by CRC",
        summary.size_rejected, summary.crc_rejected
    );
    println!(" Scanned in {:.2}s", summary.elapsed.as_secs_f64());
    println!(" Results: {}", output.display());
    println!("{}", "─".repeat(60));

    Ok(())
}

/// Build the folder tree and store it as JSON.
async fn run_folders(
    config: EngineConfig,
    path: &Path,
    recursive: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;
    let output = output.unwrap_or_else(|| config.folders_db_path());
    let service = ScanService::new(config).context("Invalid configuration")?;

    let tree = service
        .scan_folders(&path, recursive)
        .await
        .context("Folder scan failed")?;

    let json = serde_json::to_vec(&tree)?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&output, &json).wrap_err_with(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} folders below {} ({}) written to {}",
        tree.descendant_count(),
        path.display(),
        format_size(json.len() as u64),
        output.display()
    );

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("romdex=debug,warn")
        } else {
            EnvFilter::new("romdex=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
