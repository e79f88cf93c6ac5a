//! fdb: CLI for loading FAA radar track files into a flight database.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::DateTime;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use flate2::read::GzDecoder;
use log::{error, info};

use fdb_core::config::{self, Config};
use fdb_core::{Acceptance, FdbError, IngestContext, IngestStats, Ingestor};

mod db;
mod summary;

use db::FlightStore;
use summary::Summary;

#[derive(Parser)]
#[command(name = "fdb", version, about = "FAA radar track ingestion and flight database")]
struct Cli {
    /// Config file (defaults to ~/.fdb/config.yaml)
    #[arg(long, global = true, env = "FDB_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest track files into the flight store
    Ingest {
        /// Track files (`-` for stdin, `.gz` is decompressed)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// SQLite database path (overrides config)
        #[arg(long)]
        db_path: Option<String>,

        /// Parse and assemble, but store nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Report airport, carrier and track statistics for track files
    Summary {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show flight store statistics
    Stats {
        /// SQLite database path (overrides config)
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    match cli.command {
        Commands::Ingest {
            files,
            db_path,
            dry_run,
        } => {
            let db_path = db_path.unwrap_or_else(|| config.database.path.clone());
            cmd_ingest(&config, &files, &db_path, dry_run)
        }
        Commands::Summary { files } => cmd_summary(&config, &files),
        Commands::Stats { db_path } => {
            cmd_stats(&db_path.unwrap_or_else(|| config.database.path.clone()))
        }
        Commands::InitConfig { force } => cmd_init_config(cli.config.as_deref(), force),
    }
}

/// Open an input file; `-` is stdin, `*.gz` is gunzipped.
fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    if path.to_str() == Some("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)?;
    if path.extension().is_some_and(|e| e == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn input_name(path: &Path) -> String {
    match path.file_name() {
        Some(n) if path.to_str() != Some("-") => n.to_string_lossy().into_owned(),
        _ => "stdin".to_string(),
    }
}

fn open_or_exit(path: &Path) -> Box<dyn Read> {
    open_input(path).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", path.display());
        std::process::exit(1);
    })
}

fn cmd_ingest(config: &Config, files: &[PathBuf], db_path: &str, dry_run: bool) {
    let mut store = if dry_run {
        None
    } else {
        Some(FlightStore::open(db_path).unwrap_or_else(|e| {
            eprintln!("Error opening database {db_path}: {e}");
            std::process::exit(1);
        }))
    };

    let ingestor = Ingestor::new(config.source.clone());
    let mut ctx = IngestContext::new();
    let mut runs: Vec<(String, IngestStats)> = Vec::new();

    for (i, file) in files.iter().enumerate() {
        let name = input_name(file);
        println!("[{}/{}] loading {}", i + 1, files.len(), file.display());

        let reader = open_or_exit(file);
        let before = ctx.stats;
        let mark = ctx.summary.len();

        let result = ingestor.ingest(&mut ctx, &name, reader, |flight| {
            let Some(store) = store.as_mut() else {
                return Ok(Acceptance::reject(""));
            };
            if store.find_flight(&flight)?.is_some() {
                return Ok(Acceptance::reject(format!(
                    "already exists: {}",
                    flight.ident_string()
                )));
            }
            let id = store.save_flight(&flight)?;
            Ok(Acceptance::accept(format!(
                "saved: {} (id {id})",
                flight.ident_string()
            )))
        });

        print!("{}", &ctx.summary[mark..]);
        runs.push((name.clone(), stats_delta(&before, &ctx.stats)));

        if let Err(e) = result {
            error!("{name}: {e}");
            eprintln!("Ingest of {} failed: {e}", file.display());
            print_run_table(&runs);
            std::process::exit(1);
        }
    }

    print_run_table(&runs);
    if let Some(store) = &store {
        print_store_stats(store, db_path);
    }
}

fn stats_delta(before: &IngestStats, after: &IngestStats) -> IngestStats {
    IngestStats {
        rows_read: after.rows_read - before.rows_read,
        flights_proposed: after.flights_proposed - before.flights_proposed,
        flights_accepted: after.flights_accepted - before.flights_accepted,
        degraded_fields: after.degraded_fields - before.degraded_fields,
    }
}

fn print_run_table(runs: &[(String, IngestStats)]) {
    if runs.is_empty() {
        return;
    }
    println!();
    let mut table = Table::new();
    table.set_header(vec!["File", "Rows", "Proposed", "Accepted", "Degraded"]);
    for (name, s) in runs {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(s.rows_read),
            Cell::new(s.flights_proposed),
            Cell::new(s.flights_accepted),
            Cell::new(s.degraded_fields),
        ]);
    }
    println!("{table}");
}

fn cmd_summary(config: &Config, files: &[PathBuf]) {
    let ingestor = Ingestor::new(config.source.clone());
    let mut ctx = IngestContext::new();
    let mut summary = Summary::new();

    for (i, file) in files.iter().enumerate() {
        println!("[{}/{}] loading {}", i + 1, files.len(), file.display());
        let reader = open_or_exit(file);
        let key = config.source.key.as_str();

        let result = ingestor.ingest(&mut ctx, &input_name(file), reader, |flight| {
            summary.add(&flight, key);
            Ok(Acceptance::reject(""))
        });
        if let Err(e) = result {
            eprintln!("Error reading {}: {e}", file.display());
            std::process::exit(1);
        }
    }

    info!(
        "{} rows, {} flights from {} files",
        ctx.stats.rows_read,
        ctx.stats.flights_proposed,
        files.len()
    );
    println!();
    print!("{}", summary.render());
}

fn cmd_stats(db_path: &str) {
    let store = FlightStore::open(db_path).unwrap_or_else(|e| {
        eprintln!("Error opening database {db_path}: {e}");
        std::process::exit(1);
    });
    print_store_stats(&store, db_path);
}

fn print_store_stats(store: &FlightStore, db_path: &str) {
    let stats = match store.stats() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading database {db_path}: {e}");
            std::process::exit(1);
        }
    };
    let fmt_time = |t: Option<i64>| {
        t.and_then(|s| DateTime::from_timestamp(s, 0))
            .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "-".into())
    };

    println!();
    println!("Database: {db_path}");
    println!();
    println!("  Flights:     {}", stats.flights);
    println!("  Trackpoints: {}", stats.trackpoints);
    println!("  Earliest:    {}", fmt_time(stats.earliest));
    println!("  Latest:      {}", fmt_time(stats.latest));
    println!();
}

fn cmd_init_config(path: Option<&Path>, force: bool) {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config::config_file);
    if path.exists() && !force {
        eprintln!("{} already exists (use --force to overwrite)", path.display());
        std::process::exit(1);
    }
    if let Err(e) = config::save_config_to(&Config::default(), &path) {
        report_fatal(&e);
    }
    println!("Wrote {}", path.display());
}

fn report_fatal(e: &FdbError) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1);
}
