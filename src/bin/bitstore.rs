//! bitstore CLI
//!
//! Inspect and maintain store files: read bits, set/clear bits, compact,
//! and back up or restore through tar archives.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use bitstore::storage::{self, archive};
use bitstore::{Config, PagedStorage, Position, StorageBackend, StorageKind};
use tracing_subscriber::{fmt, EnvFilter};

/// bitstore CLI
#[derive(Parser, Debug)]
#[command(name = "bitstore")]
#[command(about = "Inspect and maintain bitmap store files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every subcommand
#[derive(ClapArgs, Debug)]
struct StoreArgs {
    /// Store file (or page base path with --paged)
    path: PathBuf,

    /// Treat the path as the base of a paged store
    #[arg(short, long)]
    paged: bool,

    /// Shard number, for absolute column ids
    #[arg(short, long, default_value = "0")]
    slice: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print bit count and highest bit
    Stat {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Set a bit
    Set {
        #[command(flatten)]
        store: StoreArgs,
        row: u64,
        column: u64,
    },

    /// Clear a bit
    Clear {
        #[command(flatten)]
        store: StoreArgs,
        row: u64,
        column: u64,
    },

    /// Print every set bit as "row,column"
    Dump {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Rewrite the store (every page, when paged) as a fresh snapshot
    Compact {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Write the store to a tar archive
    Export {
        #[command(flatten)]
        store: StoreArgs,
        archive: PathBuf,
    },

    /// Replace the store's contents from a tar archive
    Import {
        #[command(flatten)]
        store: StoreArgs,
        archive: PathBuf,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bitstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn config(store: &StoreArgs) -> Config {
    let kind = if store.paged {
        StorageKind::Paged
    } else {
        StorageKind::File
    };
    Config::builder().kind(kind).slice(store.slice).build()
}

fn open(store: &StoreArgs) -> bitstore::Result<Box<dyn StorageBackend>> {
    let config = config(store);
    tracing::debug!("opening {} ({:?})", store.path.display(), config.kind);
    storage::open(&store.path, &config)
}

fn run(command: Commands) -> bitstore::Result<()> {
    match command {
        Commands::Stat { store } => {
            let mut backend = open(&store)?;
            let mut bits = 0u64;
            backend.for_each_bit(&mut |_, _| {
                bits += 1;
                Ok(())
            })?;
            let max = backend.max()?;
            println!("path: {}", backend.path().display());
            println!("bits: {}", bits);
            match max {
                Some(max) => println!("max:  {}", max),
                None => println!("max:  (empty)"),
            }
            backend.close()
        }
        Commands::Set { store, row, column } => {
            let mut backend = open(&store)?;
            let changed = backend.add(Position::new(row, column))?;
            println!("{}", if changed { "set" } else { "unchanged" });
            backend.close()
        }
        Commands::Clear { store, row, column } => {
            let mut backend = open(&store)?;
            let changed = backend.remove(Position::new(row, column))?;
            println!("{}", if changed { "cleared" } else { "unchanged" });
            backend.close()
        }
        Commands::Dump { store } => {
            let mut backend = open(&store)?;
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            backend.for_each_bit(&mut |row, column| {
                writeln!(out, "{},{}", row, column)?;
                Ok(())
            })?;
            out.flush()?;
            backend.close()
        }
        Commands::Compact { store } if store.paged => {
            // Flush alone only covers the (empty) hot set of a fresh store
            let mut paged = PagedStorage::new(&store.path, &config(&store));
            paged.open()?;
            let pages = paged.flush_all()?;
            println!("compacted {} pages", pages);
            paged.close()
        }
        Commands::Compact { store } => {
            let mut backend = open(&store)?;
            backend.flush()?;
            backend.close()
        }
        Commands::Export { store, archive: target } => {
            let mut backend = open(&store)?;
            let mut out = BufWriter::new(File::create(&target)?);
            archive::export(backend.as_mut(), &mut out)?;
            out.flush()?;
            backend.close()
        }
        Commands::Import { store, archive: source } => {
            let mut backend = open(&store)?;
            let mut input = BufReader::new(File::open(&source)?);
            let restored = archive::restore(backend.as_mut(), &mut input)?;
            println!("restored {} entries", restored);
            backend.close()
        }
    }
}
