//! REM Index CLI
//!
//! Command-line interface for populating and querying index directories.

use anyhow::Context;
use clap::{Parser, Subcommand};
use percolate_index::{IndexProvider, IndexValue, PropertyUpdate, ProviderConfig, UpdateRecord};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// REM Index CLI - exact-value secondary indexes
#[derive(Parser)]
#[command(name = "rem-index")]
#[command(about = "Populate and query RocksDB-backed property indexes", long_about = None)]
#[command(version)]
struct Cli {
    /// Index root directory (defaults to ~/.p8/indexes)
    #[arg(long, env = "P8_INDEX_DIR")]
    root: Option<PathBuf>,

    /// JSON config file (root_dir and storage options), takes precedence over --root
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty index, discarding existing entries
    Init {
        /// Index id
        id: u64,
    },

    /// Apply property updates (JSONL, one update per line)
    Apply {
        /// Index id
        id: u64,

        /// Updates file (stdin when omitted)
        file: Option<PathBuf>,

        /// Replay after a crash
        #[arg(long)]
        recover: bool,
    },

    /// Signal end of population
    Complete {
        /// Index id
        id: u64,

        /// Population failed; index stays populating
        #[arg(long)]
        failed: bool,
    },

    /// Look up entity ids for a value
    Lookup {
        /// Index id
        id: u64,

        /// JSON scalar, e.g. '"x"' or 42
        value: String,
    },

    /// Show index state and entry count
    State {
        /// Index id
        id: u64,
    },

    /// List index directories
    List,

    /// Dump every entry of an index
    Dump {
        /// Index id
        id: u64,
    },

    /// Drop an index and release its directory
    Drop {
        /// Index id
        id: u64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.root, cli.config.as_deref())?;
    let provider = IndexProvider::new(config)?;

    let result = match cli.command {
        Commands::Init { id } => cmd_init(&provider, id),
        Commands::Apply { id, file, recover } => cmd_apply(&provider, id, file.as_deref(), recover),
        Commands::Complete { id, failed } => cmd_complete(&provider, id, failed),
        Commands::Lookup { id, value } => cmd_lookup(&provider, id, &value),
        Commands::State { id } => cmd_state(&provider, id),
        Commands::List => cmd_list(&provider),
        Commands::Dump { id } => cmd_dump(&provider, id),
        Commands::Drop { id } => cmd_drop(&provider, id),
    };

    finish(result, provider.shutdown())
}

/// The command's own error wins over a shutdown error, which is then logged.
fn finish(
    result: anyhow::Result<()>,
    shutdown: percolate_index::Result<()>,
) -> anyhow::Result<()> {
    match (result, shutdown) {
        (Err(e), Err(shutdown_err)) => {
            warn!(error = %shutdown_err, "Shutdown failed after command error");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), shutdown) => Ok(shutdown?),
    }
}

fn load_config(root: Option<PathBuf>, config: Option<&Path>) -> anyhow::Result<ProviderConfig> {
    if let Some(path) = config {
        return Ok(ProviderConfig::load(path)?);
    }
    match root {
        Some(root) => Ok(ProviderConfig::new(root)),
        None => Ok(ProviderConfig::from_env()?),
    }
}

fn cmd_init(provider: &IndexProvider, id: u64) -> anyhow::Result<()> {
    let populator = provider.get_populator(id)?;
    let removed = populator.initialize_empty()?;

    println!("✓ Index {} initialized", id);
    println!("  Path: {}", populator.path().display());
    println!("  Removed entries: {}", removed);
    Ok(())
}

fn cmd_apply(
    provider: &IndexProvider,
    id: u64,
    file: Option<&Path>,
    recover: bool,
) -> anyhow::Result<()> {
    let reader: Box<dyn BufRead> = match file {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Cannot open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let updates = read_updates(reader)?;
    let populator = provider.get_populator(id)?;
    let applied = if recover {
        populator.recover(&updates)?
    } else {
        populator.apply_updates(&updates)?
    };

    println!("✓ Applied {} updates to index {}", applied, id);
    Ok(())
}

fn read_updates(reader: impl BufRead) -> anyhow::Result<Vec<PropertyUpdate>> {
    let mut updates = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: UpdateRecord = serde_json::from_str(&line)
            .with_context(|| format!("Invalid update on line {}", number + 1))?;
        updates.push(
            PropertyUpdate::try_from(record)
                .with_context(|| format!("Invalid update on line {}", number + 1))?,
        );
    }
    Ok(updates)
}

fn cmd_complete(provider: &IndexProvider, id: u64, failed: bool) -> anyhow::Result<()> {
    let state = provider.get_populator(id)?.complete_population(!failed)?;
    println!("✓ Index {} is {}", id, state);
    Ok(())
}

fn cmd_lookup(provider: &IndexProvider, id: u64, value: &str) -> anyhow::Result<()> {
    let json: serde_json::Value =
        serde_json::from_str(value).context("Lookup value must be a JSON scalar")?;
    let value = IndexValue::try_from(json)?;

    let accessor = provider.get_online_accessor(id)?;
    let ids = accessor.online_reader()?.lookup(&value)?;

    if ids.is_empty() {
        println!("✗ No entities indexed under {}", value);
    } else {
        println!("{}", serde_json::to_string(&ids)?);
    }
    Ok(())
}

fn cmd_state(provider: &IndexProvider, id: u64) -> anyhow::Result<()> {
    let state = provider.get_initial_state(id)?;
    println!("Index {}: {}", id, state);

    if provider.list_indexes()?.contains(&id) {
        let populator = provider.get_populator(id)?;
        println!("  Entries: {}", populator.entry_count()?);
        println!("  Path: {}", populator.path().display());
    }
    Ok(())
}

fn cmd_list(provider: &IndexProvider) -> anyhow::Result<()> {
    let ids = provider.list_indexes()?;
    if ids.is_empty() {
        println!("No indexes under {}", provider.config().root_dir.display());
        return Ok(());
    }
    for id in ids {
        println!("index-{}: {}", id, provider.get_initial_state(id)?);
    }
    Ok(())
}

fn cmd_dump(provider: &IndexProvider, id: u64) -> anyhow::Result<()> {
    if !provider.list_indexes()?.contains(&id) {
        anyhow::bail!("Index {} does not exist", id);
    }
    for (value, ids) in provider.get_populator(id)?.entries()? {
        println!("{}\t{}", value, serde_json::to_string(&ids)?);
    }
    Ok(())
}

fn cmd_drop(provider: &IndexProvider, id: u64) -> anyhow::Result<()> {
    provider.drop_index(id)?;
    println!("✓ Index {} dropped", id);
    Ok(())
}
