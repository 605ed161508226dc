use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::{
    choose, parse_cutoff_date, Config, LedgerStatus, Pipeline, SelectionMode, Selection, Source,
    SourceSelector,
};
use std::fs;
use std::io::{self as stdio, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "curate-research")]
#[command(about = "Store, filter, and pick research items for posting")]
struct Args {
    /// Override the storage directory (defaults to CURATOR_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Treat unreadable collections as empty when filtering
    #[arg(long, global = true)]
    tolerate_corrupt: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge a fetch batch ({"results": [...]}) into a source collection
    Ingest {
        /// Source collection (arxiv, blog, gscholar)
        #[arg(short, long)]
        source: String,

        /// JSON file to read; stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// List eligible candidates as JSON
    Filter {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Pick the single best candidate
    Select {
        #[command(flatten)]
        filters: FilterArgs,

        /// Ranking mode (score, date)
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Record a published URL in the posting ledger
    Record {
        #[arg(short, long)]
        url: String,

        #[arg(short, long, default_value = "")]
        reason: String,
    },

    /// Record a URL only if the publish status reports success
    Confirm {
        /// Status line returned by the publish step
        #[arg(long)]
        status: String,

        #[arg(short, long)]
        url: String,

        #[arg(short, long, default_value = "")]
        reason: String,
    },

    /// Show everything already posted
    Ledger,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Source to read (arxiv, blog, gscholar, all)
    #[arg(short, long, default_value = "all")]
    source: String,

    /// Minimum usefulness score (0-100)
    #[arg(long)]
    min_score: Option<i64>,

    /// Only items published on or after this date (DD-MM-YYYY)
    #[arg(long)]
    since: Option<String>,
}

impl FilterArgs {
    fn selector(&self) -> Result<SourceSelector> {
        Ok(self.source.parse::<SourceSelector>()?)
    }

    fn cutoff(&self) -> Result<Option<chrono::NaiveDate>> {
        self.since
            .as_deref()
            .map(parse_cutoff_date)
            .transpose()
            .context("Invalid --since date")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("shared=info".parse()?)
                .add_directive("curate_research=info".parse()?),
        )
        .with_writer(stdio::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if args.tolerate_corrupt {
        config.tolerate_corrupt_reads = true;
    }

    let pipeline = Pipeline::new(&config);

    match args.command {
        Command::Ingest { source, file } => {
            let source: Source = source.parse()?;
            let content = read_input(file.as_ref())?;
            let outcome = pipeline
                .ingest(source, &content)
                .context("Failed to ingest results")?;
            println!("✓ {}", outcome.message());
        }

        Command::Filter { filters } => {
            let outcome =
                pipeline.candidates(filters.selector()?, filters.min_score, filters.cutoff()?)?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Command::Select { filters, mode } => {
            let mode = match mode {
                Some(mode) => mode.parse::<SelectionMode>()?,
                None => config.default_mode,
            };
            let outcome =
                pipeline.candidates(filters.selector()?, filters.min_score, filters.cutoff()?)?;
            let selection = choose(&outcome, mode);

            if let Selection::Empty { reason } = &selection {
                eprintln!("No item selected: {}", reason);
            }
            let report = serde_json::json!({
                "field": config.field,
                "selection": selection,
                "meta": outcome.meta,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Record { url, reason } => {
            let outcome = pipeline.record(&url, &reason)?;
            print_ledger_outcome(outcome.status, &outcome.entry.url);
        }

        Command::Confirm {
            status,
            url,
            reason,
        } => {
            let outcome = pipeline
                .confirm(&status, &url, &reason)
                .context("Publish did not succeed, nothing recorded")?;
            print_ledger_outcome(outcome.status, &outcome.entry.url);
        }

        Command::Ledger => {
            let entries = pipeline.posted()?;
            if entries.is_empty() {
                println!("Nothing posted yet.");
            }
            for entry in entries {
                if entry.posting_reason.is_empty() {
                    println!("• {}", entry.url);
                } else {
                    println!("• {} ({})", entry.url, entry.posting_reason);
                }
            }
        }
    }

    Ok(())
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            stdio::stdin()
                .read_to_string(&mut content)
                .context("Failed to read results from stdin")?;
            Ok(content)
        }
    }
}

fn print_ledger_outcome(status: LedgerStatus, url: &str) {
    match status {
        LedgerStatus::Saved => println!("✓ Recorded {}", url),
        LedgerStatus::Duplicate => println!("⚠ Already recorded: {}", url),
    }
}
