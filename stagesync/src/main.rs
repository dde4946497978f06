//! Snapshot synchronization tool for remote document store projects.
//!
//! Pulls the full resource tree of a project into a portable snapshot file,
//! compares two snapshot files structurally, and seeds a snapshot into a
//! fresh target project in dependency order.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use stagesync_core::{
    CheckpointStore, DiffResult, HttpStoreClient, ProjectPuller, ProjectSeeder, SeedConfig,
    StoreClient, StoreConfig, compare, init_logging,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

mod output;

use output::{load_snapshot, save_snapshot};

#[derive(Parser)]
#[command(name = "stagesync")]
#[command(about = "Project snapshot pull, compare, and seed tool")]
#[command(version)]
#[command(long_about = "
StageSync - resumable project snapshot synchronization

Captures the full state of a remote document store project (databases,
collections, attributes, documents, functions, storage buckets) into a
portable snapshot file, compares two snapshots structurally, and seeds a
snapshot into a fresh target project in dependency-correct phases.

EXAMPLES:
  stagesync pull --output prod.json
  stagesync pull --resume --output prod.json
  stagesync compare --source prod.json --destination staging.json
  stagesync seed --snapshot prod.json --with-functions
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pull the full project state into a snapshot file
    Pull(PullArgs),
    /// Compare two snapshot files structurally
    Compare(CompareArgs),
    /// Seed a snapshot into a fresh target project
    Seed(SeedArgs),
}

#[derive(Args)]
pub struct StoreArgs {
    /// Remote store endpoint URL
    #[arg(long, env = "STAGESYNC_ENDPOINT")]
    pub endpoint: String,

    /// Project id on the remote store
    #[arg(long, env = "STAGESYNC_PROJECT")]
    pub project: String,

    /// API key (prefer the environment variable over the flag)
    #[arg(long, env = "STAGESYNC_API_KEY", hide_env_values = true)]
    pub api_key: String,
}

#[derive(Args)]
pub struct PullArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Continue from persisted per-collection checkpoints
    #[arg(long)]
    pub resume: bool,

    /// Output snapshot file path
    #[arg(short, long, default_value = "project.stagesync.json")]
    pub output: PathBuf,

    /// Directory holding extraction checkpoints
    #[arg(long, default_value = ".stagesync/checkpoints")]
    pub checkpoint_dir: PathBuf,
}

#[derive(Args)]
pub struct CompareArgs {
    /// Source snapshot file
    #[arg(long)]
    pub source: PathBuf,

    /// Destination snapshot file
    #[arg(long)]
    pub destination: PathBuf,
}

#[derive(Args)]
pub struct SeedArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Snapshot file to replay
    #[arg(long)]
    pub snapshot: PathBuf,

    /// Also recreate function metadata
    #[arg(long)]
    pub with_functions: bool,

    /// Also recreate storage bucket metadata
    #[arg(long)]
    pub with_storage: bool,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all output except errors")]
    pub quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    match cli.command {
        Command::Pull(args) => run_pull(args).await,
        Command::Compare(args) => run_compare(args).await,
        Command::Seed(args) => run_seed(args).await,
    }
}

fn client_for(store: &StoreArgs) -> anyhow::Result<Arc<dyn StoreClient>> {
    let config = StoreConfig::new(&store.endpoint, &store.project, &store.api_key)
        .context("invalid store configuration")?;
    Ok(Arc::new(HttpStoreClient::new(config)))
}

async fn run_pull(args: PullArgs) -> anyhow::Result<()> {
    info!("Starting project pull (resume: {})", args.resume);

    let client = client_for(&args.store)?;
    let checkpoints = CheckpointStore::open(&args.checkpoint_dir)?;
    let puller = ProjectPuller::new(client, checkpoints);

    let outcome = puller.pull(args.resume).await;

    // A partial snapshot is still written so the operator can inspect what
    // was fetched and target a resume at the gaps.
    save_snapshot(&outcome.snapshot, &args.output).await?;

    println!("Snapshot written to {}", args.output.display());
    println!("Databases:   {}", outcome.snapshot.databases.len());
    println!("Collections: {}", outcome.snapshot.collection_count());
    println!("Documents:   {}", outcome.snapshot.document_count());
    println!("Completed:   {}", outcome.snapshot.completed);

    if !outcome.log.is_empty() {
        warn!("{} issues during pull:", outcome.log.len());
        for line in &outcome.log {
            warn!("  {line}");
        }
    }

    if let Some(fatal) = outcome.fatal {
        return Err(fatal).context("pull aborted; partial snapshot was written");
    }
    Ok(())
}

async fn run_compare(args: CompareArgs) -> anyhow::Result<()> {
    let source = load_snapshot(&args.source)
        .await
        .context("loading source snapshot")?;
    let destination = load_snapshot(&args.destination)
        .await
        .context("loading destination snapshot")?;

    let result = compare(&source, &destination);
    match &result {
        DiffResult::NoDifferences => println!("Project states match"),
        DiffResult::Differences(entries) => {
            println!("{} differences:", entries.len());
            print!("{result}");
        }
    }
    Ok(())
}

async fn run_seed(args: SeedArgs) -> anyhow::Result<()> {
    let snapshot = load_snapshot(&args.snapshot)
        .await
        .context("loading snapshot to seed")?;

    if !snapshot.completed {
        warn!("snapshot is marked incomplete; seeding whatever it contains");
    }

    let client = client_for(&args.store)?;
    let config = SeedConfig::default()
        .with_functions(args.with_functions)
        .with_storage(args.with_storage);
    let seeder = ProjectSeeder::new(client).with_config(config);

    let outcome = seeder.seed(&snapshot).await;

    println!("Created {} resources:", outcome.created.len());
    for label in &outcome.created {
        println!("  {label}");
    }
    if !outcome.log.is_empty() {
        println!("{} issues logged; re-run with -v for details", outcome.log.len());
    }
    Ok(())
}
