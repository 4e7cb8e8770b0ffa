use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use faultloc_indexer::RepoIndexer;
use faultloc_locator::{EmbedBackend, FaultlocConfig, InstanceRequest, Locator};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

mod dataset;
mod report;
mod sink;

pub use dataset::{load_dataset, select_instances, BugInstance};
pub use report::{write_output, RunRecord, RunSummary, OUTPUT_FILE};
pub use sink::FsSink;

#[derive(Parser)]
#[command(name = "faultloc")]
#[command(about = "Bug localization for Python repositories", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors and hide progress
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML configuration file, applied before FL_* environment overrides
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Localize every bug instance of a dataset
    Run(RunArgs),

    /// Build the static index of one repository and print its stats
    Index(IndexArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Dataset JSON: a list of instances or `{ "data": [...] }`
    #[arg(long)]
    dataset: PathBuf,

    /// Directory holding one checked-out repository per instance id
    #[arg(long)]
    repos_root: PathBuf,

    /// Where per-instance artifacts and output.json go
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Candidate groups to emit per instance
    #[arg(long)]
    topk: Option<usize>,

    /// Process at most this many instances (0 = all)
    #[arg(long, default_value_t = 0)]
    max_bugs: usize,

    /// Score candidates against each instance's reference patch
    #[arg(long)]
    evaluate: bool,

    /// Override the embedding backend
    #[arg(long)]
    embed_backend: Option<EmbedBackend>,

    /// Override the chat model id
    #[arg(long)]
    model: Option<String>,
}

#[derive(Args)]
struct IndexArgs {
    /// Repository directory to index
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Persist the index as JSON
    #[arg(long)]
    out: Option<PathBuf>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = match &cli.config {
        Some(path) => FaultlocConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FaultlocConfig::default(),
    };
    config.apply_env();

    match cli.command {
        Commands::Run(args) => run_dataset(args, config, cli.quiet).await,
        Commands::Index(args) => run_index(args).await,
    }
}

async fn run_dataset(args: RunArgs, mut config: FaultlocConfig, quiet: bool) -> Result<()> {
    if let Some(backend) = args.embed_backend {
        config.embed_backend = backend;
    }
    if let Some(model) = &args.model {
        config.llm_model = model.clone();
    }
    let topk = args.topk.unwrap_or(config.default_topk).max(1);

    // Credentials are checked before any instance is touched.
    let capabilities = faultloc_llm::capabilities_from_env(&config)
        .context("Failed to configure model capabilities")?;
    let locator = Locator::new(config, capabilities);

    let items = load_dataset(&args.dataset)?;
    let instances = select_instances(&items, &args.repos_root, args.max_bugs);
    log::info!(
        "Running {} of {} dataset items (topk={topk})",
        instances.len(),
        items.len()
    );

    let progress = progress_bar(instances.len(), quiet)?;
    let mut records = Vec::with_capacity(instances.len());
    for instance in &instances {
        progress.set_message(instance.instance_id.clone());
        records.push(run_one(&locator, instance, &args, topk).await);
        progress.inc(1);
    }
    progress.finish_and_clear();

    let output = write_output(&args.artifacts, &records)?;
    let summary = RunSummary::of(&records);
    log::info!(
        "Finished {} instances: {} failed, {}/{} exact matches",
        summary.total,
        summary.failed,
        summary.exact_matches,
        summary.evaluated
    );
    print_stdout(&output.display().to_string())
}

async fn run_one(
    locator: &Locator,
    instance: &BugInstance,
    args: &RunArgs,
    topk: usize,
) -> RunRecord {
    let sink = FsSink::new(args.artifacts.join(&instance.instance_id));
    let request = InstanceRequest {
        instance_id: &instance.instance_id,
        problem_statement: &instance.problem_statement,
        patch: if args.evaluate {
            instance.patch.as_deref()
        } else {
            None
        },
        topk,
    };

    match locator
        .run_instance(request, &instance.repo_path, &sink)
        .await
    {
        Ok(result) => {
            log::info!(
                "{}: {} with {} candidate groups",
                instance.instance_id,
                result.category,
                result.candidates.len()
            );
            RunRecord::Done(Box::new(result))
        }
        Err(e) => {
            log::error!("{} failed: {e}", instance.instance_id);
            RunRecord::failed(&instance.instance_id, e)
        }
    }
}

fn progress_bar(len: usize, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
    )?);
    Ok(bar)
}

async fn run_index(args: IndexArgs) -> Result<()> {
    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("Invalid repository path {}", args.path.display()))?;
    let (index, stats) = RepoIndexer::new(&root)?
        .build()
        .await
        .context("Failed to index repository")?;

    for error in &stats.errors {
        log::debug!("Skipped: {error}");
    }
    if let Some(out) = &args.out {
        index
            .save(out)
            .await
            .with_context(|| format!("Failed to save index to {}", out.display()))?;
        log::info!("Saved index to {}", out.display());
    }

    let summary = json!({
        "root": root,
        "scanned": stats.scanned,
        "files": stats.files,
        "skipped": stats.skipped(),
        "symbols": stats.symbols,
        "modules": stats.modules,
        "import_edges": stats.import_edges,
        "time_ms": stats.time_ms,
        "saved_to": args.out,
    });
    print_stdout(&serde_json::to_string_pretty(&summary)?)
}

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")?;
    Ok(())
}
