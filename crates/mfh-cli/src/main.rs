use std::path::PathBuf;
use std::{env, io};

use chrono::Local;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use mfh_csv::{find_artifacts, ArtifactDir, MergeReducer};
use mfh_harvester::{BatchOrchestrator, QueryTemplate};
use mfh_webdriver::WebDriverBrowser;
use tokio::runtime;

mod config;

use config::{load_queries, MfhConfig};

/// Map Feed Harvester
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[clap(name = "harvest")]
    Harvest(HarvestArgs),
    #[clap(name = "merge")]
    Merge(MergeArgs),
    #[clap(hide = true)]
    Completion,
}

/// Search every listed place and merge the listings found into one csv file
#[derive(Debug, clap::Args)]
pub struct HarvestArgs {
    /// Place names, one per line or as a yaml list (.yaml/.yml)
    #[clap(parse(from_os_str))]
    pub queries: PathBuf,
    /// Path to the combined csv file
    #[clap(parse(from_os_str), long, short)]
    pub output: PathBuf,
    /// Directory where the per-run artifact directory is created (default: system temp dir)
    #[clap(parse(from_os_str), long)]
    pub work_dir: Option<PathBuf>,
    /// Optional yaml configuration file
    #[clap(env = "MFH_HARVEST_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
    /// Override the number of searches run concurrently
    #[clap(long)]
    pub concurrency: Option<usize>,
    /// Override the pause between two chunks of searches
    #[clap(long)]
    pub cooldown_ms: Option<u64>,
    /// Override the number of attempts of retried page interactions
    #[clap(long)]
    pub retries: Option<usize>,
    /// Override the maximum number of feed scrolls
    #[clap(long)]
    pub max_scrolls: Option<usize>,
    /// Override the search template, `{name}` is replaced by each place name
    #[clap(long)]
    pub query_template: Option<String>,
    /// Override the WebDriver server url
    #[clap(long)]
    pub webdriver_url: Option<String>,
    /// Show the browser windows
    #[clap(long)]
    pub headed: bool,
    /// Keep per-query artifacts after the merge
    #[clap(long)]
    pub keep_artifacts: bool,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

pub fn harvest(args: HarvestArgs) -> anyhow::Result<()> {
    let conf = MfhConfig::try_from(&args)?;
    let template = QueryTemplate::new(&conf.harvest.query_template);
    let queries = load_queries(&args.queries, &template)?;
    if queries.is_empty() {
        anyhow::bail!("No place found in {}", args.queries.display());
    }

    let work_dir = args.work_dir.clone().unwrap_or_else(env::temp_dir);
    let dir = ArtifactDir::create(work_dir, Local::now(), conf.csv.clone())?;
    log::info!(
        "Harvesting {} queries into {}",
        queries.len(),
        dir.path().display()
    );

    let browser = WebDriverBrowser::new(conf.webdriver.clone());
    let orchestrator = BatchOrchestrator::new(browser, dir.clone(), conf.harvest.clone());
    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = rt.block_on(orchestrator.run(&queries));
    if report.records() == 0 {
        log::warn!("No listing harvested from {} queries", report.queries.len());
    }

    let artifacts = report.artifacts();
    MergeReducer::new(conf.csv).merge(&artifacts, &args.output)?;

    let on_disk = dir.artifacts()?.len();
    if args.keep_artifacts {
        log::info!("Artifacts kept in {}", dir.path().display());
    } else if on_disk != artifacts.len() {
        log::warn!(
            "Merged {} artifacts but {} are in {}, keeping them",
            artifacts.len(),
            on_disk,
            dir.path().display()
        );
    } else {
        dir.remove()?;
    }
    Ok(())
}

/// Merge existing artifacts into one csv file, dropping repeated listings
#[derive(Debug, clap::Args)]
pub struct MergeArgs {
    /// Glob pattern of the artifacts to merge, read in path order
    #[clap(long, short)]
    pub artifacts: String,
    /// Path to the combined csv file
    #[clap(parse(from_os_str), long, short)]
    pub output: PathBuf,
    /// Optional yaml configuration file, its csv dialect is used to read and write
    #[clap(env = "MFH_HARVEST_CONFIG", parse(from_os_str), long)]
    pub config: Option<PathBuf>,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

pub fn merge(args: MergeArgs) -> anyhow::Result<()> {
    let conf = MfhConfig::load(args.config.as_deref())?;
    let artifacts = find_artifacts(&args.artifacts)?;
    if artifacts.is_empty() {
        anyhow::bail!("No artifact matches `{}`", args.artifacts);
    }
    MergeReducer::new(conf.csv).merge(&artifacts, &args.output)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Harvest(args) => {
            if !args.quiet {
                env::set_var(
                    "RUST_LOG",
                    "mfh_harvester=info,mfh_csv=info,mfh_webdriver=warn",
                );
                env_logger::init();
            }
            harvest(args)
        }
        SubCommand::Merge(args) => {
            if !args.quiet {
                env::set_var("RUST_LOG", "mfh_csv=info");
                env_logger::init();
            }
            merge(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "mfh", &mut io::stdout());
            Ok(())
        }
    }
}
