use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use log::{debug, error, info, warn};
use reach_probe::logging::{self, highlight};
use reach_probe::status::rate_tone;
use reach_probe::{AppConfig, BatchReport, Error, IcmpProber, RunStatus, check_batch, load_endpoints, success};

const EXAMPLES: &str = "\
Examples:
  reach-probe run                    # Run full connectivity test
  reach-probe run -l 10              # Limit to first 10 URLs
  reach-probe run -c 5               # Use only 5 concurrent HTTP connections
  reach-probe run -l 50 -c 10        # Test 50 URLs with 10 concurrent connections
  reach-probe run -v                 # Show detailed debug information
  reach-probe init                   # Write the current settings to the config file";

#[derive(Debug, Parser)]
#[command(name = "reach-probe", version, about = "Endpoint reachability tester (ICMP + HTTP)", after_help = EXAMPLES)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run connectivity test
    Run(RunArgs),
    /// Write the current settings (defaults if none) to the config file
    Init,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Limit number of URLs to test
    #[arg(short, long)]
    limit: Option<usize>,

    /// Maximum number of concurrent HTTP connections, at least 1 [default: 20]
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Show detailed debug information
    #[arg(short, long)]
    verbose: bool,

    /// Endpoint list (JSON array of {"url": ...} objects)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Where to write the working URLs
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the full report as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

/// Unique URLs, first occurrence wins.
fn dedup(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter().filter(|url| seen.insert(url.as_str())).cloned().collect()
}

/// `-c 0` is raised to 1; there is no unlimited mode.
fn effective_concurrency(flag: Option<usize>, configured: usize) -> usize {
    flag.unwrap_or(configured).max(1)
}

fn write_file(path: &Path, content: &str) -> reach_probe::Result<()> {
    fs::write(path, content).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_report(path: &Path, report: &BatchReport) -> reach_probe::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_file(path, &json)
}

async fn run(args: RunArgs) -> reach_probe::Result<()> {
    info!("Connectivity test started");
    debug!("run: limit={:?}, concurrency={:?}", args.limit, args.concurrency);

    let config = AppConfig::load();
    let endpoints_file = args.file.unwrap_or_else(|| config.endpoints_file.clone());

    let mut endpoints = load_endpoints(&endpoints_file)?;
    debug!("Loaded {} endpoints from {}", endpoints.len(), endpoints_file.display());
    if endpoints.is_empty() {
        error!("No endpoints found in {}", endpoints_file.display());
        return Ok(());
    }

    if let Some(limit) = args.limit.filter(|&limit| limit > 0) {
        endpoints.truncate(limit);
        debug!("Limited to {} URLs for testing", endpoints.len());
    }

    let mut options = config.batch_options();
    options.concurrency = effective_concurrency(args.concurrency, options.concurrency);
    debug!("Using concurrency of {} for HTTP connections", options.concurrency);

    let prober = Arc::new(IcmpProber::new(config.ping_attempts));
    let report = check_batch(&endpoints, &options, prober).await?;
    debug!("Connectivity check completed");

    info!("Working URLs: {}/{}", report.working_count, report.total_urls_tested);
    info!(
        "Success rate: {}",
        highlight(format!("{:.1}%", report.success_rate), rate_tone(report.success_rate))
    );
    info!("Unique pingable hosts found: {}", report.total_hosts);

    let working_urls = dedup(&report.working_urls);
    debug!("Found {} unique working URLs after deduplication", working_urls.len());

    let output = args.output.unwrap_or_else(|| config.output_file.clone());
    if working_urls.is_empty() {
        debug!("No working URLs found, skipping file creation");
    } else {
        write_file(&output, &working_urls.join("\n"))?;
        debug!("Saved {} working URLs to {}", working_urls.len(), output.display());
    }

    if let Some(path) = args.report {
        write_report(&path, &report)?;
        debug!("Wrote JSON report to {}", path.display());
    }

    match RunStatus::from_success_rate(report.success_rate) {
        RunStatus::NoneWorking => error!("No services are working"),
        RunStatus::SomeWorking => warn!(
            "{} out of {} services working",
            report.working_count, report.total_urls_tested
        ),
        RunStatus::AllWorking => success!("All services are working"),
    }

    Ok(())
}

fn init_config() -> reach_probe::Result<()> {
    let path = AppConfig::get_config_path()?;
    AppConfig::load().save()?;
    success!("Wrote config to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Command::Run(args)) => {
            logging::init(args.verbose);
            run(args).await
        }
        Some(Command::Init) => {
            logging::init(false);
            init_config()
        }
        None => {
            let _ = Cli::command().print_help();
            return ExitCode::SUCCESS;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
