mod cli_logger;
mod cmd;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use std::io::IsTerminal as _;
use std::path::PathBuf;
use std::process::ExitCode;

use cli_logger::CliLogger;
use cmd::{CacheCommand, CacheOutcome, cache_command};
use gha_profiler::{
    DiskCache, GithubClient, OutputFormat, ProfileConfig, profile_workflow, write_with_format,
};

#[derive(Debug, Parser)]
#[command(
    name = "gha-profiler",
    version,
    about = "Profile step durations of recent GitHub Actions workflow runs",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    profile: ProfileArgs,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect or empty the API response cache.
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
        /// Path to configuration TOML file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where cache data is stored
        #[arg(long = "cache-dir")]
        cache_dir: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct ProfileArgs {
    /// Path to configuration TOML file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Repository owner name
    #[arg(long)]
    owner: Option<String>,
    /// Repository name
    #[arg(long, visible_alias = "repo")]
    repository: Option<String>,
    /// Workflow file name, e.g. ci.yml
    #[arg(long = "workflow-file")]
    workflow_file: Option<String>,
    /// Number of recent workflow runs to analyze [default: 20]
    #[arg(short = 'n', long = "number-of-job", visible_alias = "count")]
    count: Option<u32>,
    /// Access token for GitHub (also read from GITHUB_ACTIONS_PROFILER_TOKEN or GITHUB_TOKEN)
    #[arg(long = "access-token")]
    access_token: Option<String>,
    /// Output format [default: table]
    #[arg(short = 'f', long)]
    format: Option<OutputFormat>,
    /// Field to sort by: number, min, max, mean, median or pNN [default: number]
    #[arg(short = 's', long)]
    sort: Option<String>,
    /// Reverse the result of sort
    #[arg(short = 'r', long)]
    reverse: bool,
    /// Verbose mode
    #[arg(long)]
    verbose: bool,
    /// Concurrency of GitHub API client [default: 2]
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,
    /// Filter regular expression for a job name
    #[arg(long = "job-name-regexp")]
    job_name_regexp: Option<String>,
    /// Comma-separated percentile ladder [default: 50,90,95,99]
    #[arg(long, value_delimiter = ',')]
    percentiles: Option<Vec<u8>>,
    /// Disable the on-disk response cache
    #[arg(long = "no-cache")]
    no_cache: bool,
    /// Where to store cache data
    #[arg(long = "cache-dir")]
    cache_dir: Option<PathBuf>,
    /// API base URL for GitHub Enterprise Server
    #[arg(long = "api-base-url")]
    api_base_url: Option<String>,
    /// Per-request timeout in seconds
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,
    /// Only print these comma-separated columns
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,
    /// Do not print these comma-separated columns
    #[arg(long = "exclude-fields", value_delimiter = ',')]
    exclude_fields: Option<Vec<String>>,
    /// Do not print percentile columns
    #[arg(long = "hide-percentiles")]
    hide_percentiles: bool,
}

impl ProfileArgs {
    fn to_overrides(&self) -> ProfileConfig {
        ProfileConfig {
            owner: self.owner.clone(),
            repo: self.repository.clone(),
            workflow_file: self.workflow_file.clone(),
            count: self.count,
            access_token: self.access_token.clone(),
            format: self.format,
            sort: self.sort.clone(),
            reverse: self.reverse.then_some(true),
            verbose: self.verbose.then_some(true),
            concurrency: self.concurrency,
            job_name_regexp: self.job_name_regexp.clone(),
            percentiles: self.percentiles.clone(),
            cache: self.no_cache.then_some(false),
            cache_dir: self.cache_dir.clone(),
            api_base_url: self.api_base_url.clone(),
            timeout_secs: self.timeout_secs,
            fields: self.fields.clone(),
            exclude_fields: self.exclude_fields.clone(),
            hide_percentiles: self.hide_percentiles.then_some(true),
            replace: Vec::new(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let no_color = std::env::var_os("NO_COLOR").is_some() || !std::io::stderr().is_terminal();

    match &cli.command {
        Some(Command::Cache {
            command,
            config,
            cache_dir,
            json,
        }) => {
            let logger = CliLogger::new(*json, no_color);
            finish(
                &logger,
                run_cache(&logger, command, config.as_ref(), cache_dir.as_ref()),
            )
        }
        None => {
            let config = merged_config(&cli.profile);
            let logger = CliLogger::new(wants_json(config.as_ref().ok(), &cli.profile), no_color);
            let result = config.and_then(|config| run_profile(&logger, config));
            finish(&logger, result)
        }
    }
}

fn finish(logger: &CliLogger, result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.print_error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

/// JSON diagnostics follow the effective output format, which may come from
/// the TOML file; the flag alone decides when the file failed to load.
fn wants_json(config: Option<&ProfileConfig>, args: &ProfileArgs) -> bool {
    config.map_or(args.format, |config| config.format) == Some(OutputFormat::Json)
}

fn merged_config(args: &ProfileArgs) -> Result<ProfileConfig> {
    Ok(load_config(args.config.as_ref())?.merge(args.to_overrides()))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("gha_profiler=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ProfileConfig> {
    match path {
        Some(path) => {
            ProfileConfig::load(path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => Ok(ProfileConfig::default()),
    }
}

fn run_profile(logger: &CliLogger, config: ProfileConfig) -> Result<()> {
    init_tracing(config.verbose.unwrap_or(false));

    let cwd = std::env::current_dir().context("failed to resolve current directory")?;
    let config = config.with_env_token().with_repository_from(&cwd);
    tracing::debug!("{:?}", config.redacted());

    let settings = config.validate()?;
    let client = GithubClient::new(settings.client.clone());
    let report = profile_workflow(&client, &settings)
        .with_context(|| format!("failed to profile {} in {}", settings.workflow_file, settings.repo))?;
    if report.is_empty() {
        logger.print_warning("no job matched the job name filter");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_with_format(
        &mut out,
        &report,
        settings.format,
        &settings.percentiles,
        &settings.field_filter,
    )?;
    Ok(())
}

fn run_cache(
    logger: &CliLogger,
    command: &CacheCommand,
    config: Option<&PathBuf>,
    cache_dir: Option<&PathBuf>,
) -> Result<()> {
    init_tracing(false);
    let config = load_config(config)?;
    let dir = cache_dir
        .cloned()
        .or(config.cache_dir)
        .unwrap_or_else(DiskCache::default_dir);
    let cache = DiskCache::new(dir);
    match cache_command(&cache, command)? {
        CacheOutcome::Listed(files) => logger.print_cache_listing(&files)?,
        CacheOutcome::Cleared(removed) => {
            logger.print_serialized(&serde_json::json!({
                "removed": removed,
                "dir": cache.dir().to_string_lossy(),
            }))?;
        }
    }
    Ok(())
}
