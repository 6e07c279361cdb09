//! CLI definition, tracing setup, and command handlers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::{
    self,
    format::{DefaultFields, Format},
};

use orgchart_core::{ProgressReporter, RunConfig, RunResult, build_org_hierarchy};
use orgchart_directory::{GraphDirectory, SnapshotDirectory};
use orgchart_shared::{
    AppConfig, BuildConfig, init_config, load_config, load_config_from, resolve_credentials,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Rebuild the organization's reporting hierarchy from the directory.
#[derive(Parser)]
#[command(
    name = "org-hierarchy",
    version,
    about = "Fetch directory users and write the management hierarchy as JSON.",
    long_about = None,
    args_conflicts_with_subcommands = true,
)]
pub(crate) struct Cli {
    /// Manager mail address to root the hierarchy at. Omit for the whole org.
    pub manager_email: Option<String>,

    /// Config file (defaults to ~/.orgchart/orgchart.toml).
    #[arg(long, env = "ORGCHART_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output directory for the JSON document.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Maximum manager-chain hops before a chain is treated as cyclic.
    #[arg(long)]
    pub max_hops: Option<usize>,

    /// Read users from a JSON export instead of the directory API.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Execution log file (appended to).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log format on stderr: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Subcommands besides the default build.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Config resolution
// ---------------------------------------------------------------------------

/// Load the config file and apply CLI overrides.
pub(crate) fn load_app_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    if let Some(out) = &cli.out {
        config.output.output_dir = out.display().to_string();
    }
    if let Some(log_file) = &cli.log_file {
        config.output.log_file = log_file.display().to_string();
    }
    if let Some(max_hops) = cli.max_hops {
        config.hierarchy.max_hops = max_hops;
    }

    Ok(config)
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing: stderr in the chosen format, plus the plain-text
/// execution log for build runs. The returned guard must outlive the run.
pub(crate) fn init_tracing(cli: &Cli, config: &AppConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("org_hierarchy={level},orgchart={level}")));

    let stderr_layer = match cli.log_format {
        LogFormat::Text => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
    };

    // Config subcommands don't touch the execution log.
    let (file_layer, guard) = if cli.command.is_none() {
        let (writer, guard) = open_execution_log(&config.output.log_path())?;
        (Some(execution_log_layer(writer)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Open the execution log for appending, creating its directory.
fn open_execution_log(log_path: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};

    let (dir, file_name) = split_log_path(log_path)?;
    std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("cannot create log directory {}: {e}", dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(&dir)
        .map_err(|e| eyre!("cannot open log file {}: {e}", log_path.display()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Timestamped plain-text lines, no ANSI escapes.
fn execution_log_layer<S>(
    writer: NonBlocking,
) -> fmt::Layer<S, DefaultFields, Format, NonBlocking> {
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("log path '{}' has no file name", path.display()))?
        .to_string_lossy()
        .into_owned();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok((dir, file_name))
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    match &cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
        None => cmd_build(&cli, &config).await,
    }
}

async fn cmd_build(cli: &Cli, config: &AppConfig) -> Result<()> {
    let build = BuildConfig {
        start_manager_email: cli.manager_email.clone(),
        ..BuildConfig::from(config)
    };
    let run_config = RunConfig {
        build,
        output_dir: PathBuf::from(&config.output.output_dir),
    };

    match &cli.manager_email {
        Some(mail) => info!(mail, "building hierarchy scoped to manager"),
        None => info!("building full organization hierarchy"),
    }

    let reporter = CliProgress::new();
    let outcome = match &cli.input {
        Some(path) => {
            info!(path = %path.display(), "reading users from snapshot");
            let source = SnapshotDirectory::new(path);
            build_org_hierarchy(&source, &run_config, &reporter).await
        }
        None => {
            let source = resolve_credentials(&config.graph)
                .and_then(|creds| GraphDirectory::new(config.graph.clone(), creds));
            match source {
                Ok(source) => build_org_hierarchy(&source, &run_config, &reporter).await,
                Err(e) => Err(e),
            }
        }
    };

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            error!(category = e.category(), "{e}");
            return Err(e.into());
        }
    };

    print_summary(&result);
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!();
    if result.document.is_empty() {
        println!("  No eligible users found; wrote an empty hierarchy.");
    } else {
        println!("  Org hierarchy written!");
    }
    println!("  File:      {}", result.output_path.display());
    println!("  Fetched:   {} users in {} page(s)", result.report.records_fetched, result.pages);
    println!("  Eligible:  {}", result.report.records_eligible);
    println!("  Roots:     {}", result.report.roots);
    println!("  People:    {}", result.summary.total_people);
    println!(
        "  Managers:  {} ({} with manager reports, {} front-line)",
        result.summary.total_managers,
        result.summary.managers_with_manager_reports,
        result.summary.front_line_managers
    );
    println!("  Depth:     {}", result.summary.max_depth);
    if !result.report.warnings.is_empty() {
        println!("  Warnings:  {} (see log)", result.report.warnings.len());
    }
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, page: usize, total_records: usize) {
        self.spinner
            .set_message(format!("Fetching users [page {page}, {total_records} so far]"));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_is_full_mode() {
        let cli = Cli::try_parse_from(["org-hierarchy"]).unwrap();
        assert!(cli.manager_email.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn positional_argument_is_scoped_mode() {
        let cli = Cli::try_parse_from(["org-hierarchy", "vp@x.com", "--max-hops", "7"]).unwrap();
        assert_eq!(cli.manager_email.as_deref(), Some("vp@x.com"));
        assert_eq!(cli.max_hops, Some(7));
    }

    #[test]
    fn config_subcommand_parses() {
        let cli = Cli::try_parse_from(["org-hierarchy", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config { action: ConfigAction::Show })
        ));
    }

    #[test]
    fn execution_log_appends_plain_text_across_runs() {
        use tracing_subscriber::layer::SubscriberExt;

        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("logs").join("org_hierarchy.log");

        for run in ["first", "second"] {
            let (writer, guard) = open_execution_log(&log_path).unwrap();
            let subscriber = tracing_subscriber::registry().with(execution_log_layer(writer));
            tracing::subscriber::with_default(subscriber, || {
                tracing::warn!(category = "CycleDetected", "CycleDetected: {run} run");
                tracing::error!(category = "SourceUnavailable", "SourceUnavailable: {run} run");
            });
            drop(guard);
        }

        let log = std::fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("WARN") && lines[0].contains("CycleDetected: first run"));
        assert!(lines[1].contains("ERROR") && lines[1].contains("SourceUnavailable: first run"));
        assert!(lines[2].contains("CycleDetected: second run"));
        assert!(lines[3].contains("SourceUnavailable: second run"));
        assert!(!log.contains('\u{1b}'));
        // Each line leads with its timestamp.
        assert!(lines.iter().all(|l| l.starts_with("20")));
    }

    #[test]
    fn split_log_path_defaults_to_cwd() {
        let (dir, name) = split_log_path(Path::new("org_hierarchy.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "org_hierarchy.log");

        let (dir, name) = split_log_path(Path::new("/var/log/org/run.log")).unwrap();
        assert_eq!(dir, PathBuf::from("/var/log/org"));
        assert_eq!(name, "run.log");
    }
}
