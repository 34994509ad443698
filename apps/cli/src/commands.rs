//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use routegen_core::emitter;
use routegen_core::pipeline::{BuildConfig, BuildResult, ProgressReporter};
use routegen_shared::{AppConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// routegen: build the catalog route graph.
#[derive(Parser)]
#[command(
    name = "routegen",
    version,
    about = "Generate catalog item, listing, and category routes from structured source files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ./routegen.toml when present).
    #[arg(long, env = "ROUTEGEN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Load the catalog and write all routes and their data artifacts.
    Build {
        /// Directory holding catalog source files.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output directory for routes.json and data/.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// URL prefix for catalog routes.
        #[arg(long)]
        base_path: Option<String>,

        /// Seed for related-item selection (reproducible builds).
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show each category, its route segment, and member count.
    Categories {
        /// Directory holding catalog source files.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Check that a previous build's manifest and artifacts are intact.
    Validate {
        /// Output directory of a previous build.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

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
    /// Write a routegen.toml with defaults into the current directory.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "routegen=info",
        1 => "routegen=debug",
        _ => "routegen=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build {
            data_dir,
            out,
            base_path,
            seed,
        } => cmd_build(config_path, data_dir, out, base_path, seed).await,
        Command::Categories { data_dir } => cmd_categories(config_path, data_dir).await,
        Command::Validate { out } => cmd_validate(config_path, out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Resolve config: explicit path, else ./routegen.toml, else defaults.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(
    config_path: Option<&Path>,
    data_dir: Option<PathBuf>,
    out: Option<PathBuf>,
    base_path: Option<String>,
    seed: Option<u64>,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;

    // CLI flags win over the config file
    if let Some(dir) = data_dir {
        config.source.data_dir = dir;
    }
    if let Some(dir) = out {
        config.routes.output_dir = dir;
    }
    if let Some(base) = base_path {
        config.routes.base_path = base;
    }
    if seed.is_some() {
        config.similarity.seed = seed;
    }
    config.validate()?;

    let build_config = BuildConfig::from_app_config(&config, env!("CARGO_PKG_VERSION"));

    info!(
        data_dir = %build_config.data_dir.display(),
        out = %build_config.output_dir.display(),
        base_path = %build_config.base_path,
        "building catalog routes"
    );

    let reporter = CliProgress::new();
    let result = routegen_core::pipeline::build_site(&build_config, &reporter).await;
    reporter.spinner.finish_and_clear();
    let result = result?;

    println!();
    println!("  Catalog routes built!");
    println!("  Records:    {}", result.record_count);
    println!("  Categories: {}", result.category_count);
    println!("  Routes:     {}", result.manifest.route_count);
    println!("  Output:     {}", result.output_dir.display());
    println!(
        "  Time:       {:.1}s",
        result.elapsed.as_secs_f64()
    );
    println!();

    Ok(())
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &BuildResult) {
        self.spinner.finish_and_clear();
    }
}

async fn cmd_categories(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    if let Some(dir) = data_dir {
        config.source.data_dir = dir;
    }

    let build_config = BuildConfig::from_app_config(&config, env!("CARGO_PKG_VERSION"));
    let summary = routegen_core::pipeline::summarize_categories(&build_config).await?;

    if summary.is_empty() {
        println!("no categories found in {}", build_config.data_dir.display());
        return Ok(());
    }

    let width = summary.iter().map(|c| c.label.len()).max().unwrap_or(0);
    for category in &summary {
        println!(
            "  {:<width$}  {:>4}  {}",
            category.label, category.count, category.segment
        );
    }

    Ok(())
}

async fn cmd_validate(config_path: Option<&Path>, out: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let output_dir = out.unwrap_or(config.routes.output_dir);

    let manifest = emitter::validate_output(&output_dir)
        .await
        .map_err(|e| eyre!("{} is not a valid build: {e}", output_dir.display()))?;

    println!(
        "{}: {} routes, generated {} by routegen {}",
        output_dir.display(),
        manifest.route_count,
        manifest.generated_at.to_rfc3339(),
        manifest.tool_version
    );
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let cwd = std::env::current_dir()
        .map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    let path = init_config(&cwd)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
