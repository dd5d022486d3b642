//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use roadmap_core::migrate::run_migration;
use roadmap_core::{PipelineConfig, ProgressReporter, run_build, validate_project};
use roadmap_shared::{ProjectConfig, init_config, load_config, load_config_from};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Roadmap: build the site's data files from concept, track and glossary sources.
#[derive(Parser)]
#[command(
    name = "roadmap",
    version,
    about = "Resolve concept references, index glossary terms, and emit roadmap data files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to roadmap.toml (defaults to ./roadmap.toml).
    #[arg(long, env = "ROADMAP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Resolve all tracks, index the glossary and write every data file.
    Build {
        /// Output directory (overrides `paths.output_dir`).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check the library, tracks and glossary without writing anything.
    Validate,

    /// Move inline concepts from legacy tracks into the concept library.
    Migrate {
        /// Overwrite an existing concept library.
        #[arg(long)]
        force: bool,
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
    /// Write roadmap.toml with defaults.
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
        0 => "roadmap=info",
        1 => "roadmap=debug",
        _ => "roadmap=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Build { out } => cmd_build(config_path, out),
        Command::Validate => cmd_validate(config_path),
        Command::Migrate { force } => cmd_migrate(config_path, force),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

/// Load `--config` if given, otherwise `roadmap.toml` in the working directory.
fn load_project(config_path: Option<&Path>) -> Result<ProjectConfig> {
    let project = match config_path {
        Some(path) => load_config_from(path)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| eyre!("cannot determine working directory: {e}"))?;
            load_config(&cwd)?
        }
    };
    Ok(project)
}

fn tool_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
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
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn track_resolved(&self, slug: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Resolving [{current}/{total}] {slug}"));
    }

    fn file_written(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {path}"));
    }

    fn done(&self, _summary: &str) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Clear the spinner when a stage fails before `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_build(config_path: Option<&Path>, out: Option<PathBuf>) -> Result<()> {
    let project = load_project(config_path)?;
    let mut config = PipelineConfig::from_project(&project, tool_version());
    if let Some(out) = out {
        config.paths.output_dir = out;
    }

    info!(root = %project.root.display(), "building roadmap data");

    let reporter = CliProgress::new();
    let result = run_build(&config, &reporter)?;
    drop(reporter);

    let counts = &result.manifest.counts;
    println!();
    println!("  Build complete.");
    println!("  Tracks:   {}", counts.tracks);
    println!("  Topics:   {}", counts.topics);
    println!("  Concepts: {}", counts.concepts);
    match counts.glossary_terms {
        Some(terms) => println!("  Glossary: {terms} terms"),
        None => println!("  Glossary: skipped (no source file)"),
    }
    println!("  Files:    {}", result.manifest.files.len() + 1);
    println!("  Output:   {}", result.output_dir.display());
    println!("  Time:     {:.2}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_validate(config_path: Option<&Path>) -> Result<()> {
    let project = load_project(config_path)?;
    let config = PipelineConfig::from_project(&project, tool_version());

    let reporter = CliProgress::new();
    let report = validate_project(&config, &reporter);
    drop(reporter);

    println!();
    println!("  Tracks:   {}", report.tracks);
    println!("  Concepts: {}", report.concepts);
    if let Some(terms) = report.glossary_terms {
        println!("  Glossary: {terms} terms");
    }
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
    for problem in &report.problems {
        println!("  error: {problem}");
    }
    println!();

    if report.is_ok() {
        println!("  All content is valid.");
        Ok(())
    } else {
        Err(eyre!("validation found {} problem(s)", report.problems.len()))
    }
}

fn cmd_migrate(config_path: Option<&Path>, force: bool) -> Result<()> {
    let project = load_project(config_path)?;

    let reporter = CliProgress::new();
    let result = run_migration(&project, force, &reporter)?;
    drop(reporter);

    let summary = &result.summary;
    println!();
    println!("  Migration complete.");
    println!("  Tracks processed:   {}", summary.tracks_processed);
    println!("  Unique concepts:    {}", summary.unique_concepts);
    println!("  Domain files:       {}", summary.domains_created);
    println!("  Multi-track shared: {}", summary.multi_track_concepts);
    println!("  Overrides created:  {}", summary.overrides_created);
    if summary.id_conflicts > 0 {
        println!("  ID conflicts:       {} (see report)", summary.id_conflicts);
    }
    println!("  Concepts: {}", result.concepts_dir.display());
    println!("  Tracks:   {}", result.tracks_dir.display());
    println!("  Report:   {}", result.report_path.display());
    println!();

    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let root = match config_path.and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => std::env::current_dir()
            .map_err(|e| eyre!("cannot determine working directory: {e}"))?,
    };
    let path = init_config(&root)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let project = load_project(config_path)?;
    let toml_str = toml::to_string_pretty(&project.config)?;
    println!("# project root: {}", project.root.display());
    println!("{toml_str}");
    Ok(())
}
