//! # bookstore-synth
//!
//! Command-line front end of the synthesizer.
//!
//! ## Usage
//!
//! ```bash
//! # Template from the environment (DB_NAME and DB_USER required)
//! DB_NAME=shop DB_USER=admin bookstore-synth synth > template.json
//!
//! # YAML template from a config file, with stack outputs
//! bookstore-synth --config stack.yaml synth --format yaml --with-outputs
//!
//! # Load a dotenv file, list declared resources (./.env is read when present)
//! bookstore-synth --env-file staging.env list
//!
//! # Override a config file's teardown settings
//! bookstore-synth --config stack.yaml synth --removal-policy destroy --deletion-protection=false
//!
//! # Check configuration only
//! bookstore-synth --env-file .env validate
//! ```
//!
//! Logs go to stderr (`LOG_LEVEL`, `LOG_FORMAT`, `RUST_LOG`); stdout carries
//! only the template.

use anyhow::{Context, Result};
use bookstore_stack::config::{ConfigOverrides, EnvSource, RemovalPolicy, StackConfig};
use bookstore_stack::observability::{init_logging, LogSettings};
use bookstore_stack::template::{digest, OutputFormat};
use bookstore_stack::topology::Topology;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("BUILD_GIT_HASH"),
    ", built ",
    env!("BUILD_DATETIME"),
    ")"
);

/// Synthesize the Bookstore stack into a CloudFormation template
#[derive(Parser)]
#[command(name = "bookstore-synth", version = VERSION, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dotenv file layered under the process environment (default: ./.env if present)
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// YAML or JSON configuration file (replaces environment configuration)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

/// Flags that override the loaded configuration
#[derive(Args)]
struct Overrides {
    /// Stack name
    #[arg(long, global = true)]
    stack_name: Option<String>,

    /// Database teardown behavior: destroy, retain or snapshot
    #[arg(long, global = true)]
    removal_policy: Option<RemovalPolicy>,

    /// Deletion protection on the database (`--deletion-protection=false` to disable)
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    deletion_protection: Option<bool>,

    /// Emit stack outputs (endpoint, database name, username, load balancer DNS)
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    with_outputs: Option<bool>,
}

impl From<&Overrides> for ConfigOverrides {
    fn from(flags: &Overrides) -> Self {
        ConfigOverrides {
            stack_name: flags.stack_name.clone(),
            removal_policy: flags.removal_policy,
            deletion_protection: flags.deletion_protection,
            emit_outputs: flags.with_outputs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render the template
    Synth {
        /// Output format: json or yaml
        #[arg(short, long, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// List declared resources as `LogicalId<TAB>Type`
    List,
    /// Validate configuration without rendering
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    let env = load_env(&cli, EnvSource::from_process(), &cwd)?;

    let log_settings = LogSettings::from_env(&env).context("Invalid logging configuration")?;
    init_logging(&log_settings)?;

    info!("Starting bookstore-synth {VERSION}");

    let config = load_config(&cli, &env)?;

    match cli.command {
        Commands::Synth { format, output } => synth_command(&config, format, output),
        Commands::List => list_command(&config),
        Commands::Validate => validate_command(&config),
    }
}

/// Layer the explicit dotenv file, or `dir/.env` when none was given
fn load_env(cli: &Cli, env: EnvSource, dir: &Path) -> Result<EnvSource> {
    match &cli.env_file {
        Some(path) => env
            .with_dotenv_file(path)
            .with_context(|| format!("Failed to load dotenv file {}", path.display())),
        None => env
            .with_local_dotenv(dir)
            .with_context(|| format!("Failed to load dotenv file from {}", dir.display())),
    }
}

fn load_config(cli: &Cli, env: &EnvSource) -> Result<StackConfig> {
    let mut config = match &cli.config {
        Some(path) => StackConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => StackConfig::from_env(env)
            .context("Failed to load configuration from the environment")?,
    };

    ConfigOverrides::from(&cli.overrides)
        .apply(&mut config)
        .context("Invalid configuration after applying command-line overrides")?;
    debug!(?config, "Resolved stack configuration");
    Ok(config)
}

fn synth_command(config: &StackConfig, format: OutputFormat, output: Option<PathBuf>) -> Result<()> {
    let template = Topology::declare(config)
        .and_then(|topology| topology.synthesize())
        .context("Failed to synthesize stack")?;
    let rendered = template
        .render(format)
        .with_context(|| format!("Failed to render template as {format}"))?;

    info!(
        stack = %config.stack_name,
        %format,
        sha256 = %digest(&rendered),
        "Rendered template"
    );

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered)
                .with_context(|| format!("Failed to write template to {}", path.display()))?;
            info!(path = %path.display(), "Wrote template");
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn list_command(config: &StackConfig) -> Result<()> {
    let template = Topology::declare(config)
        .and_then(|topology| topology.synthesize())
        .context("Failed to synthesize stack")?;

    for (logical_id, resource) in &template.resources {
        println!("{logical_id}\t{}", resource.kind);
    }
    Ok(())
}

fn validate_command(config: &StackConfig) -> Result<()> {
    Topology::declare(config).context("Failed to declare stack")?;
    println!(
        "Configuration for stack {} is valid (database {}, user {})",
        config.stack_name, config.database_name, config.database_username
    );
    Ok(())
}
