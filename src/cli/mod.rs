//! Command-line interface for s1-sweep
//!
//! Parses arguments with clap, sets up logging through the shared console
//! sink and dispatches to the command implementations. Flags that were
//! actually given become the top configuration layer.

use anyhow::{Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod commands;
mod output;

pub use output::Output;

use crate::api::{Agents, Alerts, Threats};
use crate::config::SweepConfig;
use crate::parallel::{Console, LogWriter};

/// s1-sweep - concurrent per-site extraction from the SentinelOne API
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (TOML, JSON or YAML)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// API root URL, e.g. https://tenant.sentinelone.net/web/api/v2.1
    #[arg(long, value_name = "URL", env = "S1_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// API token
    #[arg(long, value_name = "TOKEN", env = "S1_API_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Number of concurrent workers (default: derived from CPU cores)
    #[arg(short, long, value_name = "N", global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Extract cloud detection alerts for every site
    Alerts(SweepArgs),
    /// Extract threats for every site
    Threats(SweepArgs),
    /// Extract agents (endpoints) for every site
    Agents(SweepArgs),
    /// List the sites visible to the API token
    Sites(SitesArgs),
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Show version information
    Version,
}

/// Options shared by the resource sweeps
#[derive(Args, Debug, Clone, Default)]
pub struct SweepArgs {
    /// Sweep only this site id (repeatable); skips site discovery
    #[arg(long = "site", value_name = "ID")]
    pub sites: Vec<String>,

    /// Skip the first N sites of the site list
    #[arg(long, value_name = "N")]
    pub skip: Option<usize>,

    /// Sweep at most N sites after skipping
    #[arg(long, value_name = "N")]
    pub take: Option<usize>,

    /// Records requested per page (1-1000)
    #[arg(long, value_name = "N")]
    pub page_limit: Option<u32>,

    /// Write every collected record to FILE as a JSON array
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Do not draw the live progress display
    #[arg(long)]
    pub no_progress: bool,

    /// Exit with an error when any site failed
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SitesArgs {
    /// Listing format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration (token masked)
    Show {
        /// text prints TOML
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check that the merged configuration is usable
    Validate,
    /// Write a starter s1-sweep.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    /// Execute the CLI command
    pub async fn run(mut self) -> Result<()> {
        let console = Arc::new(Console::stderr());
        setup_logging(self.verbose, self.quiet, console.clone());
        let output = Output::new(console, self.verbose > 0, self.quiet);

        match self.command.take() {
            Some(Commands::Alerts(args)) => commands::sweep::execute::<Alerts>(&self, args, &output).await,
            Some(Commands::Threats(args)) => commands::sweep::execute::<Threats>(&self, args, &output).await,
            Some(Commands::Agents(args)) => commands::sweep::execute::<Agents>(&self, args, &output).await,
            Some(Commands::Sites(args)) => commands::sites::execute(&self, args, &output).await,
            Some(Commands::Config(cmd)) => commands::config::execute(&self, cmd, &output).await,
            Some(Commands::Version) => commands::version::execute(&output).await,
            None => {
                // Show help when no command is provided
                let mut cmd = Cli::command();
                cmd.print_help()?;
                Ok(())
            }
        }
    }

    /// Layered configuration with this invocation's flags on top
    pub fn load_config(&self, sweep: Option<&SweepArgs>) -> Result<SweepConfig> {
        if let Some(path) = &self.config {
            if !Path::new(path).is_file() {
                bail!("Configuration file not found: {path}");
            }
        }
        SweepConfig::load_with(self.config.as_deref(), Some(self.overrides(sweep)))
    }

    /// Only flags that were actually given, shaped like the config file
    fn overrides(&self, sweep: Option<&SweepArgs>) -> Value {
        let mut overrides = Overrides::default();
        overrides.set("api", "base_url", self.base_url.clone());
        overrides.set("api", "token", self.token.clone());
        overrides.set("runner", "workers", self.workers);

        if let Some(args) = sweep {
            overrides.set("api", "page_limit", args.page_limit);
            overrides.set("sites", "ids", (!args.sites.is_empty()).then(|| args.sites.clone()));
            overrides.set("sites", "skip", args.skip);
            overrides.set("sites", "take", args.take);
            overrides.set("display", "progress", args.no_progress.then_some(false));
        }

        Value::Object(overrides.0)
    }
}

#[derive(Default)]
struct Overrides(Map<String, Value>);

impl Overrides {
    fn set<V: Into<Value>>(&mut self, section: &str, key: &str, value: Option<V>) {
        let Some(value) = value else {
            return;
        };
        let section = self
            .0
            .entry(section)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(fields) = section {
            fields.insert(key.to_string(), value.into());
        }
    }
}

/// Filter directives used when RUST_LOG is unset
fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        // Per-site progress lines are part of the normal output
        0 => "warn,s1_sweep=info",
        1 => "info",
        2 => "debug,hyper_util=info,rustls=info",
        _ => "trace",
    }
}

fn setup_logging(verbose: u8, quiet: bool, console: Arc<Console>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter(verbose, quiet)));

    // Fails only if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_writer(LogWriter::new(console))
        .try_init();
}
