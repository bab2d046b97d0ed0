//! Configuration command implementations

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use crate::cli::{Cli, ConfigCommands, Output, OutputFormat};
use crate::config::{DEFAULT_CONFIG, mask_token};
use crate::parallel::calculate_workers;

/// File written by `config init`; also picked up as the project config layer
const PROJECT_CONFIG: &str = "s1-sweep.toml";

/// Execute config commands
pub async fn execute(cli: &Cli, cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { format } => show(cli, format, output),
        ConfigCommands::Validate => validate(cli, output),
        ConfigCommands::Init { force } => init(Path::new(PROJECT_CONFIG), force, output),
    }
}

fn show(cli: &Cli, format: OutputFormat, output: &Output) -> Result<()> {
    let settings = cli.load_config(None)?.settings().context("Failed to read configuration")?.redacted();

    let rendered = match format {
        OutputFormat::Text => toml::to_string_pretty(&settings).context("Failed to render configuration")?,
        OutputFormat::Json => serde_json::to_string_pretty(&settings)?,
    };
    output.data(rendered.trim_end());
    Ok(())
}

fn validate(cli: &Cli, output: &Output) -> Result<()> {
    output.header("✅ Validating Configuration");

    let settings = cli.load_config(None)?.settings().context("Failed to read configuration")?;
    settings.validate().context("Configuration is invalid")?;

    output.success("Configuration is valid");
    output.table_row("Base URL", &settings.api.base_url);
    output.table_row("Token", &mask_token(&settings.api.token));
    output.table_row("Page limit", &settings.api.page_limit.to_string());
    output.table_row("Timeout", &format!("{}s", settings.api.timeout_secs));
    output.table_row(
        "Workers",
        &calculate_workers(settings.runner.workers, settings.runner.thread_percentage).to_string(),
    );
    if settings.sites.ids.is_empty() {
        output.table_row("Sites", "discovered from the API");
    } else {
        output.table_row("Sites", &settings.sites.ids.join(", "));
    }
    Ok(())
}

fn init(path: &Path, force: bool, output: &Output) -> Result<()> {
    output.header("🔧 Initializing Configuration");

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    fs::write(path, DEFAULT_CONFIG).with_context(|| format!("Failed to write {}", path.display()))?;

    output.success("Configuration file created successfully");
    output.table_row("Config file", &path.display().to_string());
    output.info("Set api.base_url and api.token (or S1_BASE_URL / S1_API_TOKEN) before sweeping");
    Ok(())
}
