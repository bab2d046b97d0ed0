//! `sites`: list the sites visible to the API token

use anyhow::{Context, Result};

use crate::api::{SentinelOneClient, Site};
use crate::cli::{Cli, Output, OutputFormat, SitesArgs};
use crate::sweep::discover_sites;

/// Execute the sites command
pub async fn execute(cli: &Cli, args: SitesArgs, output: &Output) -> Result<()> {
    let settings = super::load_settings(cli, None)?;

    let sites = tokio::task::spawn_blocking(move || -> Result<Vec<Site>> {
        let client = SentinelOneClient::new(&settings.api)?;
        let sites = discover_sites(&client, settings.api.page_limit).context("Failed to list sites")?;
        Ok(sites)
    })
    .await
    .context("Site listing thread terminated unexpectedly")??;

    match args.format {
        OutputFormat::Json => output.data(&serde_json::to_string_pretty(&sites)?),
        OutputFormat::Text => {
            output.header(&format!("🏢 Sites ({})", sites.len()));
            for site in &sites {
                output.table_row(&site.id, &describe(site));
            }
            if sites.is_empty() {
                output.warning("No sites are visible to this token");
            }
        }
    }

    Ok(())
}

fn describe(site: &Site) -> String {
    let mut line = site.name.clone();
    if let Some(account) = &site.account_name {
        line.push_str(&format!(" [{account}]"));
    }
    if let Some(state) = &site.state {
        line.push_str(&format!(" ({state})"));
    }
    line
}
