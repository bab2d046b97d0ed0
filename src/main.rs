use anyhow::Result;
use clap::Parser;

use s1_sweep::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run().await
}
