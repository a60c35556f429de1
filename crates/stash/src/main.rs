//! Stash - Entry Point

use clap::Parser;
use stash::cli::{Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run(Cli::parse()).await
}
