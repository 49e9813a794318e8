use anyhow::Result;
use clap::Parser;
use drf_stubs_dev::cli::VersionArgs;
use drf_stubs_dev::{cmd, logging};

/// Regenerate rest_framework stubs from a fresh upstream checkout.
#[derive(Parser)]
#[command(name = "stubgen-drf")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    version: VersionArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(false);
    cmd::stubgen::run_stubgen(&cli.version)
}
