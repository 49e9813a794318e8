use anyhow::Result;
use clap::Parser;
use drf_stubs_dev::cli::{Cli, Command};
use drf_stubs_dev::{cmd, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Stubgen(args) => cmd::stubgen::run_stubgen(&args),
        Command::Checkout(args) => cmd::stubgen::run_checkout(&args),
        Command::Paths => {
            cmd::stubgen::print_paths();
            Ok(())
        }
        Command::Config(config_cmd) => cmd::config::run(config_cmd),
    }
}
