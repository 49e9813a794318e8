use clap::Parser;
use drf_stubs_dev::cli::SessionArgs;
use drf_stubs_dev::{logging, session};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(version)]
#[command(about = "Automation sessions for djangorestframework-stubs (lint, test, typecheck, build, release)")]
struct Cli {
    #[command(flatten)]
    args: SessionArgs,
}

fn main() {
    let cli = Cli::parse();
    logging::init(false);

    if let Err(error) = session::run_cli(cli.args) {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}
