use anyhow::Result;

use crate::checkout::{self, CheckoutOptions, ProgressPrinter};
use crate::cli::VersionArgs;
use crate::config;
use crate::paths;
use crate::stubgen;

pub fn run_stubgen(args: &VersionArgs) -> Result<()> {
    let config = config::load()?;
    stubgen::run(paths::project_paths(), &config, args.drf_version.as_deref())
}

pub fn run_checkout(args: &VersionArgs) -> Result<()> {
    let config = config::load()?;
    let options = CheckoutOptions::from(&config.checkout);
    let mut printer = ProgressPrinter::stdout();
    let report = checkout::checkout_target_tag(
        paths::drf_source_directory(),
        args.drf_version.as_deref(),
        &options,
        &mut |event| printer.handle(event),
    )?;
    println!(
        "Checked out {:?} at {} into {}",
        report.target,
        report.commit,
        paths::drf_source_directory().display()
    );
    Ok(())
}

pub fn print_paths() {
    println!("{}", paths::drf_source_directory().display());
    println!("{}", paths::stubgen_target_directory().display());
}
