use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};

use crate::checkout::{self, CheckoutOptions, CloneProgress, ProgressPrinter};
use crate::config::DevConfig;
use crate::delegate::stubgen::StubgenDelegate;
use crate::paths::ProjectPaths;

/// Directory inside the checkout holding the importable package.
pub const DRF_PACKAGE_DIR: &str = "rest_framework";

pub fn package_directory(paths: &ProjectPaths) -> PathBuf {
    paths.drf_source.join(DRF_PACKAGE_DIR)
}

/// Check out `version` (default branch when `None`) and regenerate stubs
/// from it into the stubgen target directory.
pub fn run(paths: &ProjectPaths, config: &DevConfig, version: Option<&str>) -> Result<()> {
    let mut printer = ProgressPrinter::stdout();
    run_with_progress(paths, config, version, &mut |event| printer.handle(event))
}

pub fn run_with_progress(
    paths: &ProjectPaths,
    config: &DevConfig,
    version: Option<&str>,
    on_progress: &mut dyn FnMut(CloneProgress),
) -> Result<()> {
    // A missing generator fails before the checkout is touched.
    let generator = StubgenDelegate::from_config(config)?;

    remove_dir_if_present(&paths.drf_source)?;
    let options = CheckoutOptions::from(&config.checkout);
    checkout::checkout_target_tag(&paths.drf_source, version, &options, on_progress)?;

    let package_dir = package_directory(paths);
    ensure!(
        package_dir.is_dir(),
        "checkout does not contain a `{DRF_PACKAGE_DIR}` package at {}",
        package_dir.display()
    );

    generator.generate(&package_dir, &paths.stubgen_target)?;
    tracing::info!(output = %paths.stubgen_target.display(), "stubs generated");
    Ok(())
}

fn remove_dir_if_present(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", dir.display())),
    }
}
