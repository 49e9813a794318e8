use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use which::which;

use crate::config::{self, DevConfig};
use crate::util::process::{self, CommandSpec};

const TOOL_NAME: &str = "stubgen";
pub const STUBGEN_PATH_ENV: &str = "DRF_STUBS_STUBGEN_PATH";

/// The external `stubgen` executable (shipped with mypy).
pub struct StubgenDelegate {
    program: OsString,
}

impl StubgenDelegate {
    pub fn from_config(config: &DevConfig) -> Result<Self> {
        Ok(Self {
            program: resolve_program(config)?,
        })
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn command(&self, package_dir: &Path, output_dir: &Path) -> CommandSpec {
        CommandSpec::new(self.program.clone())
            .arg(package_dir)
            .arg(format!("-o={}", output_dir.display()))
    }

    /// Generate stubs for `package_dir` into `output_dir`.
    pub fn generate(&self, package_dir: &Path, output_dir: &Path) -> Result<()> {
        let spec = self.command(package_dir, output_dir);
        tracing::info!(command = %spec.display(), "running stub generator");
        process::run_checked(&spec)
            .with_context(|| format!("stub generation failed for {}", package_dir.display()))?;
        Ok(())
    }
}

fn resolve_program(config: &DevConfig) -> Result<OsString> {
    if let Some(env_override) = std::env::var_os(STUBGEN_PATH_ENV) {
        let path = PathBuf::from(env_override);
        if !path.exists() {
            bail!(
                "{STUBGEN_PATH_ENV} points to `{}` but it does not exist",
                path.display()
            );
        }
        return Ok(path.into_os_string());
    }

    if let Some(custom) = config.tools.stubgen.path.as_ref() {
        if !custom.exists() {
            bail!(
                "configured stubgen path `{}` does not exist",
                custom.display()
            );
        }
        return Ok(custom.as_os_str().to_os_string());
    }

    match which(TOOL_NAME) {
        Ok(path) => Ok(path.into_os_string()),
        Err(error) => {
            let config_hint = config::config_path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| config::PROJECT_CONFIG_FILE.to_string());
            Err(anyhow!(
                "failed to locate `{TOOL_NAME}` on PATH ({error}). Install mypy, set \
                 {STUBGEN_PATH_ENV}, or set [tools.stubgen].path in {config_hint}."
            ))
        }
    }
}
