use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::paths;

pub const CONFIG_ENV: &str = "DRF_STUBS_CONFIG";
pub const PROJECT_CONFIG_FILE: &str = "drf-stubs-dev.toml";

pub const DRF_REPOSITORY_URL: &str = "https://github.com/encode/django-rest-framework.git";
pub const DEFAULT_BRANCH: &str = "master";
pub const DEFAULT_CLONE_DEPTH: i32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct DevConfig {
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub checkout: CheckoutSection,
    #[serde(default)]
    pub sessions: SessionsSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolsSection {
    #[serde(default)]
    pub stubgen: ToolEntry,
    #[serde(default)]
    pub python: ToolEntry,
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolEntry {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CheckoutSection {
    pub url: String,
    pub default_branch: String,
    /// Commits of history to fetch; zero or less fetches everything.
    pub depth: i32,
}

impl Default for CheckoutSection {
    fn default() -> Self {
        Self {
            url: DRF_REPOSITORY_URL.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            depth: DEFAULT_CLONE_DEPTH,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionsSection {
    /// Virtualenv directory, relative to the project root unless absolute.
    pub envdir: PathBuf,
    pub reuse_existing_virtualenvs: bool,
    /// Sessions run when none are selected.
    pub default: Vec<String>,
    pub pythons: Vec<String>,
    pub djangos: Vec<String>,
    pub drfs: Vec<String>,
}

impl Default for SessionsSection {
    fn default() -> Self {
        Self {
            envdir: PathBuf::from(".venvs"),
            reuse_existing_virtualenvs: true,
            default: vec!["ls".to_string()],
            pythons: ["3.10", "3.9", "3.8", "3.7"].map(String::from).to_vec(),
            djangos: vec!["3.2.16".to_string()],
            drfs: vec!["3.14.0".to_string()],
        }
    }
}

impl SessionsSection {
    pub fn envdir_in(&self, root: &Path) -> PathBuf {
        if self.envdir.is_absolute() {
            self.envdir.clone()
        } else {
            root.join(&self.envdir)
        }
    }
}

pub fn load() -> Result<DevConfig> {
    let path_override = std::env::var(CONFIG_ENV).ok();
    load_from(path_override.as_deref())
}

pub fn load_from(path_override: Option<&str>) -> Result<DevConfig> {
    let Some(path) = config_path_override(path_override) else {
        return Ok(DevConfig::default());
    };

    if !path.exists() {
        return Ok(DevConfig::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: DevConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

fn config_path_override(path_override: Option<&str>) -> Option<PathBuf> {
    if let Some(raw) = path_override {
        return Some(PathBuf::from(raw));
    }
    config_path()
}

/// Project-local config wins over the per-user one.
pub fn config_path() -> Option<PathBuf> {
    let local = paths::project_directory().join(PROJECT_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir().map(|mut dir| {
        dir.push("drf-stubs-dev");
        dir.push("config.toml");
        dir
    })
}
