use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

pub const STUBS_DIR_NAME: &str = "rest_framework-stubs";
pub const DRF_SOURCE_DIR_NAME: &str = "drf_source";
pub const STUBGEN_TARGET_DIR_NAME: &str = "stubgen";

/// Overrides the project root for the whole process; read once.
pub const PROJECT_DIR_ENV: &str = "DRF_STUBS_PROJECT_DIR";

/// Fixed filesystem locations used by the stub tooling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectPaths {
    pub project: PathBuf,
    pub stubs: PathBuf,
    pub drf_source: PathBuf,
    pub stubgen_target: PathBuf,
}

impl ProjectPaths {
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let project = root.into();
        Self {
            stubs: project.join(STUBS_DIR_NAME),
            drf_source: project.join(DRF_SOURCE_DIR_NAME),
            stubgen_target: project.join(STUBGEN_TARGET_DIR_NAME),
            project,
        }
    }
}

static PATHS: Lazy<ProjectPaths> = Lazy::new(|| {
    let root = std::env::var_os(PROJECT_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    ProjectPaths::from_root(root)
});

pub fn project_paths() -> &'static ProjectPaths {
    &PATHS
}

pub fn project_directory() -> &'static Path {
    &PATHS.project
}

pub fn stubs_directory() -> &'static Path {
    &PATHS.stubs
}

pub fn drf_source_directory() -> &'static Path {
    &PATHS.drf_source
}

pub fn stubgen_target_directory() -> &'static Path {
    &PATHS.stubgen_target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_hangs_off_root() {
        let paths = ProjectPaths::from_root("/work/stubs");
        assert_eq!(paths.project, PathBuf::from("/work/stubs"));
        assert_eq!(paths.drf_source, PathBuf::from("/work/stubs/drf_source"));
        assert_eq!(paths.stubgen_target, PathBuf::from("/work/stubs/stubgen"));
        assert_eq!(
            paths.stubs,
            PathBuf::from("/work/stubs/rest_framework-stubs")
        );
    }

    #[test]
    fn registry_is_stable_within_process() {
        let first = project_paths();
        let second = project_paths();
        assert!(std::ptr::eq(first, second));
        assert_eq!(drf_source_directory(), drf_source_directory());
        assert_eq!(stubgen_target_directory(), first.stubgen_target.as_path());
        assert!(drf_source_directory().starts_with(project_directory()));
        assert!(stubs_directory().starts_with(project_directory()));
    }
}
