use anyhow::Result;

use super::{Parameter, SessionCtx, SessionDef};
use crate::config::SessionsSection;

pub const DEV: &str = "dev";
pub const TEST: &str = "test";

pub fn definitions(config: &SessionsSection) -> Vec<SessionDef> {
    let all_pythons = config.pythons.clone();
    let default_python: Vec<String> = config.pythons.iter().take(1).cloned().collect();
    let matrix = || {
        vec![
            Parameter {
                name: "django",
                values: config.djangos.clone(),
            },
            Parameter {
                name: "drf",
                values: config.drfs.clone(),
            },
        ]
    };

    vec![
        SessionDef {
            name: "ls",
            description: "list available sessions",
            pythons: Vec::new(),
            tags: &[],
            parameters: Vec::new(),
            recipe: ls,
        },
        SessionDef {
            name: "precommit",
            description: "run pre-commit hooks on all files",
            pythons: default_python.clone(),
            tags: &[DEV],
            parameters: Vec::new(),
            recipe: precommit,
        },
        SessionDef {
            name: "pytest",
            description: "run pytest test suite",
            pythons: all_pythons.clone(),
            tags: &[DEV, TEST],
            parameters: matrix(),
            recipe: pytest,
        },
        SessionDef {
            name: "typecheck",
            description: "run typecheck tests",
            pythons: all_pythons,
            tags: &[DEV, TEST],
            parameters: matrix(),
            recipe: typecheck,
        },
        SessionDef {
            name: "build",
            description: "build a distribution",
            pythons: default_python.clone(),
            tags: &[],
            parameters: Vec::new(),
            recipe: build,
        },
        SessionDef {
            name: "release",
            description: "release a distribution",
            pythons: default_python,
            tags: &[],
            parameters: Vec::new(),
            recipe: release,
        },
    ]
}

/// Tooling every virtualenv session needs before its own packages.
fn setup(ctx: &mut SessionCtx<'_>) {
    ctx.install(["--upgrade", "setuptools", "wheel"]);
    ctx.install(["-r", "requirements.txt"]);
}

fn ls(ctx: &mut SessionCtx<'_>) -> Result<()> {
    ctx.list_sessions();
    Ok(())
}

fn precommit(ctx: &mut SessionCtx<'_>) -> Result<()> {
    setup(ctx);
    ctx.install(["pre-commit"]);
    ctx.run_with_posargs(["python", "-m", "pre_commit", "run", "--all-files"]);
    Ok(())
}

fn install_frameworks(ctx: &mut SessionCtx<'_>) -> Result<String> {
    let django = format!("django=={}", ctx.param("django")?);
    let drf = ctx.param("drf")?.to_string();
    ctx.install([django]);
    ctx.install([format!("djangorestframework=={drf}")]);
    Ok(drf)
}

fn pytest(ctx: &mut SessionCtx<'_>) -> Result<()> {
    setup(ctx);
    install_frameworks(ctx)?;
    ctx.install(["pytest"]);
    ctx.run_with_posargs(["python", "-m", "pytest"]);
    Ok(())
}

fn typecheck(ctx: &mut SessionCtx<'_>) -> Result<()> {
    setup(ctx);
    let drf = install_frameworks(ctx)?;
    ctx.run([
        "python".to_string(),
        "scripts/typecheck_tests.py".to_string(),
        "--drf_version".to_string(),
        drf,
    ]);
    Ok(())
}

fn build(ctx: &mut SessionCtx<'_>) -> Result<()> {
    setup(ctx);
    ctx.run(["python", "setup.py", "check", "sdist", "bdist_wheel"]);
    Ok(())
}

fn release(ctx: &mut SessionCtx<'_>) -> Result<()> {
    setup(ctx);
    ctx.install(["--upgrade", "twine"]);
    ctx.run(["./scripts/release.sh"]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Registry, Step};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_matrix_expands_to_expected_sessions() {
        let registry = Registry::from_config(&SessionsSection::default());
        // ls + precommit + 4 pytest + 4 typecheck + build + release
        assert_eq!(registry.len(), 12);
        assert!(registry.get("ls").is_some());
        assert!(registry.get("precommit-3.10").is_some());
        assert!(registry.get("precommit-3.9").is_none());
        assert!(
            registry
                .get("pytest-3.7(django='3.2.16', drf='3.14.0')")
                .is_some()
        );
        assert!(registry.get("release-3.10").is_some());
    }

    #[test]
    fn pytest_installs_pinned_frameworks() {
        let registry = Registry::from_config(&SessionsSection::default());
        let session = registry
            .get("pytest-3.9(django='3.2.16', drf='3.14.0')")
            .unwrap();
        let steps = session.steps(&strings(&["-x"])).unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Install(strings(&["--upgrade", "setuptools", "wheel"])),
                Step::Install(strings(&["-r", "requirements.txt"])),
                Step::Install(strings(&["django==3.2.16"])),
                Step::Install(strings(&["djangorestframework==3.14.0"])),
                Step::Install(strings(&["pytest"])),
                Step::Run(strings(&["python", "-m", "pytest", "-x"])),
            ]
        );
    }

    #[test]
    fn typecheck_passes_drf_version_and_ignores_posargs() {
        let registry = Registry::from_config(&SessionsSection::default());
        let session = registry
            .get("typecheck-3.10(django='3.2.16', drf='3.14.0')")
            .unwrap();
        let steps = session.steps(&strings(&["ignored"])).unwrap();
        assert_eq!(
            steps.last(),
            Some(&Step::Run(strings(&[
                "python",
                "scripts/typecheck_tests.py",
                "--drf_version",
                "3.14.0"
            ])))
        );
    }

    #[test]
    fn ls_only_lists() {
        let registry = Registry::from_config(&SessionsSection::default());
        let steps = registry.get("ls").unwrap().steps(&[]).unwrap();
        assert_eq!(steps, vec![Step::ListSessions]);
    }

    #[test]
    fn release_upgrades_twine_then_runs_script() {
        let registry = Registry::from_config(&SessionsSection::default());
        let steps = registry.get("release-3.10").unwrap().steps(&[]).unwrap();
        assert_eq!(
            &steps[2..],
            &[
                Step::Install(strings(&["--upgrade", "twine"])),
                Step::Run(strings(&["./scripts/release.sh"])),
            ]
        );
    }

    #[test]
    fn tags_group_sessions() {
        let registry = Registry::from_config(&SessionsSection::default());
        let test_sessions: Vec<_> = registry.iter().filter(|s| s.has_tag(TEST)).collect();
        assert_eq!(test_sessions.len(), 8);
        assert!(registry.get("precommit-3.10").unwrap().has_tag(DEV));
        assert!(!registry.get("build-3.10").unwrap().has_tag(DEV));
    }
}
