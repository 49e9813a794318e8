use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::{Registry, SessionInstance, Step};
use crate::config::DevConfig;
use crate::util::process::{self, CommandSpec};

#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub stop_on_first_error: bool,
    pub posargs: Vec<String>,
}

#[derive(Debug)]
pub enum SessionOutcome {
    Success,
    Failed(anyhow::Error),
    Skipped,
}

/// Executes sessions one after another against a project root.
pub struct SessionRunner<'a> {
    registry: &'a Registry,
    root: PathBuf,
    envdir: PathBuf,
    reuse_virtualenvs: bool,
    python_override: Option<PathBuf>,
    defaults: Vec<String>,
}

/// What a single step turns into once a session's environment is known.
#[derive(Clone, Debug)]
pub enum Action {
    Command(CommandSpec),
    ListSessions,
}

impl<'a> SessionRunner<'a> {
    pub fn new(registry: &'a Registry, root: &Path, config: &DevConfig) -> Self {
        Self {
            registry,
            root: root.to_path_buf(),
            envdir: config.sessions.envdir_in(root),
            reuse_virtualenvs: config.sessions.reuse_existing_virtualenvs,
            python_override: config.tools.python.path.clone(),
            defaults: config.sessions.default.clone(),
        }
    }

    pub fn virtualenv_dir(&self, session: &SessionInstance) -> Option<PathBuf> {
        session
            .python
            .as_ref()
            .map(|_| self.envdir.join(slug(&session.name)))
    }

    /// Translate a session's steps into concrete actions.
    pub fn plan(&self, session: &SessionInstance, posargs: &[String]) -> Result<Vec<Action>> {
        let venv = self.virtualenv_dir(session);
        session
            .steps(posargs)?
            .into_iter()
            .map(|step| match step {
                Step::ListSessions => Ok(Action::ListSessions),
                Step::Install(args) => {
                    let Some(venv) = venv.as_ref() else {
                        bail!(
                            "session `{}` has no virtualenv to install into",
                            session.name
                        );
                    };
                    Ok(Action::Command(
                        CommandSpec::new(venv_bin(venv).join(exe("python")))
                            .args(["-m", "pip", "install"])
                            .args(args)
                            .current_dir(&self.root),
                    ))
                }
                Step::Run(argv) => {
                    let Some((program, args)) = argv.split_first() else {
                        bail!("session `{}` has an empty command", session.name);
                    };
                    let mut spec = match venv.as_ref() {
                        Some(venv) => {
                            let bin = venv_bin(venv);
                            let local = bin.join(exe(program));
                            let program = if local.exists() {
                                local.into_os_string()
                            } else {
                                OsString::from(program)
                            };
                            CommandSpec::new(program)
                                .env("PATH", prepend_path(&bin)?)
                                .env("VIRTUAL_ENV", venv)
                        }
                        None => CommandSpec::new(program),
                    };
                    spec = spec.args(args).current_dir(&self.root);
                    Ok(Action::Command(spec))
                }
            })
            .collect()
    }

    /// Run each session, collecting outcomes. Later sessions still run after
    /// a failure unless `stop_on_first_error` is set; those are `Skipped`.
    pub fn run_all(
        &self,
        sessions: &[&SessionInstance],
        options: &RunOptions,
    ) -> Vec<(String, SessionOutcome)> {
        let mut outcomes = Vec::with_capacity(sessions.len());
        let mut stopped = false;
        for session in sessions {
            if stopped {
                outcomes.push((session.name.clone(), SessionOutcome::Skipped));
                continue;
            }
            println!("xtask > Running session {}", session.name);
            let outcome = match self.run_one(session, options) {
                Ok(()) => {
                    println!("xtask > Session {} was successful.", session.name);
                    SessionOutcome::Success
                }
                Err(error) => {
                    println!("xtask > Session {} failed: {error:#}", session.name);
                    stopped = options.stop_on_first_error;
                    SessionOutcome::Failed(error)
                }
            };
            outcomes.push((session.name.clone(), outcome));
        }
        outcomes
    }

    pub fn run_one(&self, session: &SessionInstance, options: &RunOptions) -> Result<()> {
        let actions = self.plan(session, &options.posargs)?;
        if options.dry_run {
            for action in &actions {
                match action {
                    Action::Command(spec) => println!("xtask > {}", spec.display()),
                    Action::ListSessions => println!("xtask > (list sessions)"),
                }
            }
            return Ok(());
        }

        if let (Some(python), Some(venv)) = (&session.python, self.virtualenv_dir(session)) {
            self.ensure_virtualenv(python, &venv)?;
        }
        for action in actions {
            match action {
                Action::ListSessions => print!("{}", self.registry.listing(&self.defaults)),
                Action::Command(spec) => {
                    println!("xtask > {}", spec.display());
                    process::run_checked(&spec)?;
                }
            }
        }
        Ok(())
    }

    fn ensure_virtualenv(&self, python: &str, venv: &Path) -> Result<()> {
        if venv.exists() {
            if self.reuse_virtualenvs {
                tracing::info!(venv = %venv.display(), "re-using existing virtual environment");
                return Ok(());
            }
            fs::remove_dir_all(venv)
                .with_context(|| format!("failed to remove {}", venv.display()))?;
        }
        let interpreter = self.interpreter(python)?;
        println!(
            "xtask > Creating virtual environment (venv) using python{python} in {}",
            venv.display()
        );
        let spec = CommandSpec::new(interpreter)
            .args(["-m", "venv"])
            .arg(venv)
            .current_dir(&self.root);
        process::run_checked(&spec)
            .with_context(|| format!("failed to create virtualenv for python {python}"))?;
        Ok(())
    }

    fn interpreter(&self, python: &str) -> Result<OsString> {
        if let Some(path) = &self.python_override {
            return Ok(path.clone().into_os_string());
        }
        let name = format!("python{python}");
        which::which(&name)
            .map(PathBuf::into_os_string)
            .with_context(|| format!("interpreter `{name}` not found on PATH"))
    }
}

/// Print a summary and fail when any session failed.
pub fn report(outcomes: &[(String, SessionOutcome)]) -> Result<()> {
    let failed = outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, SessionOutcome::Failed(_)))
        .count();
    println!("xtask > Ran multiple sessions:");
    for (name, outcome) in outcomes {
        let status = match outcome {
            SessionOutcome::Success => "success",
            SessionOutcome::Failed(_) => "failed",
            SessionOutcome::Skipped => "skipped",
        };
        println!("xtask > * {name}: {status}");
    }
    if failed > 0 {
        bail!("{failed} of {} session(s) failed", outcomes.len());
    }
    Ok(())
}

fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '.' {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

fn venv_bin(venv: &Path) -> PathBuf {
    if cfg!(windows) {
        venv.join("Scripts")
    } else {
        venv.join("bin")
    }
}

fn exe(name: &str) -> String {
    if cfg!(windows) && !name.ends_with(".exe") {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn prepend_path(dir: &Path) -> Result<OsString> {
    let current = std::env::var_os("PATH").unwrap_or_default();
    let entries = std::iter::once(dir.to_path_buf()).chain(std::env::split_paths(&current));
    std::env::join_paths(entries).context("failed to build PATH for the virtualenv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Selection, select};
    use tempfile::TempDir;

    fn command(action: &Action) -> &CommandSpec {
        match action {
            Action::Command(spec) => spec,
            Action::ListSessions => panic!("expected a command"),
        }
    }

    #[test]
    fn slugs_are_filesystem_friendly() {
        assert_eq!(
            slug("pytest-3.10(django='3.2.16', drf='3.14.0')"),
            "pytest-3.10-django-3.2.16-drf-3.14.0"
        );
        assert_eq!(slug("ls"), "ls");
    }

    #[test]
    fn plan_installs_into_session_virtualenv() {
        let config = DevConfig::default();
        let registry = Registry::from_config(&config.sessions);
        let runner = SessionRunner::new(&registry, Path::new("/repo"), &config);
        let session = registry.get("precommit-3.10").unwrap();

        let posargs = ["--hook-stage".to_string(), "manual".to_string()];
        let actions = runner.plan(session, &posargs).unwrap();
        assert_eq!(actions.len(), 4);

        let venv = PathBuf::from("/repo/.venvs/precommit-3.10");
        let install = command(&actions[2]);
        assert_eq!(install.program, venv_bin(&venv).join(exe("python")).into_os_string());
        assert!(install.display().ends_with("-m pip install pre-commit"));
        assert_eq!(install.current_dir.as_deref(), Some(Path::new("/repo")));

        let run = command(&actions[3]);
        assert!(
            run.display()
                .ends_with("python -m pre_commit run --all-files --hook-stage manual")
        );
        assert!(run.env.iter().any(|(key, value)| key == "VIRTUAL_ENV"
            && Path::new(value) == venv.as_path()));
    }

    #[test]
    fn ls_plans_a_listing_without_virtualenv() {
        let config = DevConfig::default();
        let registry = Registry::from_config(&config.sessions);
        let runner = SessionRunner::new(&registry, Path::new("/repo"), &config);
        let session = registry.get("ls").unwrap();
        assert!(runner.virtualenv_dir(session).is_none());
        let actions = runner.plan(session, &[]).unwrap();
        assert!(matches!(actions.as_slice(), [Action::ListSessions]));
    }

    #[test]
    fn dry_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let config = DevConfig::default();
        let registry = Registry::from_config(&config.sessions);
        let runner = SessionRunner::new(&registry, temp.path(), &config);
        let selection = Selection {
            names: vec!["pytest".into()],
            ..Selection::default()
        };
        let sessions = select(&registry, &selection, &[]).unwrap();
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };

        let outcomes = runner.run_all(&sessions, &options);
        assert_eq!(outcomes.len(), 4);
        assert!(
            outcomes
                .iter()
                .all(|(_, outcome)| matches!(outcome, SessionOutcome::Success))
        );
        assert!(!temp.path().join(".venvs").exists());
        report(&outcomes).unwrap();
    }

    #[test]
    fn failures_are_reported_and_can_stop_the_run() {
        let temp = TempDir::new().unwrap();
        let mut config = DevConfig::default();
        config.tools.python.path = Some(temp.path().join("no-such-python"));
        let registry = Registry::from_config(&config.sessions);
        let runner = SessionRunner::new(&registry, temp.path(), &config);
        let selection = Selection {
            names: vec!["build".into(), "release".into()],
            ..Selection::default()
        };
        let sessions = select(&registry, &selection, &[]).unwrap();
        let options = RunOptions {
            stop_on_first_error: true,
            ..RunOptions::default()
        };

        let outcomes = runner.run_all(&sessions, &options);
        assert!(matches!(outcomes[0].1, SessionOutcome::Failed(_)));
        assert!(matches!(outcomes[1].1, SessionOutcome::Skipped));
        let err = report(&outcomes).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 session(s) failed");
    }
}
