//! Named, parameterised automation sessions.
//!
//! A [`SessionDef`] is a recipe plus the axes it is multiplied over (python
//! version and named parameters). [`Registry::expand`] turns definitions into
//! concrete [`SessionInstance`]s, one per combination, which the runner then
//! executes step by step.

pub mod definitions;
pub mod runner;
pub mod select;

use std::fmt::Write as _;

use anyhow::{Result, anyhow};

use crate::cli::SessionArgs;
use crate::config::{self, SessionsSection};
use crate::paths;

pub use runner::{RunOptions, SessionOutcome, SessionRunner, report};
pub use select::{Selection, select};

/// One recorded action of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// `pip install <args>` into the session virtualenv.
    Install(Vec<String>),
    /// Run a command from the project root.
    Run(Vec<String>),
    /// Print the available sessions.
    ListSessions,
}

pub type Recipe = fn(&mut SessionCtx<'_>) -> Result<()>;

#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: &'static str,
    pub values: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SessionDef {
    pub name: &'static str,
    pub description: &'static str,
    /// Interpreters to create virtualenvs for; empty runs in the runner's own environment.
    pub pythons: Vec<String>,
    pub tags: &'static [&'static str],
    pub parameters: Vec<Parameter>,
    pub recipe: Recipe,
}

#[derive(Clone, Debug)]
pub struct SessionInstance {
    pub base: &'static str,
    pub name: String,
    pub description: &'static str,
    pub python: Option<String>,
    pub tags: &'static [&'static str],
    pub params: Vec<(String, String)>,
    recipe: Recipe,
}

impl SessionInstance {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(&tag)
    }

    /// Record the steps this session would perform.
    pub fn steps(&self, posargs: &[String]) -> Result<Vec<Step>> {
        let mut ctx = SessionCtx {
            session: &self.name,
            params: &self.params,
            posargs,
            steps: Vec::new(),
        };
        (self.recipe)(&mut ctx)?;
        Ok(ctx.steps)
    }
}

/// Handed to recipes; collects steps instead of executing them.
pub struct SessionCtx<'a> {
    session: &'a str,
    params: &'a [(String, String)],
    posargs: &'a [String],
    steps: Vec<Step>,
}

impl SessionCtx<'_> {
    pub fn param(&self, name: &str) -> Result<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| anyhow!("session `{}` has no parameter `{name}`", self.session))
    }

    pub fn install<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .push(Step::Install(args.into_iter().map(Into::into).collect()));
    }

    pub fn run<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.steps
            .push(Step::Run(args.into_iter().map(Into::into).collect()));
    }

    /// Like [`run`](Self::run), with the invocation's positional arguments appended.
    pub fn run_with_posargs<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv: Vec<String> = args.into_iter().map(Into::into).collect();
        argv.extend(self.posargs.iter().cloned());
        self.steps.push(Step::Run(argv));
    }

    pub fn list_sessions(&mut self) {
        self.steps.push(Step::ListSessions);
    }
}

#[derive(Clone, Debug, Default)]
pub struct Registry {
    sessions: Vec<SessionInstance>,
}

impl Registry {
    pub fn from_config(config: &SessionsSection) -> Self {
        Self::expand(definitions::definitions(config))
    }

    /// Multiply every definition over its pythons and parameter values.
    pub fn expand(defs: Vec<SessionDef>) -> Self {
        let mut sessions = Vec::new();
        for def in defs {
            let pythons: Vec<Option<String>> = if def.pythons.is_empty() {
                vec![None]
            } else {
                def.pythons.iter().cloned().map(Some).collect()
            };
            let combos = cross_product(&def.parameters);
            for python in &pythons {
                for params in &combos {
                    sessions.push(SessionInstance {
                        base: def.name,
                        name: instance_name(def.name, python.as_deref(), params),
                        description: def.description,
                        python: python.clone(),
                        tags: def.tags,
                        params: params.clone(),
                        recipe: def.recipe,
                    });
                }
            }
        }
        Self { sessions }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionInstance> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SessionInstance> {
        self.sessions.iter().find(|session| session.name == name)
    }

    /// One line per session; `*` marks sessions run by default.
    pub fn listing(&self, defaults: &[String]) -> String {
        let mut out = String::from("Sessions defined in this workspace:\n\n");
        for session in &self.sessions {
            let marker = if defaults
                .iter()
                .any(|name| name == session.base || *name == session.name)
            {
                '*'
            } else {
                '-'
            };
            let _ = writeln!(out, "{marker} {} -> {}", session.name, session.description);
        }
        out.push_str(
            "\nsessions marked with * are selected, sessions marked with - are skipped.\n",
        );
        out
    }
}

/// Entry point behind `cargo xtask`.
pub fn run_cli(args: SessionArgs) -> Result<()> {
    let config = config::load()?;
    let registry = Registry::from_config(&config.sessions);
    if args.list {
        print!("{}", registry.listing(&config.sessions.default));
        return Ok(());
    }

    let selection = Selection {
        names: args.sessions,
        tags: args.tags,
        pythons: args.pythons,
    };
    let sessions = select(&registry, &selection, &config.sessions.default)?;
    let runner = SessionRunner::new(&registry, paths::project_directory(), &config);
    let options = RunOptions {
        dry_run: args.dry_run,
        stop_on_first_error: args.stop_on_first_error,
        posargs: args.posargs,
    };
    let outcomes = runner.run_all(&sessions, &options);
    report(&outcomes)
}

fn cross_product(parameters: &[Parameter]) -> Vec<Vec<(String, String)>> {
    let mut combos: Vec<Vec<(String, String)>> = vec![Vec::new()];
    for parameter in parameters {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                parameter.values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push((parameter.name.to_string(), value.clone()));
                    next
                })
            })
            .collect();
    }
    combos
}

fn instance_name(base: &str, python: Option<&str>, params: &[(String, String)]) -> String {
    let mut name = base.to_string();
    if let Some(python) = python {
        name.push('-');
        name.push_str(python);
    }
    if !params.is_empty() {
        let rendered = params
            .iter()
            .map(|(key, value)| format!("{key}='{value}'"))
            .collect::<Vec<_>>()
            .join(", ");
        name.push('(');
        name.push_str(&rendered);
        name.push(')');
    }
    name
}
