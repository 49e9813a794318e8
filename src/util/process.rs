use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use anyhow::{Context, Result, bail};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamMode {
    Inherit,
    Capture,
}

#[derive(Clone, Debug)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub env: Vec<(OsString, OsString)>,
    pub current_dir: Option<PathBuf>,
    pub stdout: StreamMode,
    pub stderr: StreamMode,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
            stdout: StreamMode::Inherit,
            stderr: StreamMode::Inherit,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn capture(mut self) -> Self {
        self.stdout = StreamMode::Capture;
        self.stderr = StreamMode::Capture;
        self
    }

    /// Shell-like rendering for logs and dry runs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(part: &OsStr) -> String {
    let text = part.to_string_lossy();
    if text.is_empty() || text.contains(char::is_whitespace) {
        format!("'{text}'")
    } else {
        text.into_owned()
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
}

impl CommandOutput {
    pub fn ensure_success(&self, spec: &CommandSpec) -> Result<()> {
        if self.status.success() {
            return Ok(());
        }
        if let Some(stderr) = self.stderr.as_ref().filter(|bytes| !bytes.is_empty()) {
            eprintln!("{}", String::from_utf8_lossy(stderr));
        }
        match self.status.code() {
            Some(code) => bail!("`{}` failed with exit code {code}", spec.display()),
            None => bail!("`{}` was terminated by a signal", spec.display()),
        }
    }
}

pub fn run(spec: &CommandSpec) -> Result<CommandOutput> {
    tracing::debug!(command = %spec.display(), "spawning");
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(dir) = &spec.current_dir {
        command.current_dir(dir);
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }

    match (spec.stdout, spec.stderr) {
        (StreamMode::Inherit, StreamMode::Inherit) => {
            command.stdout(Stdio::inherit());
            command.stderr(Stdio::inherit());
            let status = command
                .status()
                .with_context(|| format!("failed to spawn `{}`", spec.program.to_string_lossy()))?;
            Ok(CommandOutput {
                status,
                stdout: None,
                stderr: None,
            })
        }
        (StreamMode::Capture, StreamMode::Capture) => {
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());
            let output = command
                .output()
                .with_context(|| format!("failed to spawn `{}`", spec.program.to_string_lossy()))?;
            Ok(CommandOutput {
                status: output.status,
                stdout: Some(output.stdout),
                stderr: Some(output.stderr),
            })
        }
        _ => bail!("mixed capture/inherit mode is not supported"),
    }
}

/// Runs the command and fails on a non-zero exit.
pub fn run_checked(spec: &CommandSpec) -> Result<CommandOutput> {
    let output = run(spec)?;
    output.ensure_success(spec)?;
    Ok(output)
}
