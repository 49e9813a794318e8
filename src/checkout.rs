use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use git2::build::CheckoutBuilder;
use git2::{FetchOptions, Oid, RemoteCallbacks, Repository};

use crate::config::{
    CheckoutSection, DEFAULT_BRANCH, DEFAULT_CLONE_DEPTH, DRF_REPOSITORY_URL,
};

#[derive(Clone, Debug)]
pub struct CheckoutOptions {
    pub url: String,
    pub default_branch: String,
    /// Commits of history to fetch; zero or less fetches everything.
    pub depth: i32,
}

impl Default for CheckoutOptions {
    fn default() -> Self {
        Self {
            url: DRF_REPOSITORY_URL.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            depth: DEFAULT_CLONE_DEPTH,
        }
    }
}

impl From<&CheckoutSection> for CheckoutOptions {
    fn from(section: &CheckoutSection) -> Self {
        Self {
            url: section.url.clone(),
            default_branch: section.default_branch.clone(),
            depth: section.depth,
        }
    }
}

/// A progress event emitted while fetching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloneProgress {
    /// Free-form text sent by the remote (counting, compressing objects).
    Remote(String),
    Transfer {
        received_objects: usize,
        total_objects: usize,
        indexed_deltas: usize,
        total_deltas: usize,
        received_bytes: usize,
    },
}

impl CloneProgress {
    fn from_stats(stats: &git2::Progress<'_>) -> Self {
        CloneProgress::Transfer {
            received_objects: stats.received_objects(),
            total_objects: stats.total_objects(),
            indexed_deltas: stats.indexed_deltas(),
            total_deltas: stats.total_deltas(),
            received_bytes: stats.received_bytes(),
        }
    }

    /// The line a terminal would currently show for this event.
    pub fn status_line(&self) -> String {
        match self {
            CloneProgress::Remote(text) => text.trim().to_string(),
            CloneProgress::Transfer {
                received_objects,
                total_objects,
                indexed_deltas,
                total_deltas,
                received_bytes,
            } => {
                if *total_deltas > 0 && received_objects == total_objects {
                    format!(
                        "Resolving deltas: {}% ({indexed_deltas}/{total_deltas})",
                        percent(*indexed_deltas, *total_deltas)
                    )
                } else {
                    format!(
                        "Receiving objects: {}% ({received_objects}/{total_objects}), {} KiB",
                        percent(*received_objects, *total_objects),
                        received_bytes / 1024
                    )
                }
            }
        }
    }
}

fn percent(done: usize, total: usize) -> usize {
    if total == 0 { 100 } else { done * 100 / total }
}

/// Writes progress to stdout as it arrives. Remote text is printed line by
/// line; transfer updates are printed only when the status line changes.
pub struct ProgressPrinter<W: Write = io::Stdout> {
    out: W,
    last_status: Option<String>,
}

impl ProgressPrinter {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ProgressPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_status: None,
        }
    }

    pub fn handle(&mut self, progress: CloneProgress) {
        match &progress {
            CloneProgress::Remote(text) => {
                for line in text.split(['\r', '\n']).map(str::trim).filter(|l| !l.is_empty()) {
                    let _ = writeln!(self.out, "{line}");
                }
            }
            CloneProgress::Transfer { .. } => {
                let line = progress.status_line();
                if self.last_status.as_deref() != Some(line.as_str()) {
                    let _ = writeln!(self.out, "{line}");
                    self.last_status = Some(line);
                }
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutTarget {
    Branch(String),
    Tag(String),
}

#[derive(Debug)]
pub struct CheckoutReport {
    pub target: CheckoutTarget,
    pub commit: Oid,
}

/// Wipe `dest` and fill it with a fresh clone of `version` (a branch or tag
/// on the remote), or of the default branch when no version is given.
///
/// The old directory is removed without confirmation. A failed fetch leaves
/// whatever was written so far in place.
pub fn checkout_target_tag(
    dest: &Path,
    version: Option<&str>,
    options: &CheckoutOptions,
    on_progress: &mut dyn FnMut(CloneProgress),
) -> Result<CheckoutReport> {
    reset_directory(dest)?;

    let target = version
        .filter(|v| !v.is_empty())
        .unwrap_or(&options.default_branch);
    tracing::info!(url = %options.url, version = target, depth = options.depth, "cloning");

    let repo = Repository::init(dest)
        .with_context(|| format!("failed to initialise repository at {}", dest.display()))?;
    fetch_target(&repo, target, options, on_progress)?;
    let report = check_out(&repo, target)
        .with_context(|| format!("failed to check out `{target}` from {}", options.url))?;
    tracing::info!(commit = %report.commit, "checked out {target}");
    Ok(report)
}

fn reset_directory(dest: &Path) -> Result<()> {
    if dest.exists() {
        fs::remove_dir_all(dest)
            .with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::create_dir(dest).with_context(|| format!("failed to create {}", dest.display()))
}

fn fetch_target(
    repo: &Repository,
    target: &str,
    options: &CheckoutOptions,
    on_progress: &mut dyn FnMut(CloneProgress),
) -> Result<()> {
    let sink = RefCell::new(on_progress);
    let mut callbacks = RemoteCallbacks::new();
    callbacks.sideband_progress(|data| {
        let text = String::from_utf8_lossy(data).into_owned();
        let mut handler = sink.borrow_mut();
        (*handler)(CloneProgress::Remote(text));
        true
    });
    callbacks.transfer_progress(|stats| {
        let mut handler = sink.borrow_mut();
        (*handler)(CloneProgress::from_stats(&stats));
        true
    });

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);
    if options.depth > 0 {
        fetch.depth(options.depth);
    }

    let mut remote = repo
        .remote("origin", &options.url)
        .with_context(|| format!("invalid remote url {}", options.url))?;
    let refspecs = [
        format!("+refs/heads/{target}:refs/remotes/origin/{target}"),
        format!("+refs/tags/{target}:refs/tags/{target}"),
    ];
    remote
        .fetch(&refspecs, Some(&mut fetch), Some("clone"))
        .with_context(|| format!("failed to clone {}", options.url))?;
    Ok(())
}

fn check_out(repo: &Repository, target: &str) -> Result<CheckoutReport> {
    let mut force = CheckoutBuilder::new();
    force.force();

    if let Ok(remote_branch) = repo.find_reference(&format!("refs/remotes/origin/{target}")) {
        let commit = remote_branch.peel_to_commit()?;
        let mut branch = repo.branch(target, &commit, false)?;
        branch.set_upstream(Some(format!("origin/{target}").as_str()))?;
        repo.checkout_tree(commit.as_object(), Some(&mut force))?;
        repo.set_head(&format!("refs/heads/{target}"))?;
        return Ok(CheckoutReport {
            target: CheckoutTarget::Branch(target.to_string()),
            commit: commit.id(),
        });
    }

    if let Ok(tag) = repo.find_reference(&format!("refs/tags/{target}")) {
        let commit = tag.peel_to_commit()?;
        repo.checkout_tree(commit.as_object(), Some(&mut force))?;
        repo.set_head_detached(commit.id())?;
        return Ok(CheckoutReport {
            target: CheckoutTarget::Tag(target.to_string()),
            commit: commit.id(),
        });
    }

    bail!("remote branch or tag `{target}` not found");
}
