#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Commit, Oid, Repository, Signature};
use tempfile::TempDir;

pub const DRF_FILES: &[(&str, &str)] = &[
    ("README.md", "# Django REST framework\n"),
    ("rest_framework/__init__.py", "VERSION = '3.15.0'\n"),
    ("rest_framework/fields.py", "class Field: ...\n"),
    ("rest_framework/views.py", "class APIView: ...\n"),
];

/// A local stand-in for the upstream repository.
pub struct Origin {
    pub dir: TempDir,
    pub repo: Repository,
}

impl Origin {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let origin = Self { dir, repo };
        origin.commit("master", DRF_FILES);
        origin
    }

    pub fn url(&self) -> String {
        self.dir.path().to_str().unwrap().to_string()
    }

    pub fn commit(&self, branch: &str, files: &[(&str, &str)]) -> Oid {
        let workdir = self.repo.workdir().unwrap().to_path_buf();
        let mut index = self.repo.index().unwrap();
        index.clear().unwrap();
        for (path, body) in files {
            let full = workdir.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(&full, body).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("Stub Maintainer", "stubs@example.com").unwrap();
        let refname = format!("refs/heads/{branch}");
        let parent = self
            .repo
            .find_reference(&refname)
            .ok()
            .and_then(|r| r.peel_to_commit().ok());
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        self.repo
            .commit(Some(&refname), &signature, &signature, "update", &tree, &parents)
            .unwrap()
    }

    pub fn tag(&self, name: &str, oid: Oid) {
        let object = self.repo.find_object(oid, None).unwrap();
        self.repo.tag_lightweight(name, &object, false).unwrap();
    }
}

/// A project root with a config file pointing the checkout at `origin`.
pub struct Project {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Project {
    pub fn new(origin: &Origin) -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("drf-stubs-dev.toml");
        fs::write(
            &config,
            format!(
                "[checkout]\nurl = \"{}\"\ndepth = 0\n",
                origin.url().replace('\\', "\\\\")
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn drf_source(&self) -> PathBuf {
        self.root().join("drf_source")
    }

    pub fn stubgen_target(&self) -> PathBuf {
        self.root().join("stubgen")
    }
}

/// Writes an executable that mimics `stubgen <pkg> -o=<out>`: one `.pyi`
/// per top-level module of the package.
#[cfg(unix)]
pub fn fake_stubgen(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("stubgen");
    let script = r#"#!/bin/sh
set -e
src="$1"
out="${2#-o=}"
pkg=$(basename "$src")
mkdir -p "$out/$pkg"
for f in "$src"/*.py; do
  name=$(basename "$f" .py)
  printf '# generated\n' > "$out/$pkg/$name.pyi"
done
"#;
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

pub fn files_with_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    if !root.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|e| e == ext))
        .collect();
    files.sort();
    files
}
