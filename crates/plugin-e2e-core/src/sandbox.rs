//! Sandbox provisioning: an isolated, version-controlled copy of a project fixture.
//!
//! Every case gets a fresh copy of its fixture under the run's scratch directory, committed
//! once with a fixed identity so the agent's changes can be diffed against a known baseline.
//! Any failed step aborts provisioning; a sandbox without its baseline commit is never handed
//! to a session.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{HarnessError, Result};
use crate::trace_time;

/// Author and committer of every baseline commit.
pub const GIT_IDENTITY_NAME: &str = "test";
pub const GIT_IDENTITY_EMAIL: &str = "t@t";
/// Message of the single baseline commit.
pub const BASELINE_MESSAGE: &str = "init";

/// A provisioned working copy, owned by exactly one case execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    /// Working directory handed to the session
    pub root: PathBuf,
    /// Fixture the sandbox was copied from
    pub fixture: String,
    /// Commit id of the baseline commit
    pub baseline: String,
    /// SHA-256 digest of the fixture content, see [`tree_digest`]
    pub fixture_digest: String,
}

/// Copy `<fixtures_dir>/<fixture>` into `<scratch_dir>/<fixture>` and commit it.
pub fn provision(fixtures_dir: &Path, fixture: &str, scratch_dir: &Path) -> Result<Sandbox> {
    let start = Instant::now();
    let source = fixtures_dir.join(fixture);
    if !source.is_dir() {
        return Err(HarnessError::FixtureNotFound { path: source });
    }

    let root = scratch_dir.join(fixture);
    if root.exists() {
        return Err(HarnessError::provision(
            "create sandbox",
            root.display(),
            "destination already exists",
        ));
    }
    fs::create_dir_all(&root)
        .map_err(|e| HarnessError::provision("create sandbox", root.display(), e))?;

    copy_tree(&source, &root)?;
    let fixture_digest = tree_digest(&source)?;

    git(&root, &["init", "-q"])?;
    git(&root, &["add", "-A"])?;
    git(
        &root,
        &[
            "commit",
            "-q",
            "--no-gpg-sign",
            "--allow-empty",
            "-m",
            BASELINE_MESSAGE,
        ],
    )?;
    let baseline = git(&root, &["rev-parse", "HEAD"])?.trim().to_string();

    trace_time!(start, "provision", fixture = fixture);
    tracing::debug!(root = %root.display(), %baseline, "sandbox ready");

    Ok(Sandbox {
        root,
        fixture: fixture.to_string(),
        baseline,
        fixture_digest,
    })
}

/// Whether a usable `git` binary is on the PATH.
pub fn is_git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Digest over every file's relative path and content, `.git` excluded, in path order.
///
/// Equal digests mean equal trees, so a fresh sandbox root hashes the same as its fixture.
pub fn tree_digest(root: &Path) -> Result<String> {
    let mut files = Vec::new();
    for entry in walk(root) {
        let entry = entry.map_err(|e| HarnessError::provision("walk", root.display(), e))?;
        if entry.file_type().is_file() {
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            files.push((rel, entry.into_path()));
        }
    }
    files.sort();

    let mut hasher = Sha256::new();
    for (rel, path) in files {
        let content =
            fs::read(&path).map_err(|e| HarnessError::provision("hash", path.display(), e))?;
        hasher.update(rel.as_bytes());
        hasher.update([0u8]);
        hasher.update((content.len() as u64).to_le_bytes());
        hasher.update(&content);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn walk(root: &Path) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
}

fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    for entry in walk(source) {
        let entry = entry.map_err(|e| HarnessError::provision("copy", source.display(), e))?;
        let rel = match entry.path().strip_prefix(source) {
            Ok(rel) if rel.as_os_str().is_empty() => continue,
            Ok(rel) => rel,
            Err(e) => return Err(HarnessError::provision("copy", entry.path().display(), e)),
        };
        let target = dest.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| HarnessError::provision("create", target.display(), e))?;
        } else {
            fs::copy(entry.path(), &target)
                .map_err(|e| HarnessError::provision("copy", entry.path().display(), e))?;
        }
    }
    Ok(())
}

/// Run one git step in `dir` with the fixed identity; non-zero exit is an error.
fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let step = format!("git {}", args.join(" "));
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", GIT_IDENTITY_NAME)
        .env("GIT_AUTHOR_EMAIL", GIT_IDENTITY_EMAIL)
        .env("GIT_COMMITTER_NAME", GIT_IDENTITY_NAME)
        .env("GIT_COMMITTER_EMAIL", GIT_IDENTITY_EMAIL)
        .output()
        .map_err(|e| HarnessError::provision(&step, dir.display(), e))?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(HarnessError::provision(
            &step,
            dir.display(),
            format!("{} ({})", stderr.trim(), out.status),
        ));
    }

    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}
