//! Fixtures shared by the unit tests: a throwaway work tree with a store
//! next to it, plus helpers to fill both.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use crate::error::Result;
use crate::git::Git;
use crate::guard;
use crate::tools::{MetadataTool, MirrorTool};

/// Whether a usable `git` is on `PATH`. Tests that need it return early
/// otherwise.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A work tree at `<tmp>/work` with its store at `<tmp>/store.git`.
pub struct TestStore {
    pub root: TempDir,
    pub git: Git,
}

impl TestStore {
    pub fn uninitialized() -> Self {
        let root = TempDir::new().unwrap();
        let work = root.path().join("work");
        fs::create_dir(&work).unwrap();
        let work = fs::canonicalize(work).unwrap();
        let store = fs::canonicalize(root.path()).unwrap().join("store.git");
        Self {
            root,
            git: Git::new(store, work),
        }
    }

    pub fn initialized() -> Self {
        let store = Self::uninitialized();
        guard::prepare_store(&store.git).unwrap();
        store.git.set_head("master").unwrap();
        store.git.config_set("user.name", "Test User").unwrap();
        store.git.config_set("user.email", "test@example.com").unwrap();
        store.git.config_set("commit.gpgsign", "false").unwrap();
        store
    }

    pub fn work(&self) -> &Path {
        self.git.work_tree()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.work().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn commit_file(&self, relative: &str, content: &str) {
        self.write(relative, content);
        self.git.add_force(&[PathBuf::from(relative)]).unwrap();
        self.git.commit("test commit").unwrap();
    }

    /// Create a non-bare repository with one commit at `relative`.
    pub fn embedded_repository(&self, relative: &str) -> PathBuf {
        let path = self.work().join(relative);
        fs::create_dir_all(&path).unwrap();
        embedded_git(&path, &["init", "--quiet"]);
        fs::write(path.join("README"), relative).unwrap();
        embedded_git(&path, &["add", "README"]);
        embedded_git(&path, &["commit", "--quiet", "-m", "embedded"]);
        path
    }

    /// Commit `file` with `content` inside the embedded repository at
    /// `relative`, returning the new commit id.
    pub fn commit_in_embedded(&self, relative: &str, file: &str, content: &str) -> String {
        let path = self.work().join(relative);
        fs::write(path.join(file), content).unwrap();
        embedded_git(&path, &["add", file]);
        embedded_git(&path, &["commit", "--quiet", "-m", "more work"]);
        embedded_git(&path, &["rev-parse", "HEAD"]).trim().to_string()
    }
}

fn embedded_git(path: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(path)
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE")
        .output()
        .unwrap();
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8(output.stdout).unwrap()
}

/// Metadata tool stand-in that writes a fixed `.ometastore`.
#[derive(Default)]
pub struct FakeMetadata;

impl MetadataTool for FakeMetadata {
    fn capture(&self, git: &Git) -> Result<()> {
        fs::write(
            git.work_tree().join(crate::defaults::METADATA_FILENAME),
            "fake metadata\n",
        )?;
        Ok(())
    }

    fn apply(&self, _git: &Git) -> Result<()> {
        Ok(())
    }
}

/// Mirror tool stand-in that copies files with std::fs.
#[derive(Default)]
pub struct CopyMirror;

impl MirrorTool for CopyMirror {
    fn mirror(&self, source: &Path, destination: &Path) -> Result<()> {
        if destination.exists() {
            fs::remove_dir_all(destination)?;
        }
        copy_tree(source, destination)
    }
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}
