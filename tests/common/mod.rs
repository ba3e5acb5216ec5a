//! Shared test utilities for the CLI end-to-end tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let Some(fixture) = TestFixture::with_git() else { return };
//!     fixture.gib().arg("init").assert().success();
//! }
//! ```
//!
//! The fixture's backed up directory doubles as `HOME`, so `gib` without
//! `--directory` works on it. `rsync` and `ometastore` are replaced by
//! small shell scripts placed first on `PATH`, so tests only need git.

use std::env;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// Copies the source `.git` into the destination, like the real call does.
const RSYNC_STUB: &str = r#"#!/bin/sh
while [ $# -gt 2 ]; do shift; done
mkdir -p "$2" && cp -R "$1". "$2"
"#;

/// Writes a fixed snapshot on capture and records each apply.
const OMETASTORE_STUB: &str = r#"#!/bin/sh
case " $* " in
  *" -s "*) echo "stub metadata" > "$GIT_WORK_TREE/.ometastore" ;;
  *) echo applied >> "$GIT_DIR/ometastore-applied" ;;
esac
"#;

/// Whether a usable `git` is on `PATH`.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A temporary home directory to back up, plus a directory of stub tools.
pub struct TestFixture {
    root: assert_fs::TempDir,
    home: PathBuf,
    bin: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let root = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let base = fs::canonicalize(root.path()).expect("Failed to canonicalize temp dir");
        let home = base.join("home");
        let bin = base.join("bin");
        fs::create_dir(&home).expect("Failed to create home");
        fs::create_dir(&bin).expect("Failed to create bin");
        write_script(&bin.join("rsync"), RSYNC_STUB);
        write_script(&bin.join("ometastore"), OMETASTORE_STUB);
        Self { root, home, bin }
    }

    /// A fixture, or `None` when git is not installed.
    pub fn with_git() -> Option<Self> {
        if git_available() {
            Some(Self::new())
        } else {
            eprintln!("git not available, skipping");
            None
        }
    }

    /// A fixture on which `gib init` has already run.
    pub fn initialized() -> Option<Self> {
        let fixture = Self::with_git()?;
        fixture.gib().arg("init").assert().success();
        Some(fixture)
    }

    /// The backed up directory (also `HOME`).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// The default store, `<home>/.git`.
    pub fn store(&self) -> PathBuf {
        self.home.join(".git")
    }

    /// A fresh directory next to the backed up one.
    pub fn sibling(&self, name: &str) -> PathBuf {
        let path = self.home.parent().expect("home has a parent").join(name);
        fs::create_dir_all(&path).expect("Failed to create sibling");
        path
    }

    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.root.child("home").child(path)
    }

    pub fn write(&self, path: &str, content: &str) {
        self.child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// `gib` with a clean environment pointing at this fixture.
    pub fn gib(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("gib");
        let path = match env::var_os("PATH") {
            Some(path) => {
                let mut paths = vec![self.bin.clone()];
                paths.extend(env::split_paths(&path));
                env::join_paths(paths).expect("PATH is joinable")
            }
            None => self.bin.clone().into_os_string(),
        };
        cmd.current_dir(&self.home)
            .env("PATH", path)
            .env("HOME", &self.home)
            .env("GIT_AUTHOR_NAME", "Test User")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "Test User")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_CONFIG_COUNT", "1")
            .env("GIT_CONFIG_KEY_0", "commit.gpgsign")
            .env("GIT_CONFIG_VALUE_0", "false")
            .env("NO_COLOR", "1")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIB_DIRECTORY")
            .env_remove("GIB_GIT_DIRECTORY")
            .env_remove("GIB_BRANCH")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run git directly against the default store.
    pub fn store_git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg(format!("--git-dir={}", self.store().display()))
            .arg(format!("--work-tree={}", self.home.display()))
            .args(args)
            .current_dir(&self.home)
            .env_remove("GIT_DIR")
            .output()
            .expect("git runs");
        assert!(output.status.success(), "git {:?} failed", args);
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// A non-bare repository with one commit inside the backed up directory.
    pub fn embedded_repository(&self, relative: &str) -> PathBuf {
        let path = self.home.join(relative);
        fs::create_dir_all(&path).expect("Failed to create repository dir");
        fs::write(path.join("README"), relative).expect("Failed to write README");
        embedded_git(&path, &["init", "--quiet"]);
        embedded_git(&path, &["add", "README"]);
        embedded_git(&path, &["commit", "--quiet", "-m", "embedded"]);
        path
    }

    /// Add a commit to the embedded repository at `relative` and return its id.
    pub fn embedded_commit(&self, relative: &str, file: &str, content: &str) -> String {
        let path = self.home.join(relative);
        fs::write(path.join(file), content).expect("Failed to write file");
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
        .expect("git runs");
    assert!(output.status.success(), "git {:?} failed", args);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_script(path: &Path, content: &str) {
    fs::write(path, content).expect("Failed to write stub");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("Failed to chmod stub");
}
