//! # External Tool Adapters
//!
//! Besides git, a backup session shells out to two tools:
//!
//! - **ometastore** records permissions, ownership and extended attributes of
//!   every tracked path into `.ometastore` and replays them on restore.
//! - **rsync** mirrors the internal store (`.git/`) of each embedded
//!   repository into the backup store.
//!
//! Both sit behind small traits so the orchestration code can be exercised
//! in tests without the real executables installed. [`Ometastore`] and
//! [`Rsync`] are the implementations used by the binary.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::error::{Error, Result};
use crate::git::{spawn_error, Git};

/// Capture and replay of file metadata for a tracked tree.
pub trait MetadataTool {
    /// (Re)write the metadata snapshot at the root of the work tree.
    fn capture(&self, git: &Git) -> Result<()>;

    /// Re-apply the metadata snapshot onto the work tree.
    ///
    /// Must be idempotent: applying twice gives the same result.
    fn apply(&self, git: &Git) -> Result<()>;
}

/// Mirroring of one directory onto another.
pub trait MirrorTool {
    /// Make `destination` a copy of `source`. On failure the previous state
    /// of `destination` must still be consistent.
    fn mirror(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// The `ometastore` executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ometastore;

impl Ometastore {
    fn run(&self, git: &Git, args: &[&str]) -> Result<()> {
        let mut command = Command::new("ometastore");
        command
            .args(args)
            .current_dir(git.work_tree())
            .env("GIT_DIR", git.git_dir())
            .env("GIT_WORK_TREE", git.work_tree());
        debug!("running {:?}", command);
        let output = command.output().map_err(|e| spawn_error("ometastore", e))?;
        check("ometastore", &output)
    }
}

impl MetadataTool for Ometastore {
    fn capture(&self, git: &Git) -> Result<()> {
        self.run(git, &["-x", "-s", "-i", "--sort"])
    }

    fn apply(&self, git: &Git) -> Result<()> {
        self.run(git, &["-v", "-x", "-a", "-i"])
    }
}

/// The `rsync` executable, with delete-after and delay-updates so that a
/// failed transfer leaves the previous mirror intact.
#[derive(Debug, Default, Clone, Copy)]
pub struct Rsync;

impl MirrorTool for Rsync {
    fn mirror(&self, source: &Path, destination: &Path) -> Result<()> {
        fs::create_dir_all(destination)?;

        let mut command = Command::new("rsync");
        command
            .args(["-rltD", "--delete-after", "--delay-updates"])
            .arg(with_trailing_slash(source))
            .arg(with_trailing_slash(destination));
        debug!("running {:?}", command);
        let output = command.output().map_err(|e| spawn_error("rsync", e))?;
        check("rsync", &output)
    }
}

/// Append a `/` so rsync copies directory contents rather than the
/// directory itself.
fn with_trailing_slash(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_os_string();
    if !s.to_string_lossy().ends_with('/') {
        s.push("/");
    }
    s
}

fn check(tool: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    Err(Error::Tool {
        tool: tool.to_string(),
        message: if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        },
    })
}
