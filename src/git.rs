//! # Store Adapter
//!
//! All access to the backup store goes through the system `git` executable,
//! always invoked with an explicit `--git-dir` and `--work-tree` because one
//! store is shared by many backed up directories.
//!
//! This module is the only place that parses git's output. Everything above
//! it works with [`TreeEntry`], [`CommitInfo`] and plain paths; read commands
//! use `-z` wherever git offers it so that file names are never mangled.

use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use log::debug;
use regex::Regex;
use semver::Version;

use crate::error::{Error, Result};

/// Maximum number of paths passed to a single git invocation.
const PATHS_PER_INVOCATION: usize = 512;

/// Index/tree mode of a gitlink (submodule reference).
pub const GITLINK_MODE: u32 = 0o160000;
/// Tree mode of a symbolic link.
pub const SYMLINK_MODE: u32 = 0o120000;

/// The type of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

/// One line of `git ls-tree` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: u32,
    pub kind: ObjectKind,
    pub oid: String,
    pub path: PathBuf,
}

/// A commit id with its committer timestamp (seconds since the epoch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub id: String,
    pub timestamp: i64,
}

/// A ref name together with the object it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefInfo {
    pub oid: String,
    pub name: String,
}

/// Outcome of a bulk `git add` that tolerates per-file failures.
#[derive(Debug, Default)]
pub struct AddReport {
    /// One message per file git could not stage.
    pub failures: Vec<String>,
}

/// Handle on the backup store for one work tree.
#[derive(Debug, Clone)]
pub struct Git {
    git_dir: PathBuf,
    work_tree: PathBuf,
}

impl Git {
    pub fn new(git_dir: impl Into<PathBuf>, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            work_tree: work_tree.into(),
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    /// Return the installed git version.
    pub fn version() -> Result<Version> {
        let output = spawn(Command::new("git").arg("--version"))?;
        if !output.status.success() {
            return Err(Error::ToolVersion {
                tool: "git".to_string(),
                message: "'git --version' failed".to_string(),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout);
        parse_version(&text).ok_or_else(|| Error::ToolVersion {
            tool: "git".to_string(),
            message: format!("the version string ('{}') was of an unknown format", text.trim()),
        })
    }

    /// Whether the store has the `objects` and `refs` directories of a git
    /// repository.
    pub fn is_initialized(&self) -> bool {
        has_objects_and_refs(&self.git_dir)
    }

    /// A `git` command bound to this store and work tree.
    pub fn command(&self) -> Command {
        let mut git_dir = OsString::from("--git-dir=");
        git_dir.push(&self.git_dir);
        let mut work_tree = OsString::from("--work-tree=");
        work_tree.push(&self.work_tree);

        let mut command = Command::new("git");
        command
            .arg(git_dir)
            .arg(work_tree)
            .current_dir(&self.work_tree)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .env_remove("GIT_INDEX_FILE");
        command
    }

    fn capture<I, S>(&self, args: I) -> Result<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = self.command();
        command.args(args);
        debug!("running {:?}", command);
        spawn(&mut command)
    }

    /// Run a git command and fail with its stderr if it exits unsuccessfully.
    fn run<I, S>(&self, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
        let output = self.capture(&args)?;
        if !output.status.success() {
            return Err(command_failed(&args, &output));
        }
        Ok(output.stdout)
    }

    /// Run a git command and report only whether it succeeded.
    fn succeeds<I, S>(&self, args: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Ok(self.capture(args)?.status.success())
    }

    /// `git init` the store, creating its directory first.
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.git_dir)?;
        self.run(["init", "--quiet"])?;
        Ok(())
    }

    /// Read a config value, or `None` if it is not set.
    pub fn config_get(&self, key: &str) -> Result<Option<String>> {
        let output = self.capture(["config", key])?;
        match output.status.code() {
            Some(0) => Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string())),
            Some(1) => Ok(None),
            _ => Err(command_failed(&["config", key], &output)),
        }
    }

    pub fn config_set(&self, key: &str, value: &str) -> Result<()> {
        self.run(["config", key, value])?;
        Ok(())
    }

    /// Unset a config value. Unsetting a value that is not set is fine.
    pub fn config_unset(&self, key: &str) -> Result<()> {
        let output = self.capture(["config", "--unset", key])?;
        match output.status.code() {
            Some(0) | Some(5) => Ok(()),
            _ => Err(command_failed(&["config", "--unset", key], &output)),
        }
    }

    /// Remove a whole config section, if present.
    pub fn config_remove_section(&self, section: &str) -> Result<bool> {
        self.succeeds(["config", "--remove-section", section])
    }

    /// The ref HEAD points at, e.g. `refs/heads/master`.
    pub fn symbolic_head(&self) -> Result<String> {
        let output = self.capture(["symbolic-ref", "HEAD"])?;
        if !output.status.success() {
            return Err(Error::FindingHead {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Point HEAD at a branch without touching the index or work tree.
    pub fn set_head(&self, branch: &str) -> Result<()> {
        let target = branch_ref(branch);
        self.run(["symbolic-ref", "HEAD", target.as_str()])?;
        Ok(())
    }

    /// Whether `reference` resolves to a commit.
    pub fn ref_exists(&self, reference: &str) -> Result<bool> {
        let spec = format!("{}^{{commit}}", reference);
        self.succeeds(["rev-parse", "--verify", "--quiet", spec.as_str()])
    }

    pub fn branch_exists(&self, branch: &str) -> Result<bool> {
        self.ref_exists(&branch_ref(branch))
    }

    /// Whether `treeish` (e.g. `HEAD:docs`) names a tree.
    pub fn is_tree(&self, treeish: &str) -> Result<bool> {
        let spec = format!("{}^{{tree}}", treeish);
        self.succeeds(["rev-parse", "--verify", "--quiet", spec.as_str()])
    }

    /// Full object id of a revision.
    pub fn rev_parse(&self, revision: &str) -> Result<String> {
        let stdout = self.run(["rev-parse", "--verify", revision])?;
        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    /// Reset the index to `treeish` without touching the work tree.
    pub fn read_tree(&self, treeish: &str) -> Result<()> {
        self.run(["read-tree", treeish])?;
        Ok(())
    }

    pub fn read_tree_empty(&self) -> Result<()> {
        self.run(["read-tree", "--empty"])?;
        Ok(())
    }

    /// Make index and work tree match `treeish`, deleting tracked files that
    /// are not in it. Does not move the branch.
    pub fn read_tree_reset_update(&self, treeish: &str) -> Result<()> {
        self.run(["read-tree", "--reset", "-u", treeish])?;
        Ok(())
    }

    /// Paths recorded in the index as gitlinks.
    pub fn staged_gitlinks(&self) -> Result<Vec<PathBuf>> {
        let stdout = self.run(["ls-files", "--stage", "-z"])?;
        Ok(parse_ls_files_stage(&stdout)
            .into_iter()
            .filter(|(mode, _)| *mode == GITLINK_MODE)
            .map(|(_, path)| path)
            .collect())
    }

    /// Stage everything under the work tree except `excludes`, collecting
    /// per-file failures instead of aborting.
    pub fn add_all(&self, excludes: &[PathBuf]) -> Result<AddReport> {
        let mut args: Vec<OsString> = vec![
            "-c".into(),
            "advice.addEmbeddedRepo=false".into(),
            "add".into(),
            "--ignore-errors".into(),
            "--all".into(),
            "--".into(),
            ".".into(),
        ];
        for exclude in excludes {
            let mut spec = OsString::from(":(exclude)");
            spec.push(exclude);
            args.push(spec);
        }
        let output = self.capture(&args)?;
        if output.status.success() {
            return Ok(AddReport::default());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let failures: Vec<String> = stderr
            .lines()
            .filter(|line| line.starts_with("error:") || line.starts_with("fatal:"))
            .map(|line| line.to_string())
            .collect();
        if stderr.lines().any(|line| line.starts_with("fatal:")) {
            return Err(command_failed(&args, &output));
        }
        Ok(AddReport { failures })
    }

    /// Stage the given paths even if they are ignored.
    pub fn add_force(&self, paths: &[PathBuf]) -> Result<()> {
        for chunk in paths.chunks(PATHS_PER_INVOCATION) {
            let mut args: Vec<OsString> = vec!["add".into(), "-f".into(), "--".into()];
            args.extend(chunk.iter().map(|p| p.as_os_str().to_os_string()));
            self.run(&args)?;
        }
        Ok(())
    }

    /// Tracked files that are missing from the work tree.
    pub fn deleted_files(&self) -> Result<Vec<PathBuf>> {
        let stdout = self.run(["ls-files", "--deleted", "-z"])?;
        Ok(split_paths(&stdout))
    }

    /// Modified tracked files plus untracked, non-ignored files.
    pub fn modified_or_untracked(&self) -> Result<Vec<PathBuf>> {
        let stdout = self.run([
            "ls-files",
            "-z",
            "--modified",
            "--others",
            "--exclude-standard",
        ])?;
        Ok(split_paths(&stdout))
    }

    /// Tracked files that the current ignore rules would exclude.
    pub fn tracked_but_ignored(&self) -> Result<Vec<PathBuf>> {
        let stdout = self.run([
            "ls-files",
            "-z",
            "--cached",
            "--ignored",
            "--exclude-standard",
        ])?;
        Ok(split_paths(&stdout))
    }

    /// Remove paths from the index only.
    pub fn rm_cached(&self, paths: &[PathBuf]) -> Result<()> {
        for chunk in paths.chunks(PATHS_PER_INVOCATION) {
            let mut args: Vec<OsString> = vec![
                "rm".into(),
                "--cached".into(),
                "-r".into(),
                "-f".into(),
                "-q".into(),
                "--ignore-unmatch".into(),
                "--".into(),
            ];
            args.extend(chunk.iter().map(|p| p.as_os_str().to_os_string()));
            self.run(&args)?;
        }
        Ok(())
    }

    /// The subset of `paths` that the ignore rules exclude.
    pub fn ignored(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let mut command = self.command();
        command
            .args(["check-ignore", "-z", "--stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        debug!("running {:?}", command);
        let mut child = command.spawn().map_err(|e| spawn_error("git", e))?;
        if let Some(mut stdin) = child.stdin.take() {
            for path in paths {
                stdin.write_all(path.as_os_str().as_bytes())?;
                stdin.write_all(b"\0")?;
            }
        }
        let output = child.wait_with_output()?;
        match output.status.code() {
            Some(0) | Some(1) => Ok(split_paths(&output.stdout)),
            _ => Err(command_failed(&["check-ignore", "-z", "--stdin"], &output)),
        }
    }

    /// Whether the index has no changes relative to HEAD.
    pub fn index_matches_head(&self) -> Result<bool> {
        let args = ["diff-index", "--cached", "--quiet", "HEAD", "--"];
        let output = self.capture(args)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(command_failed(&args, &output)),
        }
    }

    /// Create a commit from the index, even if nothing changed.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(["commit", "--quiet", "--allow-empty", "--no-verify", "-m", message])?;
        Ok(())
    }

    /// Human-readable `git status`.
    pub fn status(&self) -> Result<String> {
        let stdout = self.run(["status"])?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Contents of a blob given by id or by `rev:path`.
    pub fn blob(&self, spec: &str) -> Result<Vec<u8>> {
        self.run(["cat-file", "blob", spec])
    }

    /// The type of the object `spec` names (`blob`, `tree`, `commit`), or
    /// `None` if it does not resolve.
    pub fn object_type(&self, spec: &str) -> Result<Option<String>> {
        let output = self.capture(["cat-file", "-t", spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    /// Contents of `rev:path`, or `None` if it does not name a blob.
    pub fn blob_if_exists(&self, spec: &str) -> Result<Option<Vec<u8>>> {
        if self.object_type(spec)?.as_deref() != Some("blob") {
            return Ok(None);
        }
        self.blob(spec).map(Some)
    }

    /// Every entry below `treeish`, recursing into subtrees.
    pub fn ls_tree_recursive(&self, treeish: &str) -> Result<Vec<TreeEntry>> {
        let stdout = self.run(["ls-tree", "-r", "-z", treeish])?;
        Ok(parse_ls_tree(&stdout))
    }

    /// Names of every tracked path in a commit.
    pub fn tracked_paths(&self, commit: &str) -> Result<Vec<PathBuf>> {
        let stdout = self.run(["ls-tree", "-r", "-z", "--name-only", "--full-tree", commit])?;
        Ok(split_paths(&stdout))
    }

    /// Commits reachable from `reference`, newest first.
    pub fn commits(&self, reference: &str) -> Result<Vec<CommitInfo>> {
        let stdout = self.run(["log", "--format=%H %ct", reference, "--"])?;
        Ok(parse_commit_lines(&String::from_utf8_lossy(&stdout)))
    }

    /// All refs in the store.
    pub fn refs(&self) -> Result<Vec<RefInfo>> {
        let stdout = self.run(["for-each-ref", "--format=%(objectname) %(refname)"])?;
        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .filter_map(|line| {
                let (oid, name) = line.split_once(' ')?;
                Some(RefInfo {
                    oid: oid.to_string(),
                    name: name.to_string(),
                })
            })
            .collect())
    }

    pub fn submodule_init(&self) -> Result<()> {
        self.run(["submodule", "--quiet", "init"])?;
        Ok(())
    }

    /// Check out every registered submodule, cloning it from its mirror in
    /// the store when missing. Mirrors are local paths, which git refuses to
    /// clone from by default since 2.38.1.
    pub fn submodule_update(&self) -> Result<()> {
        self.run([
            "-c",
            "protocol.file.allow=always",
            "submodule",
            "--quiet",
            "update",
            "--init",
        ])?;
        Ok(())
    }

    /// Run git with the user's arguments and inherited stdio.
    pub fn passthrough(&self, args: &[OsString]) -> Result<ExitStatus> {
        let mut command = self.command();
        command.args(args);
        debug!("running {:?}", command);
        command.status().map_err(|e| spawn_error("git", e))
    }
}

/// `refs/heads/<branch>`, unless `branch` already is a full ref.
pub fn branch_ref(branch: &str) -> String {
    if branch.starts_with("refs/") {
        branch.to_string()
    } else {
        format!("refs/heads/{}", branch)
    }
}

/// Whether `path` has the `objects` and `refs` directories of a git store.
pub fn has_objects_and_refs(path: &Path) -> bool {
    path.join("objects").is_dir() && path.join("refs").is_dir()
}

/// Whether `path` is the work tree of a non-bare repository.
pub fn probable_non_bare_repository(path: &Path) -> bool {
    has_objects_and_refs(&path.join(".git"))
}

fn spawn(command: &mut Command) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    command.output().map_err(|e| spawn_error(&program, e))
}

/// Map a failure to start an executable onto a gib error.
pub(crate) fn spawn_error(tool: &str, error: std::io::Error) -> Error {
    if error.kind() == std::io::ErrorKind::NotFound {
        Error::DependencyNotFound {
            tool: tool.to_string(),
        }
    } else {
        Error::Io(error)
    }
}

fn command_failed<S: AsRef<OsStr>>(args: &[S], output: &Output) -> Error {
    let command = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stderr = if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    };
    Error::GitCommand { command, stderr }
}

/// Parse `git --version` output.
pub fn parse_version(text: &str) -> Option<Version> {
    let re = Regex::new(r"^git version (\d+)\.(\d+)(?:\.(\d+))?").ok()?;
    let captures = re.captures(text.trim())?;
    let number = |i: usize| -> u64 {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    Some(Version::new(number(1), number(2), number(3)))
}

fn split_paths(bytes: &[u8]) -> Vec<PathBuf> {
    bytes
        .split(|b| *b == 0)
        .filter(|record| !record.is_empty())
        .map(|record| PathBuf::from(OsString::from_vec(record.to_vec())))
        .collect()
}

/// Parse `git ls-files --stage -z` into (mode, path) pairs.
fn parse_ls_files_stage(bytes: &[u8]) -> Vec<(u32, PathBuf)> {
    bytes
        .split(|b| *b == 0)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let tab = record.iter().position(|b| *b == b'\t')?;
            let (meta, path) = (&record[..tab], &record[tab + 1..]);
            let meta = std::str::from_utf8(meta).ok()?;
            let mode = u32::from_str_radix(meta.split_whitespace().next()?, 8).ok()?;
            Some((mode, PathBuf::from(OsStr::from_bytes(path))))
        })
        .collect()
}

/// Parse `git ls-tree -z` output.
fn parse_ls_tree(bytes: &[u8]) -> Vec<TreeEntry> {
    bytes
        .split(|b| *b == 0)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let tab = record.iter().position(|b| *b == b'\t')?;
            let (meta, path) = (&record[..tab], &record[tab + 1..]);
            let meta = std::str::from_utf8(meta).ok()?;
            let mut fields = meta.split_whitespace();
            let mode = u32::from_str_radix(fields.next()?, 8).ok()?;
            let kind = match fields.next()? {
                "blob" => ObjectKind::Blob,
                "tree" => ObjectKind::Tree,
                "commit" => ObjectKind::Commit,
                _ => return None,
            };
            let oid = fields.next()?.to_string();
            Some(TreeEntry {
                mode,
                kind,
                oid,
                path: PathBuf::from(OsStr::from_bytes(path)),
            })
        })
        .collect()
}

fn parse_commit_lines(text: &str) -> Vec<CommitInfo> {
    text.lines()
        .filter_map(|line| {
            let (id, timestamp) = line.trim().split_once(' ')?;
            Some(CommitInfo {
                id: id.to_string(),
                timestamp: timestamp.parse().ok()?,
            })
        })
        .collect()
}
