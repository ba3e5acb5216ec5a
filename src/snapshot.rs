//! # Commit Orchestration
//!
//! Turning the current state of a backed up directory into one commit on its
//! branch, and the `eat` variant that archives files and then deletes them.
//!
//! ## Commit Pipeline
//!
//! The order of the steps in [`Snapshotter::commit`] matters:
//!
//! 1. Unregister embedded repositories that have vanished. This must happen
//!    before `.` is staged.
//! 2. If a `.gitignore` changed, unstage tracked files it now ignores.
//! 3. Stage everything. Files git cannot read are reported and skipped; a
//!    backup that misses one unreadable file beats no backup at all.
//! 4. Unstage files deleted from disk.
//! 5. Mirror embedded repositories and rebuild `.gitmodules`.
//! 6. Capture the metadata snapshot and stage it.
//! 7. Commit, even when nothing changed.
//!
//! A failure in any step other than 3 aborts the run. Nothing is rolled
//! back: the next `commit` starts from whatever index the failed run left.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{info, warn};

use crate::defaults::{CONFIG_FILENAME, GITIGNORE_TEMPLATE, METADATA_FILENAME};
use crate::error::{Error, Result};
use crate::git::Git;
use crate::submodules::SubmoduleVirtualizer;
use crate::tools::{MetadataTool, MirrorTool};

/// Date format used in commit messages, e.g. `Tue, 03 Mar 2026 14:02:11 +0100`.
const COMMIT_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// What one `commit` run did.
#[derive(Debug, Default)]
pub struct CommitReport {
    /// Files git refused to stage.
    pub add_failures: Vec<String>,
    /// Embedded repositories that were unregistered.
    pub vanished: Vec<PathBuf>,
    /// Embedded repositories that were mirrored.
    pub mirrored: usize,
    /// Tracked files unstaged because they are now ignored.
    pub newly_ignored: Vec<PathBuf>,
}

/// What one `eat` run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EatReport {
    /// Whether the files differed from HEAD and needed their own commit.
    pub archived: bool,
}

/// Current local time in the commit message format.
pub fn commit_date() -> String {
    Local::now().format(COMMIT_DATE_FORMAT).to_string()
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_gitignore(path: &Path) -> bool {
    path.file_name().map(|n| n == ".gitignore").unwrap_or(false)
}

/// Commits the state of one backed up directory.
pub struct Snapshotter<'a> {
    git: &'a Git,
    branch: &'a str,
    /// Paths relative to the work tree that are never staged.
    excludes: Vec<PathBuf>,
    /// Absolute paths never searched for embedded repositories.
    skip: Vec<PathBuf>,
    metadata: &'a dyn MetadataTool,
    mirror: &'a dyn MirrorTool,
}

impl<'a> Snapshotter<'a> {
    pub fn new(
        git: &'a Git,
        branch: &'a str,
        excludes: Vec<PathBuf>,
        skip: Vec<PathBuf>,
        metadata: &'a dyn MetadataTool,
        mirror: &'a dyn MirrorTool,
    ) -> Self {
        Self {
            git,
            branch,
            excludes,
            skip,
            metadata,
            mirror,
        }
    }

    fn virtualizer(&self) -> SubmoduleVirtualizer<'_> {
        SubmoduleVirtualizer::new(self.git, self.branch, self.skip.clone())
    }

    /// Record the whole backed up directory as a new commit.
    pub fn commit(&self) -> Result<CommitReport> {
        let mut report = CommitReport::default();
        let virtualizer = self.virtualizer();

        report.vanished = virtualizer.unregister_vanished()?;

        let changed = self.git.modified_or_untracked()?;
        if changed.iter().any(|p| is_gitignore(p)) {
            info!("Some .gitignore added or modified, determining newly ignored files.");
            report.newly_ignored = self.git.tracked_but_ignored()?;
            self.git.rm_cached(&report.newly_ignored)?;
        }

        info!("Adding new and modified files.");
        let added = self.git.add_all(&self.excludes)?;
        for failure in &added.failures {
            warn!("{}", failure);
        }
        report.add_failures = added.failures;

        info!("Removing deleted files from the repository");
        let deleted = self.git.deleted_files()?;
        self.git.rm_cached(&deleted)?;

        let registry = virtualizer.mirror_and_register(self.mirror)?;
        report.mirrored = registry.len();

        self.capture_metadata()?;

        info!("Committing the new state of {}", self.git.work_tree().display());
        self.git
            .commit(&format!("Committed on {}", commit_date()))?;
        Ok(report)
    }

    fn capture_metadata(&self) -> Result<()> {
        self.metadata.capture(self.git)?;
        self.git.add_force(&[PathBuf::from(METADATA_FILENAME)])
    }

    /// Archive `paths` in a commit of their own, then delete them from the
    /// directory and record the deletion in a second commit.
    ///
    /// Embedded repositories are mirrored and registered before anything is
    /// staged, so every commit an archived gitlink names is in the store
    /// before its working tree is deleted. Eaten repositories are then
    /// unregistered; their mirrors stay.
    ///
    /// `paths` are relative to the backed up directory. The metadata
    /// snapshot is not refreshed.
    pub fn eat(&self, paths: &[PathBuf]) -> Result<EatReport> {
        if paths.is_empty() {
            return Err(Error::Usage {
                message: "eat needs at least one file or directory".to_string(),
            });
        }
        if let Some(root) = paths.iter().find(|p| p.as_os_str() == ".") {
            return Err(Error::Usage {
                message: format!(
                    "refusing to eat '{}', the backed up directory itself",
                    root.display()
                ),
            });
        }
        if !self.git.index_matches_head()? {
            return Err(Error::EatingWithStagedChanges);
        }

        let virtualizer = self.virtualizer();
        virtualizer.unregister_vanished()?;
        virtualizer.mirror_and_register(self.mirror)?;

        let listed = join_paths(paths);
        self.git.add_force(paths)?;
        let archived = !self.git.index_matches_head()?;
        if archived {
            self.git
                .commit(&format!("Eaten on {}: {}", commit_date(), listed))?;
        } else {
            info!("{} already backed up unchanged", listed);
        }

        self.git.rm_cached(paths)?;
        for path in paths {
            remove_leftover(&self.git.work_tree().join(path))?;
        }
        virtualizer.unregister_below(paths)?;
        self.git
            .commit(&format!("Removed eaten files on {}: {}", commit_date(), listed))?;
        Ok(EatReport { archived })
    }

    /// The first commit on a fresh branch: a starter `.gitignore` (if the
    /// directory has none) and `.gib.conf`, which `init` has just written.
    pub fn initial_commit(&self, program: &str) -> Result<()> {
        let gitignore = self.git.work_tree().join(".gitignore");
        if !gitignore.exists() {
            fs::write(&gitignore, GITIGNORE_TEMPLATE)?;
        }
        self.git.add_force(&[
            PathBuf::from(".gitignore"),
            PathBuf::from(CONFIG_FILENAME),
        ])?;
        self.git.commit(&format!("Initialized by {}", program))
    }
}

/// Delete an eaten path from disk, including ignored files and embedded
/// repositories below it.
fn remove_leftover(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{git_available, CopyMirror, FakeMetadata, TestStore};

    fn snapshotter(store: &TestStore) -> Snapshotter<'_> {
        Snapshotter::new(
            &store.git,
            "master",
            Vec::new(),
            Vec::new(),
            &FakeMetadata,
            &CopyMirror,
        )
    }

    fn commit_count(git: &Git) -> usize {
        git.commits("HEAD").unwrap().len()
    }

    fn initialized_with_first_commit() -> TestStore {
        let store = TestStore::initialized();
        store.write(CONFIG_FILENAME, "[repository]\nbranch=master\n");
        snapshotter(&store).initial_commit("gib").unwrap();
        store
    }

    #[test]
    fn test_initial_commit_writes_gitignore() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        let tracked = store.git.tracked_paths("HEAD").unwrap();
        assert!(tracked.contains(&PathBuf::from(".gitignore")));
        assert!(tracked.contains(&PathBuf::from(".gib.conf")));
        assert_eq!(commit_count(&store.git), 1);
    }

    #[test]
    fn test_commit_records_files_and_metadata() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.write("docs/readme.txt", "hello");
        let report = snapshotter(&store).commit().unwrap();
        assert!(report.add_failures.is_empty());

        let tracked = store.git.tracked_paths("HEAD").unwrap();
        assert!(tracked.contains(&PathBuf::from("docs/readme.txt")));
        assert!(tracked.contains(&PathBuf::from(".ometastore")));
        assert!(tracked.contains(&PathBuf::from(".gitmodules")));
    }

    #[test]
    fn test_unchanged_commits_have_identical_trees() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.write("a.txt", "a");
        snapshotter(&store).commit().unwrap();
        let first = store.git.rev_parse("HEAD^{tree}").unwrap();
        snapshotter(&store).commit().unwrap();
        let second = store.git.rev_parse("HEAD^{tree}").unwrap();

        assert_eq!(first, second);
        assert_eq!(commit_count(&store.git), 3);
    }

    #[test]
    fn test_commit_removes_deleted_files() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.write("gone.txt", "soon");
        snapshotter(&store).commit().unwrap();
        fs::remove_file(store.work().join("gone.txt")).unwrap();
        snapshotter(&store).commit().unwrap();
        let tracked = store.git.tracked_paths("HEAD").unwrap();
        assert!(!tracked.contains(&PathBuf::from("gone.txt")));
    }

    #[test]
    fn test_commit_unstages_newly_ignored_files() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.write("cache/blob.bin", "x");
        snapshotter(&store).commit().unwrap();

        store.write(".gitignore", "cache/\n");
        let report = snapshotter(&store).commit().unwrap();
        assert_eq!(report.newly_ignored, vec![PathBuf::from("cache/blob.bin")]);
        let tracked = store.git.tracked_paths("HEAD").unwrap();
        assert!(!tracked.contains(&PathBuf::from("cache/blob.bin")));
    }

    #[test]
    fn test_commit_mirrors_embedded_repository_and_forgets_it() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        let embedded = store.embedded_repository("code/project");
        let report = snapshotter(&store).commit().unwrap();
        assert_eq!(report.mirrored, 1);
        assert_eq!(
            store.git.staged_gitlinks().unwrap(),
            vec![PathBuf::from("code/project")]
        );

        fs::remove_dir_all(&embedded).unwrap();
        let report = snapshotter(&store).commit().unwrap();
        assert_eq!(report.vanished, vec![PathBuf::from("code/project")]);
        assert_eq!(report.mirrored, 0);
        let gitmodules = String::from_utf8(store.git.blob("HEAD:.gitmodules").unwrap()).unwrap();
        assert!(!gitmodules.contains("code/project"));
    }

    #[test]
    fn test_eat_new_file_makes_two_commits() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.write("old/photo.jpg", "pixels");
        let before = commit_count(&store.git);

        let report = snapshotter(&store).eat(&[PathBuf::from("old")]).unwrap();
        assert!(report.archived);
        assert_eq!(commit_count(&store.git), before + 2);
        assert!(!store.work().join("old").exists());
        assert_eq!(store.git.blob("HEAD~1:old/photo.jpg").unwrap(), b"pixels");
    }

    #[test]
    fn test_eat_mirrors_embedded_repository_before_deleting_it() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.embedded_repository("proj/repo");
        snapshotter(&store).commit().unwrap();
        let newest = store.commit_in_embedded("proj/repo", "later.txt", "after the backup");

        let report = snapshotter(&store).eat(&[PathBuf::from("proj")]).unwrap();
        assert!(report.archived);
        assert!(!store.work().join("proj").exists());

        assert_eq!(store.git.rev_parse("HEAD~1:proj/repo").unwrap(), newest);
        let mirror = store
            .git
            .git_dir()
            .join("git-repositories/master/proj/repo/.git");
        let mirror_git = Git::new(mirror, store.work());
        assert_eq!(mirror_git.object_type(&newest).unwrap().as_deref(), Some("commit"));

        let gitmodules = String::from_utf8(store.git.blob("HEAD:.gitmodules").unwrap()).unwrap();
        assert!(!gitmodules.contains("proj/repo"));
        assert!(store.git.staged_gitlinks().unwrap().is_empty());
    }

    #[test]
    fn test_eat_unregistered_embedded_repository() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.embedded_repository("proj/repo");
        store.embedded_repository("keep/other");
        let head = store.commit_in_embedded("proj/repo", "x.txt", "x");
        let before = commit_count(&store.git);

        snapshotter(&store).eat(&[PathBuf::from("proj")]).unwrap();
        assert_eq!(commit_count(&store.git), before + 2);
        assert!(!store.work().join("proj").exists());
        assert!(store.work().join("keep/other/README").exists());
        assert_eq!(store.git.rev_parse("HEAD~1:proj/repo").unwrap(), head);

        let gitmodules = String::from_utf8(store.git.blob("HEAD:.gitmodules").unwrap()).unwrap();
        assert!(!gitmodules.contains("proj/repo"));
        assert!(gitmodules.contains("master/keep/other"));
    }

    #[test]
    fn test_eat_unchanged_file_only_removes() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.write("keep.txt", "same");
        snapshotter(&store).commit().unwrap();
        let before = commit_count(&store.git);

        let report = snapshotter(&store).eat(&[PathBuf::from("keep.txt")]).unwrap();
        assert!(!report.archived);
        assert_eq!(commit_count(&store.git), before + 1);
        assert!(!store.work().join("keep.txt").exists());
    }

    #[test]
    fn test_eat_refuses_with_staged_changes() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        store.write("staged.txt", "s");
        store.git.add_force(&[PathBuf::from("staged.txt")]).unwrap();
        store.write("victim.txt", "v");

        let result = snapshotter(&store).eat(&[PathBuf::from("victim.txt")]);
        assert!(matches!(result, Err(Error::EatingWithStagedChanges)));
        assert!(store.work().join("victim.txt").exists());
    }

    #[test]
    fn test_eat_refuses_whole_directory() {
        if !git_available() {
            return;
        }
        let store = initialized_with_first_commit();
        let result = snapshotter(&store).eat(&[PathBuf::from(".")]);
        assert!(matches!(result, Err(Error::Usage { .. })));
    }

    #[test]
    fn test_remove_leftover_handles_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        remove_leftover(&dir.path().join("nothing")).unwrap();
        fs::create_dir_all(dir.path().join("d/e")).unwrap();
        remove_leftover(&dir.path().join("d")).unwrap();
        assert!(!dir.path().join("d").exists());
    }
}
