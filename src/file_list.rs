//! Per-commit lists of tracked paths under `<store>/file-lists/`.
//!
//! Each list is named `<YYYYMMDDTHHMMSSZ>-<commit id>` after the commit's
//! UTC committer time, holds one path per line, and is never rewritten once
//! present. Lists are written to a temporary name and renamed into place,
//! so an interrupted run leaves no partial list behind.

use std::fs;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use log::{debug, info};

use crate::defaults::FILE_LIST_DIRECTORY;
use crate::error::Result;
use crate::git::{branch_ref, CommitInfo, Git};

const FILE_LIST_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// File name of the list for a commit.
pub fn file_list_name(commit: &CommitInfo) -> String {
    let date = Utc
        .timestamp_opt(commit.timestamp, 0)
        .single()
        .map(|t| t.format(FILE_LIST_DATE_FORMAT).to_string())
        .unwrap_or_else(|| commit.timestamp.to_string());
    format!("{}-{}", date, commit.id)
}

/// Write any missing file lists for the commits on `branch`.
///
/// Returns the number of lists written.
pub fn update_file_lists(git: &Git, branch: &str) -> Result<usize> {
    let directory = git.git_dir().join(FILE_LIST_DIRECTORY);
    fs::create_dir_all(&directory)?;

    let mut written = 0;
    for commit in git.commits(&branch_ref(branch))? {
        let path = directory.join(file_list_name(&commit));
        if path.exists() {
            continue;
        }
        let paths = git.tracked_paths(&commit.id)?;
        write_atomically(&path, &paths)?;
        debug!("wrote {}", path.display());
        written += 1;
    }
    if written > 0 {
        info!("Wrote {} new file lists to {}", written, directory.display());
    }
    Ok(written)
}

fn write_atomically(path: &Path, paths: &[PathBuf]) -> Result<()> {
    let mut temporary = path.as_os_str().to_os_string();
    temporary.push(".tmp");
    let temporary = PathBuf::from(temporary);

    let mut file = fs::File::create(&temporary)?;
    for tracked in paths {
        file.write_all(tracked.as_os_str().as_bytes())?;
        file.write_all(b"\n")?;
    }
    file.sync_all()?;
    fs::rename(&temporary, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{git_available, TestStore};

    #[test]
    fn test_file_list_name() {
        let commit = CommitInfo {
            id: "0123abcd".to_string(),
            timestamp: 1_700_000_000,
        };
        assert_eq!(file_list_name(&commit), "20231114T221320Z-0123abcd");
    }

    #[test]
    fn test_update_twice_writes_once() {
        if !git_available() {
            return;
        }
        let store = TestStore::initialized();
        store.commit_file("a.txt", "a");
        store.commit_file("dir/b.txt", "b");

        assert_eq!(update_file_lists(&store.git, "master").unwrap(), 2);
        assert_eq!(update_file_lists(&store.git, "master").unwrap(), 0);

        let head = store.git.commits("HEAD").unwrap().remove(0);
        let list = store
            .git
            .git_dir()
            .join(FILE_LIST_DIRECTORY)
            .join(file_list_name(&head));
        assert_eq!(fs::read_to_string(list).unwrap(), "a.txt\ndir/b.txt\n");
    }

    #[test]
    fn test_existing_list_is_kept() {
        if !git_available() {
            return;
        }
        let store = TestStore::initialized();
        store.commit_file("a.txt", "a");
        let head = store.git.commits("HEAD").unwrap().remove(0);
        let directory = store.git.git_dir().join(FILE_LIST_DIRECTORY);
        fs::create_dir_all(&directory).unwrap();
        fs::write(directory.join(file_list_name(&head)), "hand edited\n").unwrap();

        assert_eq!(update_file_lists(&store.git, "master").unwrap(), 0);
        assert_eq!(
            fs::read_to_string(directory.join(file_list_name(&head))).unwrap(),
            "hand edited\n"
        );
    }
}
