//! # Getting Data Back Out
//!
//! Three ways to read a backup:
//!
//! - [`show`] prints one file from a commit.
//! - [`extract`] copies a subtree of a commit into another directory,
//!   leaving the backed up directory alone.
//! - [`restore`] makes the whole backed up directory match a commit, then
//!   re-clones embedded repositories from their mirrors and replays the
//!   metadata snapshot. It overwrites local changes, so it asks first.
//!
//! `extract` writes regular files with their executable bit and recreates
//! symlinks, but does not replay ownership or extended attributes from the
//! metadata snapshot: ometastore can only apply a snapshot onto a whole
//! tracked tree. The snapshot is written next to the extracted files so it
//! can be applied by hand.

use std::fs;
use std::io::{self, BufRead, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::{Path, PathBuf};

use console::Term;
use dialoguer::Input;
use log::{info, warn};

use crate::defaults::{METADATA_FILENAME, RESTORE_CONFIRMATION, SUBMODULE_REGISTRY_FILENAME};
use crate::error::{Error, Result};
use crate::git::{Git, ObjectKind, GITLINK_MODE, SYMLINK_MODE};
use crate::suggestions;
use crate::tools::MetadataTool;

/// Fail with [`Error::NoSuchBranch`] unless `reference` names a commit.
fn require_ref(git: &Git, reference: &str, invocation: &str) -> Result<()> {
    if git.ref_exists(reference)? {
        return Ok(());
    }
    Err(Error::NoSuchBranch {
        reference: reference.to_string(),
        hint: Some(suggestions::check_ref(invocation)),
    })
}

/// `<ref>:<path>`, with `.` meaning the root tree.
fn treeish(reference: &str, path: &Path) -> String {
    if path.as_os_str() == "." || path.as_os_str().is_empty() {
        format!("{}:", reference)
    } else {
        format!("{}:{}", reference, path.display())
    }
}

/// Write the contents of `file` as of `reference` to `out`.
pub fn show(
    git: &Git,
    file: &Path,
    reference: &str,
    invocation: &str,
    out: &mut dyn Write,
) -> Result<()> {
    require_ref(git, reference, invocation)?;
    let spec = treeish(reference, file);
    let contents = git.blob_if_exists(&spec)?.ok_or_else(|| Error::Usage {
        message: format!("'{}' is not a file in {}", file.display(), reference),
    })?;
    out.write_all(&contents)?;
    out.flush()?;
    Ok(())
}

/// Copy `path` as of `reference` into `destination/path`.
///
/// Returns the number of entries written.
pub fn extract(
    git: &Git,
    path: &Path,
    destination: &Path,
    reference: &str,
    invocation: &str,
) -> Result<usize> {
    require_ref(git, reference, invocation)?;
    let tree = treeish(reference, path);
    if !git.is_tree(&tree)? {
        return Err(Error::BadTree { treeish: tree });
    }
    if !destination.is_dir() {
        return Err(Error::Usage {
            message: format!(
                "The destination '{}' is not an existing directory",
                destination.display()
            ),
        });
    }

    match git.blob_if_exists(&format!("{}:{}", reference, METADATA_FILENAME))? {
        Some(snapshot) => fs::write(destination.join(METADATA_FILENAME), snapshot)?,
        None => warn!("{} has no {}; only contents will be extracted", reference, METADATA_FILENAME),
    }

    let root = if path.as_os_str() == "." {
        destination.to_path_buf()
    } else {
        destination.join(path)
    };
    fs::create_dir_all(&root)?;

    let entries = git.ls_tree_recursive(&tree)?;
    for entry in &entries {
        let target = root.join(&entry.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        match entry.kind {
            ObjectKind::Commit if entry.mode == GITLINK_MODE => fs::create_dir_all(&target)?,
            ObjectKind::Blob if entry.mode == SYMLINK_MODE => {
                let link = git.blob(&entry.oid)?;
                remove_existing(&target)?;
                symlink(std::ffi::OsStr::from_bytes(&link), &target)?;
            }
            ObjectKind::Blob => {
                remove_existing(&target)?;
                fs::write(&target, git.blob(&entry.oid)?)?;
                let mode = if entry.mode & 0o111 != 0 { 0o755 } else { 0o644 };
                fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
            }
            _ => {}
        }
    }
    info!(
        "Extracted {} entries to {}; ownership and extended attributes were not restored",
        entries.len(),
        root.display()
    );
    Ok(entries.len())
}

fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path)?,
        Ok(_) => fs::remove_file(path)?,
        Err(_) => {}
    }
    Ok(())
}

/// Check a typed answer against the restore confirmation phrase.
pub fn check_confirmation(answer: &str) -> Result<()> {
    if answer.trim() == RESTORE_CONFIRMATION {
        return Ok(());
    }
    Err(Error::Aborted {
        message: format!("you must type '{}' to restore", RESTORE_CONFIRMATION),
    })
}

/// Ask the user to confirm overwriting `directory`.
///
/// On a terminal this prompts interactively; otherwise one line is read
/// from stdin so that scripts can pipe the phrase in.
pub fn confirm_restore(directory: &Path) -> Result<()> {
    let prompt = format!(
        "This will overwrite files in {} with the backed up versions. Type '{}' to continue",
        directory.display(),
        RESTORE_CONFIRMATION
    );
    let answer = if Term::stdout().is_term() && Term::stderr().is_term() {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| Error::Aborted {
                message: e.to_string(),
            })?
    } else {
        eprintln!("{}:", prompt);
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        line
    };
    check_confirmation(&answer)
}

/// Make the index and backed up directory match `reference`, then restore
/// embedded repositories and metadata. The branch is not moved.
pub fn restore(
    git: &Git,
    reference: &str,
    metadata: &dyn MetadataTool,
    invocation: &str,
) -> Result<()> {
    require_ref(git, reference, invocation)?;
    info!("Restoring {} from {}", git.work_tree().display(), reference);
    git.read_tree_reset_update(reference)?;

    let registry: PathBuf = git.work_tree().join(SUBMODULE_REGISTRY_FILENAME);
    let has_submodules = fs::metadata(&registry).map(|m| m.len() > 0).unwrap_or(false);
    if has_submodules {
        info!("Restoring embedded repositories from their mirrors");
        git.submodule_update()?;
    }

    metadata.apply(git)
}
