//! # Repository Guard
//!
//! Preconditions that must hold for the backup store before a command is
//! allowed to touch it. All of them are terminal: a violation ends the
//! invocation with a specific error and nothing is retried.
//!
//! - The store must be initialized (`objects/` and `refs/` present) for every
//!   command except `init`.
//! - Automatic garbage collection must be disabled (`gc.auto=0`). Mirrors of
//!   embedded repositories and objects reachable only from other branches'
//!   submodules must never be pruned between commits.
//! - The store must not be configured bare, and must not carry a
//!   `core.worktree`: one store serves many work trees, each passed
//!   explicitly on every git invocation.
//! - HEAD must point at the resolved branch, and that branch must exist.

use log::info;

use crate::config::BackupTarget;
use crate::error::{Error, Result};
use crate::git::{branch_ref, Git};
use crate::suggestions;

/// Settings every backup store must carry, with their required values.
pub const REQUIRED_CONFIG: &[(&str, &str)] = &[("gc.auto", "0"), ("core.bare", "false")];

/// Fail with [`Error::NotInitialized`] unless the store looks like a git
/// repository.
pub fn abort_if_not_initialized(git: &Git, target: &BackupTarget, invocation: &str) -> Result<()> {
    if git.is_initialized() {
        return Ok(());
    }
    Err(Error::NotInitialized {
        directory: target.directory.clone(),
        invocation: invocation.to_string(),
    })
}

/// Check the required store settings, setting any that are missing.
///
/// A setting present with a different value is an error rather than being
/// overwritten, since another directory sharing the store may rely on it.
pub fn ensure_required_config(git: &Git) -> Result<()> {
    for (key, required) in REQUIRED_CONFIG {
        require_config_value(git, key, required)?;
    }
    Ok(())
}

fn require_config_value(git: &Git, key: &str, required: &str) -> Result<()> {
    match git.config_get(key)? {
        Some(current) if current == required => Ok(()),
        Some(current) => Err(Error::GitConfig {
            key: key.to_string(),
            current,
            required: required.to_string(),
        }),
        None => {
            info!("The {} config option was not set, setting to {}", key, required);
            git.config_set(key, required)
        }
    }
}

/// Prepare the store for `init`.
///
/// An existing store only has its settings checked. A new one is created,
/// stripped of the work tree `git init` records, and configured.
/// Returns whether the store was created.
pub fn prepare_store(git: &Git) -> Result<bool> {
    if git.is_initialized() {
        ensure_required_config(git)?;
        return Ok(false);
    }

    info!("Initializing a new repository in {}", git.git_dir().display());
    git.init()?;
    git.config_unset("core.worktree")?;
    git.config_set("core.bare", "false")?;
    git.config_set("gc.auto", "0")?;
    Ok(true)
}

/// Point HEAD at a branch that does not exist yet, with an empty index.
pub fn start_branch(git: &Git, branch: &str) -> Result<()> {
    if git.branch_exists(branch)? {
        return Err(Error::BranchExistsOnInit {
            branch: branch.to_string(),
            hint: Some(suggestions::pick_another_branch(branch)),
        });
    }
    git.set_head(branch)?;
    git.read_tree_empty()
}

/// Make HEAD point at `branch`, resetting the index if that meant a switch.
///
/// Without the reset, the index would still describe the previously active
/// branch and the next commit would be computed against the wrong baseline.
/// Returns whether HEAD was switched.
pub fn align_branch(git: &Git, branch: &str, invocation: &str) -> Result<bool> {
    let wanted = branch_ref(branch);
    if !git.branch_exists(branch)? {
        return Err(Error::NoSuchBranch {
            reference: branch.to_string(),
            hint: Some(suggestions::create_branch(invocation, branch)),
        });
    }

    let current = git.symbolic_head()?;
    if current == wanted {
        return Ok(false);
    }

    git.set_head(branch)?;
    info!("Now working on the branch '{}', so resetting the index to match...", branch);
    git.read_tree("HEAD")?;
    Ok(true)
}
