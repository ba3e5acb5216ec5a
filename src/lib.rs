//! # gib
//!
//! Space-efficient backups of many directory trees into one shared git
//! repository (the *store*). Each backed up directory gets its own branch;
//! identical file contents across directories, hosts and points in time are
//! stored once.
//!
//! This library holds everything the `gib` binary does. It is written so
//! that each stage can be driven and tested on its own.
//!
//! ## Core Concepts
//!
//! - **Resolution (`config`)**: which directory, store and branch one
//!   invocation works on, from the command line, `.gib.conf` and defaults.
//! - **Store adapter (`git`)**: every git invocation, with `--git-dir` and
//!   `--work-tree` always explicit, and all parsing of git output.
//! - **Guards (`guard`)**: preconditions on the store: initialized, `gc.auto`
//!   disabled, not bare, HEAD on the right branch.
//! - **Embedded repositories (`submodules`)**: git working trees found
//!   inside a backed up directory are mirrored into the store and
//!   registered as submodules instead of being committed file by file.
//! - **Snapshots (`snapshot`)**: the commit pipeline and `eat`.
//! - **Reading back (`restore`)**: `show`, `extract` and `restore`.
//! - **File lists (`file_list`)**: a per-commit list of tracked paths kept
//!   inside the store.
//! - **External tools (`tools`)**: `ometastore` for permissions and
//!   ownership, `rsync` for mirroring, both behind traits.
//!
//! ## Execution Flow
//!
//! A command opens a [`session::Session`], which checks the git version,
//! resolves the [`config::BackupTarget`] and runs the guards for the kind
//! of command. The command then drives one of the modules above through
//! the session's [`git::Git`] handle.
//!
//! ## Concurrency
//!
//! gib takes no lock on the store. Running two gib processes against the
//! same store at the same time, even for different directories, is not
//! supported: they share one index and one HEAD.

pub mod config;
pub mod defaults;
pub mod error;
pub mod exit_codes;
pub mod file_list;
pub mod git;
pub mod guard;
pub mod output;
pub mod restore;
pub mod search;
pub mod session;
pub mod snapshot;
pub mod submodules;
pub mod suggestions;
pub mod tools;

#[cfg(test)]
mod test_support;
