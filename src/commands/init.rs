//! # Init Command Implementation
//!
//! Prepares a directory for backup: creates (or checks) the store, starts
//! the directory's branch from an empty index, writes `.gib.conf` and a
//! starter `.gitignore`, and makes the first commit.
//!
//! A store may be shared by several directories. `init` on an existing
//! store only checks its settings, and refuses a branch that is already in
//! use.

use anyhow::Result;
use clap::Args;

use gib::config::BackupConfig;
use gib::guard;
use gib::output::Status;
use gib::session::{CommandKind, Session};
use gib::tools::{Ometastore, Rsync};

use crate::cli::Context;

/// Start backing up a directory
#[derive(Args, Debug)]
pub struct InitArgs {}

/// Execute the `init` command.
pub fn execute(_args: InitArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::Init)?;
    let target = &session.target;
    log::info!("Settings for backup:\n{}", target.describe());

    let created = guard::prepare_store(&session.git)?;
    guard::start_branch(&session.git, &target.branch)?;

    BackupConfig {
        repository_location: Some(target.repository_location.clone()),
        branch: Some(target.branch.clone()),
    }
    .save(&target.directory)?;

    session
        .snapshotter(&Ometastore, &Rsync)
        .initial_commit(&gib::session::program_name())?;

    let output = &context.output;
    if created {
        output.print(
            Status::Done,
            &format!("Created {}", target.repository_location.display()),
        );
    }
    output.print(
        Status::Done,
        &format!(
            "Initialized {} on branch '{}'",
            target.directory.display(),
            target.branch
        ),
    );
    output.print(
        Status::Hint,
        &format!(
            "You might be interested in tweaking {}",
            target.directory.join(".gitignore").display()
        ),
    );
    output.print(
        Status::Hint,
        &format!(
            "Please run '{} commit' to save a first state in your history",
            session.invocation()
        ),
    );
    Ok(())
}
