//! # Commit Command Implementation
//!
//! Records the current state of the backed up directory as one commit on
//! its branch, prints `git status` so that anything left unstaged is
//! visible, and refreshes the per-commit file lists.

use anyhow::Result;
use clap::Args;

use gib::file_list;
use gib::output::Status;
use gib::session::{CommandKind, Session};
use gib::tools::{Ometastore, Rsync};

use crate::cli::Context;

/// Commit the current state of the directory
#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Do not print git status after committing
    #[arg(long)]
    pub no_status: bool,
}

/// Execute the `commit` command.
pub fn execute(args: CommitArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::Mutating)?;
    let report = session.snapshotter(&Ometastore, &Rsync).commit()?;

    let output = &context.output;
    output.print(
        Status::Done,
        &format!(
            "Committed {} to branch '{}'",
            session.directory().display(),
            session.branch()
        ),
    );
    if report.mirrored > 0 {
        output.print(
            Status::Info,
            &format!("Mirrored {} embedded git repositories", report.mirrored),
        );
    }
    if !report.add_failures.is_empty() {
        output.print(
            Status::Warning,
            &format!("{} files could not be backed up", report.add_failures.len()),
        );
    }

    if !args.no_status {
        println!("After committing the new backup, git status is:");
        print!("{}", session.git.status()?);
    }

    file_list::update_file_lists(&session.git, session.branch())?;
    Ok(())
}
