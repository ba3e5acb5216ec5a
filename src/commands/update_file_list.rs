//! # Update-File-List Command Implementation
//!
//! Writes `<store>/file-lists/<date>-<commit>` for every commit on the
//! branch that does not have one yet. `commit` and `eat` already do this;
//! the command exists for stores written by older versions.

use anyhow::Result;
use clap::Args;

use gib::file_list;
use gib::output::Status;
use gib::session::{CommandKind, Session};

use crate::cli::Context;

/// Write missing per-commit file lists
#[derive(Args, Debug)]
pub struct UpdateFileListArgs {}

/// Execute the `update-file-list` command.
pub fn execute(_args: UpdateFileListArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::ReadOnly)?;
    let written = file_list::update_file_lists(&session.git, session.branch())?;
    context.output.print(
        Status::Done,
        &format!(
            "{} new file lists in {}",
            written,
            session.file_list_dir().display()
        ),
    );
    Ok(())
}
