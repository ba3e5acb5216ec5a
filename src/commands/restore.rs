//! # Restore Command Implementation
//!
//! Makes the whole backed up directory match a commit, including embedded
//! repositories and file metadata. Local changes to tracked files are lost,
//! so the user has to type a confirmation phrase first.

use anyhow::Result;
use clap::Args;

use gib::output::Status;
use gib::restore;
use gib::session::{CommandKind, Session};
use gib::tools::Ometastore;

use crate::cli::Context;

/// Make the directory match a backup
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// The commit to restore
    #[arg(value_name = "REF", default_value = "HEAD")]
    pub reference: String,
}

/// Execute the `restore` command.
pub fn execute(args: RestoreArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::Mutating)?;
    restore::confirm_restore(session.directory())?;
    restore::restore(
        &session.git,
        &args.reference,
        &Ometastore,
        &session.invocation(),
    )?;
    context.output.print(
        Status::Done,
        &format!(
            "Restored {} from {}",
            session.directory().display(),
            args.reference
        ),
    );
    Ok(())
}
