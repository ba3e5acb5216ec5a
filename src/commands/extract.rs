//! # Extract Command Implementation
//!
//! Copies a directory out of a backup into another directory without
//! touching the backed up directory. The destination receives
//! `DEST/.ometastore` and `DEST/<PATH>/...`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use gib::output::Status;
use gib::restore;
use gib::session::{CommandKind, Session};

use crate::cli::Context;

/// Copy a directory out of a backup
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Directory to extract, relative to the current directory
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Existing directory to extract into
    #[arg(value_name = "DEST")]
    pub destination: PathBuf,

    /// The commit to extract from
    #[arg(value_name = "REF", default_value = "HEAD")]
    pub reference: String,
}

/// Execute the `extract` command.
pub fn execute(args: ExtractArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::ReadOnly)?;
    let path = session.map_path(&args.path)?;
    let count = restore::extract(
        &session.git,
        &path,
        &args.destination,
        &args.reference,
        &session.invocation(),
    )?;
    context.output.print(
        Status::Done,
        &format!(
            "Extracted {} entries of {} from {} into {}",
            count,
            path.display(),
            args.reference,
            args.destination.display()
        ),
    );
    Ok(())
}
