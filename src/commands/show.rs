//! # Show Command Implementation
//!
//! Writes one backed up file to stdout, byte for byte.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use gib::restore;
use gib::session::{CommandKind, Session};

use crate::cli::Context;

/// Print a file as it was in a backup
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// The file, relative to the current directory
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// The commit to read from
    #[arg(value_name = "REF", default_value = "HEAD")]
    pub reference: String,
}

/// Execute the `show` command.
pub fn execute(args: ShowArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::ReadOnly)?;
    let file = session.map_path(&args.file)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    restore::show(
        &session.git,
        &file,
        &args.reference,
        &session.invocation(),
        &mut out,
    )?;
    Ok(())
}
