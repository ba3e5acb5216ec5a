//! # Git Command Implementation
//!
//! Runs git with the store and backed up directory filled in, e.g.
//! `gib git log --stat`. git's exit status becomes gib's.

use std::ffi::OsString;

use anyhow::Result;
use clap::Args;

use gib::error::Error;
use gib::session::{CommandKind, Session};

use crate::cli::Context;

/// Run git against the store
#[derive(Args, Debug)]
pub struct GitArgs {
    /// Arguments passed to git unchanged
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<OsString>,
}

/// Execute the `git` command.
pub fn execute(args: GitArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::ReadOnly)?;
    let status = session.git.passthrough(&args.args)?;
    if status.success() {
        return Ok(());
    }
    Err(Error::GitPassthrough {
        code: status.code().unwrap_or(gib::exit_codes::GENERAL_ERROR),
    }
    .into())
}
