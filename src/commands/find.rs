//! # Find Command Implementation
//!
//! Lists backed up files whose path matches a regular expression, one per
//! line as `<commit> <blob> <path>`. The blob id can be passed to
//! `gib git cat-file blob` to read the file.

use anyhow::Result;
use clap::Args;

use gib::search::{self, SearchScope};
use gib::session::{CommandKind, Session};

use crate::cli::Context;

/// Find backed up files by path
#[derive(Args, Debug)]
pub struct FindArgs {
    /// Regular expression matched against tracked paths
    #[arg(value_name = "REGEX")]
    pub pattern: String,

    /// Only search this ref (default: every branch in the store)
    #[arg(long = "ref", value_name = "REF")]
    pub reference: Option<String>,

    /// Search every commit, not only branch tips
    #[arg(long)]
    pub all_history: bool,
}

/// Execute the `find` command.
pub fn execute(args: FindArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::ReadOnly)?;
    let scope = SearchScope {
        reference: args.reference,
        all_history: args.all_history,
    };
    for found in search::find(&session.git, &args.pattern, &scope)? {
        println!("{} {} {}", found.commit, found.blob, found.path);
    }
    Ok(())
}
