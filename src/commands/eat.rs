//! # Eat Command Implementation
//!
//! Backs up the given files or directories in a commit of their own, then
//! deletes them from disk and records the deletion. Useful for archiving
//! things you no longer want locally but may need one day.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use gib::file_list;
use gib::output::Status;
use gib::session::{CommandKind, Session};
use gib::tools::{Ometastore, Rsync};

use crate::cli::Context;

/// Back up files or directories, then delete them
#[derive(Args, Debug)]
pub struct EatArgs {
    /// Files or directories to eat, relative to the current directory
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Execute the `eat` command.
pub fn execute(args: EatArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::Mutating)?;
    let paths = args
        .paths
        .iter()
        .map(|path| session.map_path(path))
        .collect::<gib::error::Result<Vec<_>>>()?;

    let report = session.snapshotter(&Ometastore, &Rsync).eat(&paths)?;
    let status = if report.archived {
        "Backed up and removed"
    } else {
        "Already backed up; removed"
    };
    context.output.print(
        Status::Done,
        &format!(
            "{} {}",
            status,
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    );

    file_list::update_file_lists(&session.git, session.branch())?;
    Ok(())
}
