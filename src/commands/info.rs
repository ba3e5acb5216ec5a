//! # Info Command Implementation
//!
//! Shows which directory, store and branch an invocation resolves to and
//! where each setting came from, the shortest command line that reproduces
//! them, and the state of the store.
//!
//! This command is read-only and works before `init`.

use anyhow::Result;
use clap::Args;

use gib::git::Git;
use gib::output::{OutputConfig, Status};
use gib::session::{CommandKind, Session};

use crate::cli::Context;

/// Show the resolved settings
#[derive(Args, Debug)]
pub struct InfoArgs {}

/// Execute the `info` command.
pub fn execute(_args: InfoArgs, context: &Context) -> Result<()> {
    let session = Session::open(&context.overrides, CommandKind::Init)?;
    println!("Settings for backup:");
    println!("{}", session.target.describe());
    println!("Invocation: {}", session.invocation());
    for line in store_lines(&session.git, session.branch(), &context.output)? {
        println!("{}", line);
    }
    Ok(())
}

fn store_lines(git: &Git, branch: &str, output: &OutputConfig) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    if !git.is_initialized() {
        lines.push(output.line(Status::Info, "The store has not been initialized yet"));
        return Ok(lines);
    }

    let branches: Vec<String> = git
        .refs()?
        .into_iter()
        .filter_map(|r| r.name.strip_prefix("refs/heads/").map(str::to_string))
        .collect();
    lines.push(format!("Branches in the store: {}", branches.join(", ")));
    if !branches.iter().any(|b| b == branch) {
        lines.push(output.line(
            Status::Warning,
            &format!("The branch '{}' does not exist yet", branch),
        ));
    }
    lines.push(output.line(
        Status::Warning,
        "Only one gib process may use a store at a time; there is no locking",
    ));
    Ok(lines)
}
