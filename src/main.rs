//! # gib CLI
//!
//! This is the binary entry point for the `gib` command-line tool.
//!
//! Its responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Printing errors and choosing the exit code, so that scripts (cron jobs,
//!   mostly) can tell one failure kind from another.
//!
//! The backup logic lives in the `gib` library crate; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use clap::Parser;

use gib::error::Error;
use gib::exit_codes;

fn main() {
    let cli = cli::Cli::parse();
    if let Err(error) = cli.execute() {
        let code = match error.downcast_ref::<Error>() {
            // git already reported the problem on its own stderr.
            Some(Error::GitPassthrough { code }) => *code,
            Some(gib_error) => {
                eprintln!("error: {}", gib_error);
                gib_error.exit_code()
            }
            None => {
                eprintln!("error: {:#}", error);
                exit_codes::GENERAL_ERROR
            }
        };
        std::process::exit(code);
    }
}
