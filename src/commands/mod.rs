//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `gib`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`crate::cli::Context`], opens a session and calls into the `gib`
//!   library to do the work.

pub mod commit;
pub mod completions;
pub mod eat;
pub mod extract;
pub mod find;
pub mod git;
pub mod info;
pub mod init;
pub mod restore;
pub mod show;
pub mod update_file_list;
