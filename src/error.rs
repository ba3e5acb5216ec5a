//! # Error Handling
//!
//! This module defines the centralized error type for `gib`. It uses the
//! `thiserror` library to create an `Error` enum with one variant per
//! failure kind, so that the binary can print a clear diagnostic and exit
//! with a code scripts can branch on (see [`crate::exit_codes`]).
//!
//! The variants follow the failure taxonomy of a backup session:
//!
//! - Usage errors: bad arguments that clap could not catch.
//! - Environment errors: no home directory, missing or outdated executables.
//! - Configuration errors: malformed repository location, store settings that
//!   conflict with what backups require, unreadable `.gib.conf`.
//! - State errors: store not initialized, branch missing (or already present
//!   on `init`), staged changes during `eat`, `extract` from a non-tree.
//! - Command failures: git, rsync or ometastore exiting unsuccessfully.
//!
//! None of these are retried. Every precondition check is terminal.

use std::path::PathBuf;

use thiserror::Error;

use crate::exit_codes;

/// Main error type for gib operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid arguments that made it past argument parsing.
    #[error("{message}")]
    Usage { message: String },

    /// A required executable could not be started.
    #[error("'{tool}' is not on your PATH")]
    DependencyNotFound { tool: String },

    /// A required executable is present but unusable.
    #[error("{tool}: {message}")]
    ToolVersion { tool: String, message: String },

    /// A store configuration value conflicts with the required one.
    #[error("The current value for {key} is {current}, should be: {required}")]
    GitConfig {
        key: String,
        current: String,
        required: String,
    },

    /// The process environment is missing something gib relies on.
    #[error("{message}")]
    StrangeEnvironment { message: String },

    /// `eat` refuses to bundle unrelated staged work into its commits.
    #[error("There are staged changes; commit or unstage them before eating files")]
    EatingWithStagedChanges,

    /// The repository location is not usable as a backup store path.
    #[error("Bad repository location {}: {reason}", path.display())]
    BadRepositoryLocation { path: PathBuf, reason: String },

    /// `init` was asked for a branch that is already in the store.
    #[error("The branch '{branch}' already exists in the repository{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    BranchExistsOnInit {
        branch: String,
        hint: Option<String>,
    },

    /// A branch or other ref could not be resolved to a commit.
    #[error("Could not resolve '{reference}'{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    NoSuchBranch {
        reference: String,
        hint: Option<String>,
    },

    /// The repository location exists but holds no git store.
    #[error("You don't seem to have initialized {} for backup.\n  hint: Please use '{invocation} init' to initialize it", directory.display())]
    NotInitialized {
        directory: PathBuf,
        invocation: String,
    },

    /// Reading what HEAD points to failed.
    #[error("Finding what HEAD points to failed: {stderr}")]
    FindingHead { stderr: String },

    /// The requested path is not a directory in the given commit.
    #[error("'{treeish}' is not a tree")]
    BadTree { treeish: String },

    /// The repository location does not exist.
    #[error("The git directory '{}' does not exist.", path.display())]
    MissingRepository { path: PathBuf },

    /// The directory to back up does not exist.
    #[error("The directory to back up '{}' does not exist or is not a directory", path.display())]
    DirectoryMissing { path: PathBuf },

    /// `.gib.conf` could not be read or parsed.
    #[error("Configuration file error in {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// A git command exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    GitCommand { command: String, stderr: String },

    /// `gib git ...` forwarded a failing exit status.
    #[error("git exited with status {code}")]
    GitPassthrough { code: i32 },

    /// rsync or ometastore exited unsuccessfully.
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    /// The user did not confirm a destructive operation.
    #[error("Aborted: {message}")]
    Aborted { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// The process exit code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage { .. } | Error::Regex(_) => exit_codes::USAGE_ERROR,
            Error::DependencyNotFound { .. } => exit_codes::DEPENDENCY_NOT_FOUND,
            Error::ToolVersion { .. } => exit_codes::VERSION_ERROR,
            Error::GitConfig { .. } => exit_codes::GIT_CONFIG_ERROR,
            Error::StrangeEnvironment { .. } => exit_codes::STRANGE_ENVIRONMENT,
            Error::EatingWithStagedChanges => exit_codes::EATING_WITH_STAGED_CHANGES,
            Error::BadRepositoryLocation { .. } => exit_codes::BAD_REPOSITORY_LOCATION,
            Error::BranchExistsOnInit { .. } => exit_codes::BRANCH_EXISTS_ON_INIT,
            Error::NoSuchBranch { .. } => exit_codes::NO_SUCH_BRANCH,
            Error::NotInitialized { .. } => exit_codes::REPOSITORY_NOT_INITIALIZED,
            Error::FindingHead { .. } => exit_codes::FINDING_HEAD,
            Error::BadTree { .. } => exit_codes::BAD_TREE,
            Error::MissingRepository { .. } => exit_codes::MISSING_REPOSITORY,
            Error::DirectoryMissing { .. } => exit_codes::DIRECTORY_MISSING,
            Error::GitCommand { .. } => exit_codes::GIT_COMMAND_FAILED,
            Error::GitPassthrough { code } => *code,
            Error::Tool { .. } => exit_codes::TOOL_FAILED,
            Error::Aborted { .. } => exit_codes::ABORTED,
            Error::ConfigParse { .. } | Error::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
