//! # Exit Codes
//!
//! Process exit codes returned by the `gib` binary. Every failure kind has
//! its own code so that scripts wrapping `gib` (cron jobs, backup timers)
//! can branch on the outcome without scraping stderr.
//!
//! - `0`: success
//! - `1`: general error not covered by a specific code
//! - `2`: invalid command-line usage (also what clap returns)
//! - `3..=18`: one code per error kind, see [`crate::error::Error::exit_code`]
//!
//! `gib git ...` is the exception: it exits with whatever code git returned.

/// The command completed successfully.
pub const SUCCESS: i32 = 0;
/// An error that has no more specific code.
pub const GENERAL_ERROR: i32 = 1;
/// Bad arguments, including those rejected by clap.
pub const USAGE_ERROR: i32 = 2;
/// A required executable (git, rsync, ometastore) is not on `PATH`.
pub const DEPENDENCY_NOT_FOUND: i32 = 3;
/// A required executable is present but too old or unparseable.
pub const VERSION_ERROR: i32 = 4;
/// A store config value conflicts with what backups require.
pub const GIT_CONFIG_ERROR: i32 = 5;
/// No home directory could be determined.
pub const STRANGE_ENVIRONMENT: i32 = 6;
/// `eat` was run while the index differs from HEAD.
pub const EATING_WITH_STAGED_CHANGES: i32 = 7;
/// The repository location is relative or lacks the `.git` suffix.
pub const BAD_REPOSITORY_LOCATION: i32 = 8;
/// `init` was asked to create a branch that already exists.
pub const BRANCH_EXISTS_ON_INIT: i32 = 9;
/// A branch or ref could not be resolved.
pub const NO_SUCH_BRANCH: i32 = 10;
/// The store has not been initialized for backups.
pub const REPOSITORY_NOT_INITIALIZED: i32 = 11;
/// `HEAD` could not be read.
pub const FINDING_HEAD: i32 = 12;
/// `extract` was pointed at something that is not a tree.
pub const BAD_TREE: i32 = 13;
/// The repository location does not exist.
pub const MISSING_REPOSITORY: i32 = 14;
/// The directory to back up does not exist.
pub const DIRECTORY_MISSING: i32 = 15;
/// A git command exited unsuccessfully.
pub const GIT_COMMAND_FAILED: i32 = 16;
/// rsync or ometastore exited unsuccessfully.
pub const TOOL_FAILED: i32 = 17;
/// The user declined a confirmation prompt.
pub const ABORTED: i32 = 18;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let mut codes = vec![
            SUCCESS,
            GENERAL_ERROR,
            USAGE_ERROR,
            DEPENDENCY_NOT_FOUND,
            VERSION_ERROR,
            GIT_CONFIG_ERROR,
            STRANGE_ENVIRONMENT,
            EATING_WITH_STAGED_CHANGES,
            BAD_REPOSITORY_LOCATION,
            BRANCH_EXISTS_ON_INIT,
            NO_SUCH_BRANCH,
            REPOSITORY_NOT_INITIALIZED,
            FINDING_HEAD,
            BAD_TREE,
            MISSING_REPOSITORY,
            DIRECTORY_MISSING,
            GIT_COMMAND_FAILED,
            TOOL_FAILED,
            ABORTED,
        ];
        let total = codes.len();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), total);
    }
}
