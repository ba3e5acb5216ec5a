//! Default values and reserved names for gib.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

/// Name of the per-directory configuration file written by `init`.
pub const CONFIG_FILENAME: &str = ".gib.conf";

/// Section of [`CONFIG_FILENAME`] holding the repository settings.
pub const CONFIG_SECTION: &str = "repository";

/// Every repository location must end with this suffix.
pub const STORE_SUFFIX: &str = ".git";

/// Branch used when neither the command line nor `.gib.conf` name one.
pub const DEFAULT_BRANCH: &str = "master";

/// File written by ometastore at the root of the tracked tree.
pub const METADATA_FILENAME: &str = ".ometastore";

/// The submodule registry file at the root of the tracked tree.
pub const SUBMODULE_REGISTRY_FILENAME: &str = ".gitmodules";

/// Directory inside the store that holds mirrors of embedded repositories.
pub const MIRROR_DIRECTORY: &str = "git-repositories";

/// Directory inside the store that holds per-commit file lists.
pub const FILE_LIST_DIRECTORY: &str = "file-lists";

/// Oldest git that honours `gc.auto=0` the way backups need.
pub const MINIMUM_GIT_VERSION: (u64, u64, u64) = (1, 7, 0);

/// Phrase the user must type before `restore` overwrites anything.
pub const RESTORE_CONFIRMATION: &str = "Yes, restore";

/// Starter `.gitignore` written by `init` when none exists.
pub const GITIGNORE_TEMPLATE: &str = "\
# Here are some examples of what you might want to ignore
# in your backups.  Feel free to modify.
##
# The rules are read from top to bottom, so a rule can
# \"cancel\" out a previous one.  Be careful.
#
# For more information on the syntax used in this file,
# see \"man gitignore\".
#
# .cache/
# *.tmp
";
