//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use gib::config::Overrides;
use gib::output::OutputConfig;

use crate::commands;

/// gib - back up directory trees into a shared git repository
#[derive(Parser, Debug)]
#[command(name = "gib")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    target: TargetArgs,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Options selecting what is backed up, and where to.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Directory to back up (defaults to your home directory)
    #[arg(long, global = true, value_name = "DIR", env = "GIB_DIRECTORY")]
    directory: Option<PathBuf>,

    /// The git store to back up into; must be absolute and end in .git
    /// (defaults to DIR/.git, or the value in DIR/.gib.conf)
    #[arg(long, global = true, value_name = "GIT_DIR", env = "GIB_GIT_DIRECTORY")]
    git_directory: Option<PathBuf>,

    /// Branch of the store for this directory (defaults to master, or the
    /// value in DIR/.gib.conf)
    #[arg(long, global = true, value_name = "BRANCH", env = "GIB_BRANCH")]
    branch: Option<String>,
}

impl From<TargetArgs> for Overrides {
    fn from(args: TargetArgs) -> Self {
        Overrides {
            directory: args.directory,
            repository_location: args.git_directory,
            branch: args.branch,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start backing up a directory, creating the store if needed
    Init(commands::init::InitArgs),

    /// Commit the current state of the directory
    Commit(commands::commit::CommitArgs),

    /// Back up files or directories, then delete them from disk
    Eat(commands::eat::EatArgs),

    /// Print a file as it was in a backup
    Show(commands::show::ShowArgs),

    /// Copy a directory out of a backup into another directory
    Extract(commands::extract::ExtractArgs),

    /// Make the whole directory match a backup
    Restore(commands::restore::RestoreArgs),

    /// Run git against the store and this directory
    Git(commands::git::GitArgs),

    /// Write the file lists for any commits that lack one
    UpdateFileList(commands::update_file_list::UpdateFileListArgs),

    /// Show the resolved settings and where each came from
    Info(commands::info::InfoArgs),

    /// Find backed up files whose path matches a regular expression
    Find(commands::find::FindArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub overrides: Overrides,
    pub output: OutputConfig,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let context = Context {
            overrides: self.target.into(),
            output: OutputConfig::from_env_and_flag(&self.color),
        };

        match self.command {
            Commands::Init(args) => commands::init::execute(args, &context),
            Commands::Commit(args) => commands::commit::execute(args, &context),
            Commands::Eat(args) => commands::eat::execute(args, &context),
            Commands::Show(args) => commands::show::execute(args, &context),
            Commands::Extract(args) => commands::extract::execute(args, &context),
            Commands::Restore(args) => commands::restore::execute(args, &context),
            Commands::Git(args) => commands::git::execute(args, &context),
            Commands::UpdateFileList(args) => commands::update_file_list::execute(args, &context),
            Commands::Info(args) => commands::info::execute(args, &context),
            Commands::Find(args) => commands::find::execute(args, &context),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Log to stderr at `level`, unless RUST_LOG says otherwise.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second initialization only happens in tests; keep the first logger.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .target(env_logger::Target::Stderr)
        .try_init();
}
