//! # Backup Configuration Resolution
//!
//! Every invocation of gib works on one [`BackupTarget`]: the directory being
//! backed up, the git store the snapshots go into, and the branch within that
//! store. Many hosts and directories can share one store, each on its own
//! branch, so these three values have to be resolved carefully.
//!
//! ## Resolution Order
//!
//! Each field is resolved independently and the first source that applies
//! wins:
//!
//! 1. The command-line flag (`--directory`, `--git-directory`, `--branch`).
//! 2. The value in `.gib.conf` inside the backup directory (not applicable to
//!    the directory itself, since that is where the file is looked up).
//! 3. The default: the home directory, `<directory>/.git`, and `master`.
//!
//! ## The `.gib.conf` File
//!
//! `init` writes a small INI file into the backup directory so that later
//! invocations only need `--directory` (or nothing at all, for the home
//! directory):
//!
//! ```ini
//! [repository]
//! repository_location=/srv/backups/shared.git
//! branch=laptop
//! ```
//!
//! The file is never rewritten after `init`.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use ini::Ini;

use crate::defaults::{CONFIG_FILENAME, CONFIG_SECTION, DEFAULT_BRANCH, STORE_SUFFIX};
use crate::error::{Error, Result};

const KEY_REPOSITORY_LOCATION: &str = "repository_location";
const KEY_BRANCH: &str = "branch";
// Older configuration files used this name for the repository location.
const LEGACY_KEY_REPOSITORY_LOCATION: &str = "git_directory";

/// Where a resolved setting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    CommandLine,
    ConfigurationFile,
    DefaultValue,
}

impl fmt::Display for OptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            OptionSource::CommandLine => "command line",
            OptionSource::ConfigurationFile => "configuration file",
            OptionSource::DefaultValue => "default value",
        };
        f.write_str(text)
    }
}

/// The persisted per-directory settings from `.gib.conf`.
///
/// Both fields are optional; a missing file is the same as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupConfig {
    pub repository_location: Option<PathBuf>,
    pub branch: Option<String>,
}

impl BackupConfig {
    /// Path of the configuration file for a backup directory.
    pub fn path_in(directory: &Path) -> PathBuf {
        directory.join(CONFIG_FILENAME)
    }

    /// Load the configuration from a backup directory.
    ///
    /// Returns the empty configuration if the file does not exist.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = Self::path_in(directory);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        Self::parse(&content, &path)
    }

    /// Parse configuration file content. `path` is only used in errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let ini = Ini::load_from_str(content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let Some(section) = ini.section(Some(CONFIG_SECTION)) else {
            return Ok(Self::default());
        };

        let repository_location = section
            .get(KEY_REPOSITORY_LOCATION)
            .or_else(|| section.get(LEGACY_KEY_REPOSITORY_LOCATION))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let branch = section
            .get(KEY_BRANCH)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Ok(Self {
            repository_location,
            branch,
        })
    }

    /// Write the configuration file into a backup directory.
    pub fn save(&self, directory: &Path) -> Result<()> {
        let mut ini = Ini::new();
        {
            let mut section = ini.with_section(Some(CONFIG_SECTION));
            if let Some(location) = &self.repository_location {
                section.set(KEY_REPOSITORY_LOCATION, location.to_string_lossy());
            }
            if let Some(branch) = &self.branch {
                section.set(KEY_BRANCH, branch.as_str());
            }
        }
        ini.write_to_file(Self::path_in(directory))?;
        Ok(())
    }
}

/// Values given on the command line, before resolution.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub directory: Option<PathBuf>,
    pub repository_location: Option<PathBuf>,
    pub branch: Option<String>,
}

/// The fully resolved target of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub directory: PathBuf,
    pub repository_location: PathBuf,
    pub branch: String,
    pub directory_source: OptionSource,
    pub repository_location_source: OptionSource,
    pub branch_source: OptionSource,
}

impl BackupTarget {
    /// Short human summary of every setting and where it came from.
    pub fn describe(&self) -> String {
        format!(
            "backing up the directory {} (set from the {})\n\
             ... to the branch \"{}\" (set from the {})\n\
             ... in the git repository {} (set from the {})",
            self.directory.display(),
            self.directory_source,
            self.branch,
            self.branch_source,
            self.repository_location.display(),
            self.repository_location_source,
        )
    }

    /// An invocation prefix that reproduces this target.
    ///
    /// After `init` the repository location and branch live in `.gib.conf`,
    /// so only a non-default directory needs to be passed.
    pub fn invocation(&self, program: &str, home: Option<&Path>) -> String {
        let mut invocation = program.to_string();
        if home != Some(self.directory.as_path()) {
            invocation.push_str(" --directory=");
            invocation.push_str(&shell_quote(&self.directory.to_string_lossy()));
        }
        invocation
    }
}

/// Resolve the backup target from overrides, the config file and defaults.
///
/// This does not change the working directory; [`crate::session`] does
/// that once the target is known. `home` and `cwd` are passed in so the
/// resolution can be tested without touching the process environment.
pub fn resolve(
    overrides: &Overrides,
    home: Option<&Path>,
    cwd: &Path,
    require_existing_store: bool,
) -> Result<BackupTarget> {
    let (directory, directory_source) = match &overrides.directory {
        Some(directory) => (cwd.join(directory), OptionSource::CommandLine),
        None => {
            let home = home.ok_or_else(|| Error::StrangeEnvironment {
                message: "No home directory could be determined; use --directory".to_string(),
            })?;
            (home.to_path_buf(), OptionSource::DefaultValue)
        }
    };
    let directory = normalize_lexically(&directory);

    if !directory.is_dir() {
        return Err(Error::DirectoryMissing { path: directory });
    }
    let directory = fs::canonicalize(&directory)?;

    let config = BackupConfig::load(&directory)?;

    let (repository_location, repository_location_source) =
        match (&overrides.repository_location, config.repository_location) {
            (Some(location), _) => (location.clone(), OptionSource::CommandLine),
            (None, Some(location)) => (location, OptionSource::ConfigurationFile),
            (None, None) => (directory.join(STORE_SUFFIX), OptionSource::DefaultValue),
        };

    let (branch, branch_source) = match (&overrides.branch, config.branch) {
        (Some(branch), _) => (branch.clone(), OptionSource::CommandLine),
        (None, Some(branch)) => (branch, OptionSource::ConfigurationFile),
        (None, None) => (DEFAULT_BRANCH.to_string(), OptionSource::DefaultValue),
    };

    let repository_location = validate_repository_location(&repository_location)?;

    if require_existing_store && !repository_location.exists() {
        return Err(Error::MissingRepository {
            path: repository_location,
        });
    }

    Ok(BackupTarget {
        directory,
        repository_location,
        branch,
        directory_source,
        repository_location_source,
        branch_source,
    })
}

/// Check that a repository location is absolute and ends in `.git`.
///
/// Trailing slashes are accepted and dropped.
pub fn validate_repository_location(location: &Path) -> Result<PathBuf> {
    if !location.is_absolute() {
        return Err(Error::BadRepositoryLocation {
            path: location.to_path_buf(),
            reason: "the git directory must be an absolute path".to_string(),
        });
    }
    let normalized = normalize_lexically(location);
    let has_suffix = normalized
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(STORE_SUFFIX))
        .unwrap_or(false);
    if !has_suffix {
        return Err(Error::BadRepositoryLocation {
            path: location.to_path_buf(),
            reason: format!("the git directory did not end in '{}'", STORE_SUFFIX),
        });
    }
    Ok(normalized)
}

/// Map a path typed relative to the original working directory onto a path
/// relative to the backup directory.
///
/// Absolute paths are taken as they are. The result is `.` for the backup
/// directory itself; anything outside it is a usage error.
pub fn map_filename_for_directory_change(
    filename: &Path,
    original_cwd: &Path,
    directory: &Path,
) -> Result<PathBuf> {
    let absolute = if filename.is_absolute() {
        filename.to_path_buf()
    } else {
        original_cwd.join(filename)
    };
    let absolute = normalize_lexically(&absolute);

    let relative = match absolute.strip_prefix(directory) {
        Ok(relative) => relative.to_path_buf(),
        // The backup directory is canonical; the argument may have come in
        // through a symlink.
        Err(_) => {
            let canonical = fs::canonicalize(&absolute).map_err(|_| outside(filename, directory))?;
            canonical
                .strip_prefix(directory)
                .map_err(|_| outside(filename, directory))?
                .to_path_buf()
        }
    };

    if relative.as_os_str().is_empty() {
        Ok(PathBuf::from("."))
    } else {
        Ok(relative)
    }
}

fn outside(filename: &Path, directory: &Path) -> Error {
    Error::Usage {
        message: format!(
            "'{}' is not inside the backed up directory {}",
            filename.display(),
            directory.display()
        ),
    }
}

/// Remove `.` components and fold `..` into their parent without touching
/// the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Quote a string to protect it from the shell.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}
