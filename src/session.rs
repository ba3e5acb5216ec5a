//! One invocation's view of the world: the resolved [`BackupTarget`], a
//! [`Git`] handle bound to it, and the directory the user ran gib from.
//!
//! Opening a session runs the checks that apply before any command:
//!
//! 1. git is installed and recent enough.
//! 2. The target resolves (directory exists, repository location is sane).
//! 3. Depending on the [`CommandKind`], the store is initialized, carries
//!    the settings backups require, and HEAD is on the resolved branch.
//!
//! The process working directory is never changed. Every git invocation
//! runs in the backup directory, and paths typed by the user are mapped
//! with [`Session::map_path`].

use std::env;
use std::path::{Path, PathBuf};

use log::debug;
use semver::Version;

use crate::config::{self, BackupTarget, Overrides};
use crate::defaults::{FILE_LIST_DIRECTORY, MINIMUM_GIT_VERSION};
use crate::error::{Error, Result};
use crate::git::Git;
use crate::guard;
use crate::snapshot::Snapshotter;
use crate::tools::{MetadataTool, MirrorTool};

/// How much of the store a command needs in place before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// `init` and `info`: the store may not exist yet.
    Init,
    /// Commands that only read from the store.
    ReadOnly,
    /// Commands that write commits; required settings are enforced.
    Mutating,
}

/// The resolved target of one invocation plus the handles to act on it.
#[derive(Debug)]
pub struct Session {
    pub target: BackupTarget,
    pub git: Git,
    original_cwd: PathBuf,
    home: Option<PathBuf>,
    program: String,
}

impl Session {
    /// Open a session from the process environment.
    pub fn open(overrides: &Overrides, kind: CommandKind) -> Result<Self> {
        check_git_version()?;
        let cwd = env::current_dir()?;
        let home = dirs::home_dir();
        Self::open_in(overrides, kind, home, cwd, program_name())
    }

    /// Open a session with an explicit home and working directory.
    pub fn open_in(
        overrides: &Overrides,
        kind: CommandKind,
        home: Option<PathBuf>,
        cwd: PathBuf,
        program: String,
    ) -> Result<Self> {
        let require_store = kind != CommandKind::Init;
        let target = config::resolve(overrides, home.as_deref(), &cwd, require_store)?;
        debug!("resolved target: {:?}", target);

        let git = Git::new(&target.repository_location, &target.directory);
        let session = Self {
            target,
            git,
            original_cwd: cwd,
            home,
            program,
        };

        if kind != CommandKind::Init {
            let invocation = session.invocation();
            guard::abort_if_not_initialized(&session.git, &session.target, &invocation)?;
            if kind == CommandKind::Mutating {
                guard::ensure_required_config(&session.git)?;
            }
            guard::align_branch(&session.git, &session.target.branch, &invocation)?;
        }
        Ok(session)
    }

    pub fn directory(&self) -> &Path {
        &self.target.directory
    }

    pub fn branch(&self) -> &str {
        &self.target.branch
    }

    /// A command prefix that reproduces this session's target.
    pub fn invocation(&self) -> String {
        self.target.invocation(&self.program, self.home.as_deref())
    }

    /// Map a path typed by the user onto one relative to the backup
    /// directory.
    pub fn map_path(&self, path: &Path) -> Result<PathBuf> {
        config::map_filename_for_directory_change(path, &self.original_cwd, self.directory())
    }

    /// The store's path relative to the backup directory, when the store
    /// lives inside it. Such a store must never be staged or searched.
    ///
    /// git already refuses to track anything named `.git`, so the default
    /// location needs no exclusion.
    pub fn store_exclusions(&self) -> Vec<PathBuf> {
        match self.target.repository_location.strip_prefix(self.directory()) {
            Ok(relative)
                if !relative.as_os_str().is_empty() && relative != Path::new(".git") =>
            {
                vec![relative.to_path_buf()]
            }
            _ => Vec::new(),
        }
    }

    pub fn file_list_dir(&self) -> PathBuf {
        self.target.repository_location.join(FILE_LIST_DIRECTORY)
    }

    pub fn snapshotter<'a>(
        &'a self,
        metadata: &'a dyn MetadataTool,
        mirror: &'a dyn MirrorTool,
    ) -> Snapshotter<'a> {
        Snapshotter::new(
            &self.git,
            self.branch(),
            self.store_exclusions(),
            vec![self.target.repository_location.clone()],
            metadata,
            mirror,
        )
    }
}

/// The name gib was invoked as, for hints that suggest a command line.
pub fn program_name() -> String {
    env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

/// Fail unless the installed git is at least the minimum supported version.
pub fn check_git_version() -> Result<Version> {
    let version = Git::version()?;
    let (major, minor, patch) = MINIMUM_GIT_VERSION;
    let minimum = Version::new(major, minor, patch);
    if version < minimum {
        return Err(Error::ToolVersion {
            tool: "git".to_string(),
            message: format!("version {} is too old; at least {} is required", version, minimum),
        });
    }
    debug!("git version {}", version);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{git_available, TestStore};
    use std::fs;

    fn overrides_for(store: &TestStore) -> Overrides {
        Overrides {
            directory: Some(store.work().to_path_buf()),
            repository_location: Some(store.git.git_dir().to_path_buf()),
            branch: None,
        }
    }

    #[test]
    fn test_open_uninitialized_store_for_init() {
        let store = TestStore::uninitialized();
        let session = Session::open_in(
            &overrides_for(&store),
            CommandKind::Init,
            None,
            PathBuf::from("/"),
            "gib".to_string(),
        )
        .unwrap();
        assert_eq!(session.branch(), "master");
        assert_eq!(session.directory(), store.work());
    }

    #[test]
    fn test_open_requires_store() {
        let store = TestStore::uninitialized();
        let result = Session::open_in(
            &overrides_for(&store),
            CommandKind::ReadOnly,
            None,
            PathBuf::from("/"),
            "gib".to_string(),
        );
        assert!(matches!(result, Err(Error::MissingRepository { .. })));
    }

    #[test]
    fn test_open_requires_initialized_store() {
        let store = TestStore::uninitialized();
        fs::create_dir_all(store.git.git_dir()).unwrap();
        let result = Session::open_in(
            &overrides_for(&store),
            CommandKind::Mutating,
            None,
            PathBuf::from("/"),
            "gib".to_string(),
        );
        match result {
            Err(Error::NotInitialized { invocation, .. }) => {
                assert!(invocation.starts_with("gib --directory="));
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_open_aligns_branch() {
        if !git_available() {
            return;
        }
        let store = TestStore::initialized();
        store.commit_file("a.txt", "a");
        guard::start_branch(&store.git, "laptop").unwrap();
        store.commit_file("b.txt", "b");

        let session = Session::open_in(
            &overrides_for(&store),
            CommandKind::Mutating,
            None,
            PathBuf::from("/"),
            "gib".to_string(),
        )
        .unwrap();
        assert_eq!(session.git.symbolic_head().unwrap(), "refs/heads/master");
    }

    #[test]
    fn test_store_exclusions() {
        let store = TestStore::uninitialized();
        let default_location = Overrides {
            directory: Some(store.work().to_path_buf()),
            repository_location: None,
            branch: None,
        };
        let session = Session::open_in(
            &default_location,
            CommandKind::Init,
            None,
            PathBuf::from("/"),
            "gib".into(),
        )
        .unwrap();
        assert!(session.store_exclusions().is_empty());

        let nested = Overrides {
            directory: Some(store.work().to_path_buf()),
            repository_location: Some(store.work().join("backups/store.git")),
            branch: None,
        };
        let session =
            Session::open_in(&nested, CommandKind::Init, None, PathBuf::from("/"), "gib".into())
                .unwrap();
        assert_eq!(
            session.store_exclusions(),
            vec![PathBuf::from("backups/store.git")]
        );

        let outside = Session::open_in(
            &overrides_for(&store),
            CommandKind::Init,
            None,
            PathBuf::from("/"),
            "gib".into(),
        )
        .unwrap();
        assert!(outside.store_exclusions().is_empty());
    }

    #[test]
    fn test_map_path_uses_original_cwd() {
        let store = TestStore::uninitialized();
        fs::create_dir(store.work().join("docs")).unwrap();
        let session = Session::open_in(
            &overrides_for(&store),
            CommandKind::Init,
            None,
            store.work().join("docs"),
            "gib".into(),
        )
        .unwrap();
        assert_eq!(
            session.map_path(Path::new("notes.txt")).unwrap(),
            PathBuf::from("docs/notes.txt")
        );
    }
}
