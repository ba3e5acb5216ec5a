//! # Embedded Repository Virtualization
//!
//! A backed up tree may contain live git working trees of its own (a source
//! checkout in the home directory, say). Committing their `.git` directories
//! as ordinary files would be wasteful and fragile, and skipping them would
//! lose their history. Instead every commit:
//!
//! 1. Unregisters gitlinks whose path no longer holds a distinct, live
//!    repository ([`SubmoduleVirtualizer::unregister_vanished`]). This has to
//!    happen before `.` is staged, or the leftover files would be absorbed
//!    as ordinary content before anyone noticed the repository was gone.
//! 2. Finds every embedded working tree, mirrors its `.git` into
//!    `<store>/git-repositories/<branch>/<path>/.git` and rebuilds
//!    `.gitmodules` from scratch to point at those mirrors
//!    ([`SubmoduleVirtualizer::mirror_and_register`]).
//!
//! The registry is rebuilt rather than patched so that stale or duplicate
//! sections can never accumulate. Submodule names are prefixed with the
//! branch, which keeps the store-level `submodule.*` config sections of
//! different backed up directories apart.
//!
//! A failed mirror aborts the whole commit: the registry and the mirrored
//! bytes must agree.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use ini::Ini;
use log::{info, warn};
use walkdir::WalkDir;

use crate::defaults::{MIRROR_DIRECTORY, SUBMODULE_REGISTRY_FILENAME};
use crate::error::{Error, Result};
use crate::git::{probable_non_bare_repository, Git};
use crate::tools::MirrorTool;

/// The submodule name used for an embedded repository on a branch.
pub fn submodule_name(branch: &str, path: &Path) -> String {
    format!("{}/{}", branch, path.display())
}

/// Mapping from embedded repository path to its mirror, as written to
/// `.gitmodules`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: BTreeMap<PathBuf, PathBuf>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf, mirror: PathBuf) {
        self.entries.insert(path, mirror);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &PathBuf)> {
        self.entries.iter()
    }

    /// Split off every entry at or below one of `paths`.
    pub fn split_off_below(&mut self, paths: &[PathBuf]) -> Registry {
        let (below, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(path, _)| paths.iter().any(|p| path.starts_with(p)));
        self.entries = kept;
        Registry { entries: below }
    }

    /// Render as a `.gitmodules` document.
    pub fn to_ini(&self, branch: &str) -> Ini {
        let mut ini = Ini::new();
        for (path, mirror) in &self.entries {
            let section = format!("submodule \"{}\"", submodule_name(branch, path));
            ini.with_section(Some(section))
                .set("path", path.to_string_lossy())
                .set("url", mirror.to_string_lossy());
        }
        ini
    }

    /// Read the paths registered in an existing `.gitmodules` document.
    pub fn from_ini(ini: &Ini) -> Self {
        let mut registry = Self::new();
        for (name, properties) in ini.iter() {
            let is_submodule = name.map(|n| n.starts_with("submodule ")).unwrap_or(false);
            if !is_submodule {
                continue;
            }
            if let (Some(path), Some(url)) = (properties.get("path"), properties.get("url")) {
                registry.insert(PathBuf::from(path), PathBuf::from(url));
            }
        }
        registry
    }
}

/// Whether some directory between the backup root and `relative` (exclusive)
/// is itself the work tree of a repository, i.e. `relative` has been
/// absorbed by another repository.
pub fn is_in_another_git_repository(directory: &Path, relative: &Path) -> bool {
    relative
        .ancestors()
        .skip(1)
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .any(|ancestor| probable_non_bare_repository(&directory.join(ancestor)))
}

/// Whether `relative` still holds a live repository of its own.
pub fn is_still_distinct(directory: &Path, relative: &Path) -> bool {
    probable_non_bare_repository(&directory.join(relative))
        && !is_in_another_git_repository(directory, relative)
}

/// Every non-bare repository below `start`, as paths relative to it.
///
/// `.git` directories and anything in `skip` are not entered, and the walk
/// does not descend into a repository once found. Unreadable directories
/// are logged and skipped.
pub fn find_git_repositories(start: &Path, skip: &[PathBuf]) -> Vec<PathBuf> {
    let mut repositories = Vec::new();
    let mut walker = WalkDir::new(start)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path while looking for repositories: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        if entry.file_name() == ".git" || skip.iter().any(|s| s == entry.path()) {
            walker.skip_current_dir();
            continue;
        }
        if probable_non_bare_repository(entry.path()) {
            if let Ok(relative) = entry.path().strip_prefix(start) {
                repositories.push(relative.to_path_buf());
            }
            walker.skip_current_dir();
        }
    }
    repositories
}

/// Keeps the embedded repositories of one backed up directory mirrored and
/// registered.
pub struct SubmoduleVirtualizer<'a> {
    git: &'a Git,
    branch: &'a str,
    skip: Vec<PathBuf>,
}

impl<'a> SubmoduleVirtualizer<'a> {
    /// `skip` lists absolute paths never searched for repositories (the
    /// store itself when it lives inside the backed up directory).
    pub fn new(git: &'a Git, branch: &'a str, skip: Vec<PathBuf>) -> Self {
        Self { git, branch, skip }
    }

    fn directory(&self) -> &Path {
        self.git.work_tree()
    }

    /// Where mirrors for this branch live inside the store.
    pub fn mirror_root(&self) -> PathBuf {
        self.git.git_dir().join(MIRROR_DIRECTORY).join(self.branch)
    }

    /// Drop gitlinks whose repository has vanished or been absorbed.
    ///
    /// Returns the unregistered paths.
    pub fn unregister_vanished(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in self.git.staged_gitlinks()? {
            if is_still_distinct(self.directory(), &path) {
                continue;
            }
            info!("Embedded repository {} has gone, unregistering it", path.display());
            self.git.rm_cached(std::slice::from_ref(&path))?;
            let section = format!("submodule.{}", submodule_name(self.branch, &path));
            self.git.config_remove_section(&section)?;
            removed.push(path);
        }
        Ok(removed)
    }

    /// Drop every registered repository at or below one of `paths` from
    /// `.gitmodules` and the store config, and stage the rewritten
    /// registry. Mirrors are kept, so history stays reachable.
    ///
    /// Returns the unregistered paths.
    pub fn unregister_below(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let registry_path = self.directory().join(SUBMODULE_REGISTRY_FILENAME);
        let content = match fs::read_to_string(&registry_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let ini = Ini::load_from_str(&content).map_err(|e| Error::ConfigParse {
            path: registry_path.clone(),
            message: e.to_string(),
        })?;

        let mut registry = Registry::from_ini(&ini);
        let dropped = registry.split_off_below(paths);
        if dropped.is_empty() {
            return Ok(Vec::new());
        }
        let mut removed = Vec::with_capacity(dropped.len());
        for (path, _) in dropped.iter() {
            info!("Unregistering eaten repository {}", path.display());
            let section = format!("submodule.{}", submodule_name(self.branch, path));
            self.git.config_remove_section(&section)?;
            removed.push(path.clone());
        }

        registry.to_ini(self.branch).write_to_file(&registry_path)?;
        self.git
            .add_force(&[PathBuf::from(SUBMODULE_REGISTRY_FILENAME)])?;
        Ok(removed)
    }

    /// Embedded repositories currently present and not ignored.
    pub fn find_embedded_repositories(&self) -> Result<Vec<PathBuf>> {
        let found = find_git_repositories(self.directory(), &self.skip);
        let ignored = self.git.ignored(&found)?;
        Ok(found
            .into_iter()
            .filter(|path| !ignored.contains(path))
            .collect())
    }

    /// Mirror every embedded repository, rewrite `.gitmodules` from scratch,
    /// stage it and initialize submodule tracking.
    pub fn mirror_and_register(&self, mirror: &dyn MirrorTool) -> Result<Registry> {
        let repositories = self.find_embedded_repositories()?;
        let mirror_root = self.mirror_root();
        let mut registry = Registry::new();

        if !repositories.is_empty() {
            info!(
                "Mirroring {} embedded git repositories (not working trees)",
                repositories.len()
            );
        }
        let progress = ProgressBar::new(repositories.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{bar:40.cyan/blue} {pos:>4}/{len:4} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for relative in repositories {
            progress.set_message(relative.display().to_string());
            let source = self.directory().join(&relative).join(".git");
            let destination = mirror_root.join(&relative).join(".git");
            mirror.mirror(&source, &destination)?;
            registry.insert(relative, destination);
            progress.inc(1);
        }
        progress.finish_and_clear();

        let registry_path = self.directory().join(SUBMODULE_REGISTRY_FILENAME);
        registry.to_ini(self.branch).write_to_file(&registry_path)?;
        self.git
            .add_force(&[PathBuf::from(SUBMODULE_REGISTRY_FILENAME)])?;
        self.git.submodule_init()?;
        Ok(registry)
    }
}
