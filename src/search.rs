//! Finding files by name across the commits in a store.

use std::collections::BTreeSet;

use regex::Regex;

use crate::error::Result;
use crate::git::{Git, ObjectKind};

/// A tracked file whose path matched a search.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    pub commit: String,
    pub path: String,
    pub blob: String,
}

/// Which commits a search looks at.
#[derive(Debug, Clone, Default)]
pub struct SearchScope {
    /// Search only this ref; every branch otherwise.
    pub reference: Option<String>,
    /// Search every commit reachable from the refs, not just their tips.
    pub all_history: bool,
}

/// Find tracked files whose path matches `pattern`.
///
/// Results are ordered by commit id, then path, with duplicates (a commit
/// reachable from several branches) removed.
pub fn find(git: &Git, pattern: &str, scope: &SearchScope) -> Result<Vec<Match>> {
    let regex = Regex::new(pattern)?;

    let refs: Vec<String> = match &scope.reference {
        Some(reference) => vec![reference.clone()],
        None => git
            .refs()?
            .into_iter()
            .filter(|r| r.name.starts_with("refs/heads/"))
            .map(|r| r.name)
            .collect(),
    };

    let mut commits = BTreeSet::new();
    for reference in &refs {
        if scope.all_history {
            commits.extend(git.commits(reference)?.into_iter().map(|c| c.id));
        } else {
            commits.insert(git.rev_parse(&format!("{}^{{commit}}", reference))?);
        }
    }

    let mut matches = BTreeSet::new();
    for commit in commits {
        for entry in git.ls_tree_recursive(&commit)? {
            if entry.kind != ObjectKind::Blob {
                continue;
            }
            let path = entry.path.to_string_lossy();
            if regex.is_match(&path) {
                matches.insert(Match {
                    commit: commit.clone(),
                    path: path.into_owned(),
                    blob: entry.oid,
                });
            }
        }
    }
    Ok(matches.into_iter().collect())
}
