//! # Error Suggestions
//!
//! Helpers that build the "hint:" text attached to errors the user can fix
//! by running another command. Errors should say what went wrong AND how to
//! fix it.

/// Hint for a branch that does not exist yet.
pub fn create_branch(invocation: &str, branch: &str) -> String {
    format!(
        "Perhaps you haven't run '{invocation} --branch={branch} init' for this directory?"
    )
}

/// Hint for `init` on a branch some other directory already uses.
pub fn pick_another_branch(branch: &str) -> String {
    format!(
        "Each backed up directory needs its own branch; choose a name other than '{branch}' with --branch"
    )
}

/// Hint for a ref that does not resolve in `show`/`extract`/`restore`.
pub fn check_ref(invocation: &str) -> String {
    format!("List the available commits with '{invocation} git log --oneline'")
}
