//! Known-vars set: the instrumenter's compile-time estimate of which local
//! names are in scope at a given AST point.
//!
//! Implemented as a value-copy of a small ordered set of short strings, so
//! the forking property — a child scope's declarations never leak back into
//! its parent — is trivially true: forking is just `.clone()`.

use indexmap::IndexSet;

/// Per-scope, per-branch set of known identifier names. Insertion order is
/// preserved (via [`IndexSet`]) so emitted `vars` snapshots and debug output
/// are deterministic even though map-key order itself isn't semantically
/// significant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownVars {
    names: IndexSet<String>,
}

impl KnownVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh set seeded from a procedure's formal parameters — not
    /// inherited from the enclosing set.
    pub fn from_params(params: &[String]) -> Self {
        let mut set = Self::new();
        for p in params {
            set.insert(p.clone());
        }
        set
    }

    pub fn insert(&mut self, name: String) {
        self.names.insert(name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names currently known, in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    /// Forks a copy for a lexical sub-scope recursion (for-body,
    /// while-body, block, if/elif/else branch, case branch,
    /// try/except/finally, procedure body). The fork is fully independent:
    /// mutating it never affects `self`; forked copies are discarded at
    /// sub-scope exit and never written back into the outer set.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// Forks a copy and seeds it with additional names — used for `for`
    /// loop-bound identifiers, extracted into the fork before recursing.
    pub fn fork_with(&self, extra: impl IntoIterator<Item = String>) -> Self {
        let mut forked = self.fork();
        for name in extra {
            forked.insert(name);
        }
        forked
    }
}
