//! Expected-decision table for the verifier harness.
//!
//! Each principal may carry explicit per-key expectations and a default that
//! applies to every catalog leaf not listed explicitly. A leaf with neither
//! is reported as `Unchecked`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PrincipalExpectations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<bool>,
    #[serde(default)]
    keys: BTreeMap<String, bool>,
}

/// What each representative principal should be granted.
///
/// ```rust,ignore
/// let table = ExpectationTable::new()
///     .expect_default("root", true)
///     .expect_default("alice", false)
///     .expect("alice", "north.hr.single", true);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectationTable {
    principals: BTreeMap<String, PrincipalExpectations>,
}

impl ExpectationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `principal` to resolve `key` to `granted`.
    pub fn expect(mut self, principal: &str, key: &str, granted: bool) -> Self {
        self.principals
            .entry(principal.to_string())
            .or_default()
            .keys
            .insert(key.to_string(), granted);
        self
    }

    /// Expect `principal` to resolve every unlisted leaf to `granted`.
    pub fn expect_default(mut self, principal: &str, granted: bool) -> Self {
        self.principals
            .entry(principal.to_string())
            .or_default()
            .default = Some(granted);
        self
    }

    /// The expected decision for one key, explicit entries first.
    pub fn expected(&self, principal: &str, key: &str) -> Option<bool> {
        let entry = self.principals.get(principal)?;
        entry.keys.get(key).copied().or(entry.default)
    }

    /// Explicitly listed keys for `principal`, in key order.
    pub fn explicit_keys(&self, principal: &str) -> impl Iterator<Item = (&str, bool)> {
        self.principals
            .get(principal)
            .into_iter()
            .flat_map(|e| e.keys.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    /// Principals that have any expectation recorded.
    pub fn principals(&self) -> impl Iterator<Item = &str> {
        self.principals.keys().map(String::as_str)
    }
}
