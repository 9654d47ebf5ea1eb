//! Token table produced by a single masking operation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token → original text for one [`mask`](crate::mask) call
///
/// Keys are the exact token strings inserted into the masked text
/// (`[PII_EMAIL_1]`), values are the substrings they replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PiiMapping {
    entries: BTreeMap<String, String>,
}

impl PiiMapping {
    /// Create an empty mapping
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no token was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Original text for a token
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(String::as_str)
    }

    /// Iterate over `(token, original)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Length in bytes of the longest token
    #[must_use]
    pub fn longest_token(&self) -> usize {
        self.entries.keys().map(String::len).max().unwrap_or(0)
    }

    pub(crate) fn insert(&mut self, token: String, original: String) {
        self.entries.insert(token, original);
    }
}

impl FromIterator<(String, String)> for PiiMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
