//! Unique preset names within one user's collection

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::naming::BASE_NAME;

/// How the collision counter is attached to the base name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixFormat {
    /// `New Preset 1`
    #[default]
    Spaced,
    /// `New Preset(1)`
    Parenthesized,
}

impl SuffixFormat {
    fn apply(self, base: &str, counter: usize) -> String {
        match self {
            SuffixFormat::Spaced => format!("{base} {counter}"),
            SuffixFormat::Parenthesized => format!("{base}({counter})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameGenerator {
    base: String,
    format: SuffixFormat,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new(BASE_NAME, SuffixFormat::default())
    }
}

impl NameGenerator {
    pub fn new(base: impl Into<String>, format: SuffixFormat) -> Self {
        Self {
            base: base.into(),
            format,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn format(&self) -> SuffixFormat {
        self.format
    }

    /// Unique name derived from the configured base name
    pub fn next(&self, existing: &HashSet<String>) -> String {
        self.unique(&self.base, existing)
    }

    /// `candidate` itself if unused, otherwise the first free suffixed form.
    /// At most `existing.len() + 1` names are tried.
    pub fn unique(&self, candidate: &str, existing: &HashSet<String>) -> String {
        if !existing.contains(candidate) {
            return candidate.to_string();
        }
        (1..=existing.len() + 1)
            .map(|counter| self.format.apply(candidate, counter))
            .find(|name| !existing.contains(name))
            // Pigeonhole: len + 1 distinct names cannot all be taken
            .unwrap_or_else(|| self.format.apply(candidate, existing.len() + 1))
    }
}
