//! Execution labels.
//!
//! Labels are ordered key/value pairs. Keys starting with `system.` are
//! reserved for values the platform sets itself (origin, correlation id) and
//! are never copied from user-controlled sources such as flow definitions or
//! backfill requests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A key/value label attached to a flow, trigger, backfill or execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// Label key.
    pub key: String,
    /// Label value.
    pub value: String,
}

impl Label {
    /// Prefix of platform-managed labels.
    pub const SYSTEM_PREFIX: &'static str = "system.";
    /// Label carrying the id that correlates executions started by one another.
    pub const CORRELATION_ID: &'static str = "system.correlationId";
    /// Label recording what created the execution.
    pub const FROM: &'static str = "system.from";

    /// Creates a new label.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns true if the key is in the reserved `system.` namespace.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.key.starts_with(Self::SYSTEM_PREFIX)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

/// Returns the labels that are not in the `system.` namespace.
#[must_use]
pub fn without_system_labels(labels: &[Label]) -> Vec<Label> {
    labels.iter().filter(|l| !l.is_system()).cloned().collect()
}

/// Merges `overrides` into `base`.
///
/// A label whose key already exists replaces the earlier value in place, so
/// the first occurrence of a key decides its position. New keys are appended.
#[must_use]
pub fn merge_labels(base: Vec<Label>, overrides: impl IntoIterator<Item = Label>) -> Vec<Label> {
    let mut merged = base;
    for label in overrides {
        match merged.iter_mut().find(|existing| existing.key == label.key) {
            Some(existing) => existing.value = label.value,
            None => merged.push(label),
        }
    }
    merged
}
