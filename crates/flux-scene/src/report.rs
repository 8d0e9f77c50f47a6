//! Error and status aggregation across one build.
//!
//! Failures are kept twice: as a set of invalid primitive names, which
//! collapses repeats, and as an ordered list of issues carrying the element
//! path and id for display.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The element produced no geometry.
    #[default]
    Error,
    /// The element built, but something was off.
    Warning,
}

/// One element-level problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildIssue {
    /// Canonical primitive name, or the raw name when unsupported.
    pub primitive: String,
    /// User-supplied id of the element.
    pub id: Option<String>,
    /// Location in the input, such as `$[2].Entities.wall`.
    pub path: String,
    /// Human-readable description.
    pub message: String,
    /// Seriousness.
    pub severity: Severity,
}

impl fmt::Display for BuildIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.primitive, self.path)?;
        if let Some(id) = &self.id {
            write!(f, " (id {id})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Aggregated problems of a build. Composes by union across recursion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    invalid: BTreeSet<String>,
    issues: Vec<BuildIssue>,
}

impl BuildReport {
    /// Empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an issue. Errors also mark the primitive name invalid.
    pub fn record(&mut self, issue: BuildIssue) {
        if issue.severity == Severity::Error {
            self.invalid.insert(issue.primitive.clone());
        }
        self.issues.push(issue);
    }

    /// Fold another report into this one.
    pub fn union(&mut self, other: BuildReport) {
        self.invalid.extend(other.invalid);
        self.issues.extend(other.issues);
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Primitive names that failed at least once.
    pub fn invalid_prims(&self) -> &BTreeSet<String> {
        &self.invalid
    }

    /// Every issue in traversal order.
    pub fn issues(&self) -> &[BuildIssue] {
        &self.issues
    }

    /// Issues for one element id.
    pub fn issues_for_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a BuildIssue> + 'a {
        self.issues.iter().filter(move |i| i.id.as_deref() == Some(id))
    }

    /// Human-readable digest, one line per issue. Empty when nothing failed.
    pub fn summary(&self) -> String {
        if self.issues.is_empty() {
            return String::new();
        }
        let kinds: Vec<&str> = self.invalid.iter().map(String::as_str).collect();
        let mut out = format!(
            "{} element(s) failed to build; invalid primitives: {}",
            self.issues.len(),
            if kinds.is_empty() { "none".to_string() } else { kinds.join(", ") }
        );
        for issue in &self.issues {
            out.push_str("\n  ");
            out.push_str(&issue.to_string());
        }
        out
    }
}
