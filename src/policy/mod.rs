//! Path permission policy.
//!
//! A [`PathPolicy`] is an ordered set of [`PathRule`]s loaded once at startup.
//! Each rule grants access up to a ceiling level (metadata/read/write) for
//! everything under its path, or negates access entirely. Any matching
//! negation rule vetoes a request no matter how many allow rules also match —
//! most restrictive wins, independent of rule specificity or order.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AccordError, AccordResult};

/// Access level requested for a path.
///
/// Levels form a total order: `Metadata < Read < Write`. A rule granting a
/// level also grants every level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Metadata,
    Read,
    Write,
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessLevel::Metadata => write!(f, "metadata"),
            AccessLevel::Read => write!(f, "read"),
            AccessLevel::Write => write!(f, "write"),
        }
    }
}

/// Mode configured on a path rule: an access ceiling or a negation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMode {
    Metadata,
    Read,
    Write,
    Negate,
}

impl RuleMode {
    /// Parse a mode from its configuration form. Single letters (`m`/`r`/`w`/`n`)
    /// or full words are accepted; comparison is case-insensitive here only.
    pub fn parse(s: &str) -> AccordResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "metadata" => Ok(RuleMode::Metadata),
            "r" | "read" => Ok(RuleMode::Read),
            "w" | "write" => Ok(RuleMode::Write),
            "n" | "negate" => Ok(RuleMode::Negate),
            other => Err(AccordError::Config(format!(
                "Unknown path rule mode '{other}' (expected m/r/w/n)"
            ))),
        }
    }

    /// The highest access level this mode grants. `Negate` never grants.
    fn ceiling(&self) -> Option<AccessLevel> {
        match self {
            RuleMode::Metadata => Some(AccessLevel::Metadata),
            RuleMode::Read => Some(AccessLevel::Read),
            RuleMode::Write => Some(AccessLevel::Write),
            RuleMode::Negate => None,
        }
    }

    fn grants(&self, level: AccessLevel) -> bool {
        self.ceiling().is_some_and(|ceiling| ceiling >= level)
    }
}

/// A configured path with an access ceiling or negation marker.
///
/// The stored path is absolute and expanded (no `~`, no relative segments);
/// [`PathRule::parse`] enforces this at configuration time. Immutable after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRule {
    pub path: PathBuf,
    pub mode: RuleMode,
}

impl PathRule {
    pub fn new(path: impl AsRef<Path>, mode: RuleMode) -> Self {
        Self {
            path: expand_path(path.as_ref()),
            mode,
        }
    }

    /// Parse a `path:letter` rule spec (e.g. `/home/user/docs:r`, `~/secret:n`).
    pub fn parse(spec: &str) -> AccordResult<Self> {
        let (path, mode) = spec.rsplit_once(':').ok_or_else(|| {
            AccordError::Config(format!("Invalid path rule '{spec}' (expected path:mode)"))
        })?;
        if path.trim().is_empty() {
            return Err(AccordError::Config(format!(
                "Invalid path rule '{spec}' (empty path)"
            )));
        }
        Ok(Self::new(path.trim(), RuleMode::parse(mode)?))
    }

    fn matches(&self, target: &Path) -> bool {
        target.starts_with(&self.path)
    }
}

/// Expand `~` and normalize relative segments without touching the filesystem.
pub fn expand_path(path: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let mut normalized = PathBuf::new();
    for component in Path::new(&expanded).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// The process-wide path permission policy. Loaded once, read-only after.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathPolicy {
    rules: Vec<PathRule>,
}

impl PathPolicy {
    pub fn new(rules: Vec<PathRule>) -> Self {
        Self { rules }
    }

    /// Build a policy from ordered `path:letter` specs.
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> AccordResult<Self> {
        let rules = specs
            .iter()
            .map(|spec| PathRule::parse(spec.as_ref()))
            .collect::<AccordResult<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    /// Decide whether `path` may be accessed at `level`.
    ///
    /// Pure and total: every rule whose path is a component-prefix of the
    /// target is consulted. A matching negation anywhere vetoes; otherwise a
    /// matching rule whose ceiling satisfies the level allows. No match means
    /// denied.
    pub fn is_allowed(&self, path: impl AsRef<Path>, level: AccessLevel) -> bool {
        let target = expand_path(path.as_ref());
        let mut allowed = false;
        let mut negated = false;
        for rule in &self.rules {
            if !rule.matches(&target) {
                continue;
            }
            if rule.mode == RuleMode::Negate {
                negated = true;
            } else if rule.mode.grants(level) {
                allowed = true;
            }
        }
        allowed && !negated
    }
}
