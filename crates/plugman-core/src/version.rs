use std::fmt;
use std::str::FromStr;

use semver::VersionReq;
use thiserror::Error;

pub use semver::Version;

/// Error type for version and constraint parsing
#[derive(Debug, Error)]
pub enum VersionError {
    /// The string is not a valid semantic version
    #[error("Invalid semantic version '{input}': {message}")]
    InvalidVersion { input: String, message: String },

    /// The string is not a valid version constraint
    #[error("Invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },
}

/// Parses a semantic version string like "1.2.3" or "1.0.0-alpha".
///
/// Ordering of the returned [`Version`] follows semver rules: the numeric
/// triple is compared first, and a release always orders above a
/// pre-release of the same triple.
pub fn parse(input: &str) -> Result<Version, VersionError> {
    Version::parse(input.trim()).map_err(|e| VersionError::InvalidVersion {
        input: input.to_string(),
        message: e.to_string(),
    })
}

/// A version constraint expression evaluated against plugin versions.
///
/// Supported operators: `=`, `>=`, `<=`, `>`, `<`, `^` (same major, or same
/// minor while major is 0) and `~` (same minor). Clauses separated by
/// whitespace are a logical AND, e.g. `">=1.0.0 <2.0.0"`. A bare version
/// with no operator means exact equality.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    /// The original constraint string (e.g. "^1.2.3", ">=1.0.0 <2.0.0")
    constraint: String,
    /// One parsed requirement per whitespace-separated clause
    clauses: Vec<VersionReq>,
}

impl VersionConstraint {
    /// Parses a constraint expression.
    pub fn parse(constraint: &str) -> Result<Self, VersionError> {
        let source = constraint.trim();
        if source.is_empty() {
            return Err(VersionError::InvalidConstraint {
                constraint: constraint.to_string(),
                message: "constraint is empty".to_string(),
            });
        }

        let mut clauses = Vec::new();
        for clause in Self::clause_sources(source) {
            let normalized = if clause.starts_with(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
                clause
            } else {
                // Bare version means exact equality, not the caret default
                format!("={clause}")
            };
            let req = VersionReq::parse(&normalized).map_err(|e| VersionError::InvalidConstraint {
                constraint: source.to_string(),
                message: e.to_string(),
            })?;
            clauses.push(req);
        }

        Ok(Self {
            constraint: source.to_string(),
            clauses,
        })
    }

    /// Splits a constraint into clause strings, re-attaching operators that
    /// were separated from their version by whitespace (">= 1.0.0").
    fn clause_sources(constraint: &str) -> Vec<String> {
        let mut clauses: Vec<String> = Vec::new();
        let mut pending_op: Option<&str> = None;

        for token in constraint.split_whitespace() {
            match pending_op.take() {
                Some(op) => clauses.push(format!("{op}{token}")),
                None => {
                    if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '^' | '~')) {
                        pending_op = Some(token);
                    } else {
                        clauses.push(token.to_string());
                    }
                }
            }
        }

        // A dangling operator falls through and fails to parse as a clause
        if let Some(op) = pending_op {
            clauses.push(op.to_string());
        }

        clauses
    }

    /// Checks whether a specific version satisfies every clause.
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|req| req.matches(version))
    }

    /// Returns the original constraint string.
    pub fn constraint_string(&self) -> &str {
        &self.constraint
    }
}

/// Display shows the original constraint string.
impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constraint)
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionConstraint::parse(s)
    }
}

/// Checks plugin compatibility against the running system version.
#[derive(Debug, Clone)]
pub struct VersionChecker {
    system: Version,
}

impl VersionChecker {
    /// Creates a checker for the given system version.
    pub fn new(system: Version) -> Self {
        Self { system }
    }

    /// Parses the system version string and creates a checker.
    pub fn from_version_str(system: &str) -> Result<Self, VersionError> {
        Ok(Self::new(parse(system)?))
    }

    /// The system version plugins are checked against.
    pub fn system_version(&self) -> &Version {
        &self.system
    }

    /// Evaluates a constraint string against the system version.
    pub fn is_compatible(&self, constraint: &str) -> Result<bool, VersionError> {
        Ok(VersionConstraint::parse(constraint)?.matches(&self.system))
    }

    /// Evaluates a constraint string against an arbitrary version.
    pub fn version_satisfies(version: &Version, constraint: &str) -> Result<bool, VersionError> {
        Ok(VersionConstraint::parse(constraint)?.matches(version))
    }
}
