// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Version and skip-range handling
//!
//! Bundle versions are semantic versions. Skip ranges use the OLM range
//! syntax: whitespace separated comparators (`>=1.0.0 <1.2.0`), optionally
//! joined with `||` alternatives.

use semver::{BuildMetadata, Version, VersionReq};
use std::fmt;

/// Parse a bundle version, accepting an optional leading `v`.
///
/// Build metadata is dropped: it has no precedence, so `1.0.0+a` and
/// `1.0.0+b` are the same bundle version.
pub fn parse_version(raw: &str) -> Result<Version, semver::Error> {
    let trimmed = raw.trim();
    let mut version = Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))?;
    version.build = BuildMetadata::EMPTY;
    Ok(version)
}

/// Key of a version in the `bundle_versions` index. Unparseable versions
/// are keyed by their trimmed text.
pub fn version_key(raw: &str) -> String {
    parse_version(raw)
        .map(|version| version.to_string())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// A parsed skip range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl SkipRange {
    pub fn parse(raw: &str) -> Result<Self, semver::Error> {
        let alternatives = raw
            .split("||")
            .map(|alternative| VersionReq::parse(&normalize_comparators(alternative)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.trim().to_string(),
            alternatives,
        })
    }

    /// Whether a bundle at `version` may upgrade directly to the bundle
    /// declaring this range.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SkipRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// `>=1.0.0 <1.2.0` -> `>=1.0.0, <1.2.0`
fn normalize_comparators(alternative: &str) -> String {
    let alternative = alternative.trim();
    if alternative.contains(',') {
        return alternative.to_string();
    }

    let mut comparators: Vec<String> = Vec::new();
    for token in alternative.split_whitespace() {
        // A bare operator such as `>=` followed by a space belongs to the next token
        match comparators.last_mut() {
            Some(last) if last.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) => {
                last.push_str(token)
            }
            _ => comparators.push(token.to_string()),
        }
    }
    comparators.join(", ")
}
