// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog data model
//!
//! This module provides:
//! - Bundle descriptors produced from unpacked bundle images
//! - Persisted bundle, channel and channel-entry records
//! - Semantic version and skip-range parsing
//! - Insertion policies (upgrade mode, duplicate handling)

pub mod bundle;
pub mod descriptor;
pub mod version;

pub use bundle::{Bundle, Channel, ChannelEntry};
pub use descriptor::BundleDescriptor;
pub use version::{parse_version, version_key, SkipRange};

use serde::{Deserialize, Serialize};

/// How a bundle without explicit replaces targets is linked into a channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeMode {
    /// Presume the new bundle replaces the channel's current head
    #[default]
    Replaces,
    /// Link the new bundle after its immediate semver predecessor
    Semver,
}

impl std::str::FromStr for UpgradeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "replaces" => Ok(UpgradeMode::Replaces),
            "semver" => Ok(UpgradeMode::Semver),
            _ => Err(format!(
                "Unknown upgrade mode: {}. Valid options: replaces, semver",
                s
            )),
        }
    }
}

impl std::fmt::Display for UpgradeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpgradeMode::Replaces => write!(f, "replaces"),
            UpgradeMode::Semver => write!(f, "semver"),
        }
    }
}

/// What to do when a bundle's (package, version) is already present
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail the item with `DuplicateBundle`
    #[default]
    Reject,
    /// Leave the stored bundle untouched and report the item as skipped
    Ignore,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(DuplicatePolicy::Reject),
            "ignore" => Ok(DuplicatePolicy::Ignore),
            _ => Err(format!(
                "Unknown duplicate policy: {}. Valid options: reject, ignore",
                s
            )),
        }
    }
}

impl std::fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicatePolicy::Reject => write!(f, "reject"),
            DuplicatePolicy::Ignore => write!(f, "ignore"),
        }
    }
}
