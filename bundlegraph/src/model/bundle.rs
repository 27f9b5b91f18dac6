// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Persisted graph nodes: bundles, channels and channel entries

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::descriptor::BundleDescriptor;
use super::version::{parse_version, SkipRange};

/// One installable version of a package. Immutable once persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub name: String,
    pub package: String,
    pub version: String,
    pub replaces: Option<String>,
    pub skips: Vec<String>,
    pub skip_range: Option<String>,
    pub image: Option<String>,
    pub manifest: String,
}

impl Bundle {
    /// Parsed semantic version; `None` only for rows written outside the
    /// populator.
    pub fn semver(&self) -> Option<Version> {
        parse_version(&self.version).ok()
    }

    pub fn parsed_skip_range(&self) -> Option<SkipRange> {
        self.skip_range
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| SkipRange::parse(raw).ok())
    }
}

impl From<&BundleDescriptor> for Bundle {
    fn from(descriptor: &BundleDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            package: descriptor.package.clone(),
            version: descriptor.version.clone(),
            replaces: descriptor.replaces.clone(),
            skips: descriptor.skips.clone(),
            skip_range: descriptor
                .skip_range
                .clone()
                .filter(|raw| !raw.trim().is_empty()),
            image: descriptor.image.clone(),
            manifest: descriptor.manifest.clone(),
        }
    }
}

/// A bundle's membership in one channel with its outgoing replaces edges
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub bundle: String,
    /// Bundles (in the same channel) this entry replaces
    pub replaces: BTreeSet<String>,
}

impl ChannelEntry {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            replaces: BTreeSet::new(),
        }
    }
}

/// A named upgrade track within a package
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub head: Option<String>,
    pub entries: BTreeMap<String, ChannelEntry>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head: None,
            entries: BTreeMap::new(),
        }
    }

    pub fn contains(&self, bundle: &str) -> bool {
        self.entries.contains_key(bundle)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outgoing replaces edges as `(source, target)` pairs
    pub fn replaces_edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.values().flat_map(|entry| {
            entry
                .replaces
                .iter()
                .map(move |target| (entry.bundle.as_str(), target.as_str()))
        })
    }
}
