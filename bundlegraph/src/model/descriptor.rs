// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Bundle descriptors handed to the populator

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::version::{parse_version, SkipRange};
use crate::error::{CatalogError, Result};

/// One bundle's identity, channel memberships and declared upgrade edges.
///
/// Produced by a [`ManifestParser`](crate::manifest::ManifestParser) from an
/// unpacked bundle, or built directly by library callers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BundleDescriptor {
    /// Unique CSV-style bundle name, e.g. `etcdoperator.v0.9.2`
    pub name: String,
    pub package: String,
    pub version: String,
    pub channels: Vec<String>,
    pub default_channel: Option<String>,
    /// Explicit bundle this one replaces
    pub replaces: Option<String>,
    /// Further explicit bundles this one replaces
    pub skips: Vec<String>,
    pub skip_range: Option<String>,
    /// Image reference the bundle was unpacked from
    pub image: Option<String>,
    /// Opaque manifest blob
    pub manifest: String,
}

impl BundleDescriptor {
    pub fn new(
        name: impl Into<String>,
        package: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    pub fn in_channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.push(channel.into());
        self
    }

    pub fn replacing(mut self, bundle: impl Into<String>) -> Self {
        self.replaces = Some(bundle.into());
        self
    }

    pub fn skipping(mut self, bundle: impl Into<String>) -> Self {
        self.skips.push(bundle.into());
        self
    }

    pub fn with_skip_range(mut self, range: impl Into<String>) -> Self {
        self.skip_range = Some(range.into());
        self
    }

    pub fn with_default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = Some(channel.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Whether the descriptor names any explicit replaces target
    pub fn has_explicit_edges(&self) -> bool {
        self.replaces.is_some() || !self.skips.is_empty()
    }

    /// Explicit replaces targets: `replaces` first, then `skips`
    pub fn explicit_targets(&self) -> impl Iterator<Item = &str> {
        self.replaces
            .iter()
            .chain(self.skips.iter())
            .map(String::as_str)
    }

    fn origin(&self) -> String {
        match &self.image {
            Some(image) => image.clone(),
            None if self.name.is_empty() => "<unnamed bundle>".to_string(),
            None => self.name.clone(),
        }
    }

    /// Check structural well-formedness and parse the version fields.
    pub fn validate(&self) -> Result<(Version, Option<SkipRange>)> {
        let origin = self.origin();

        if self.name.trim().is_empty() {
            return Err(CatalogError::manifest(origin, "bundle name is empty"));
        }
        if self.package.trim().is_empty() {
            return Err(CatalogError::manifest(origin, "package name is empty"));
        }
        if self.package.contains('/') {
            return Err(CatalogError::manifest(
                origin,
                format!("package name {} contains '/'", self.package),
            ));
        }
        if self.channels.is_empty() {
            return Err(CatalogError::manifest(
                origin,
                format!("bundle {} declares no channels", self.name),
            ));
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.trim().is_empty() || channel.contains('/') {
                return Err(CatalogError::manifest(
                    origin,
                    format!("invalid channel name {:?}", channel),
                ));
            }
            if !seen.insert(channel.as_str()) {
                return Err(CatalogError::manifest(
                    origin,
                    format!("channel {} listed more than once", channel),
                ));
            }
        }

        if let Some(default) = &self.default_channel {
            if !seen.contains(default.as_str()) {
                return Err(CatalogError::manifest(
                    origin,
                    format!(
                        "default channel {} is not one of the bundle's channels",
                        default
                    ),
                ));
            }
        }

        if self.explicit_targets().any(|target| target == self.name) {
            return Err(CatalogError::manifest(
                origin,
                format!("bundle {} replaces itself", self.name),
            ));
        }

        let version = parse_version(&self.version).map_err(|e| {
            CatalogError::manifest(
                origin.clone(),
                format!("invalid version {:?}: {}", self.version, e),
            )
        })?;

        let skip_range = match &self.skip_range {
            Some(raw) if !raw.trim().is_empty() => Some(SkipRange::parse(raw).map_err(|e| {
                CatalogError::manifest(origin.clone(), format!("invalid skip range {:?}: {}", raw, e))
            })?),
            _ => None,
        };

        Ok((version, skip_range))
    }
}
