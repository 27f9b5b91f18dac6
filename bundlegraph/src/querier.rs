// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Read-only catalog queries
//!
//! Every query loads a committed snapshot through the [`GraphLoader`], so an
//! in-flight insert or removal is never observed.

use serde::Serialize;
use std::sync::Arc;

use crate::error::{CatalogError, Result};
use crate::graph::{PackageGraph, Replacement};
use crate::loader::GraphLoader;
use crate::model::Bundle;
use crate::storage::GraphStore;

/// One channel of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelSummary {
    pub name: String,
    pub head: Option<String>,
    pub bundles: usize,
}

/// Package overview: channels, heads and default channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    pub name: String,
    pub default_channel: Option<String>,
    pub channels: Vec<ChannelSummary>,
}

/// Read-only access to the catalog
#[derive(Clone)]
pub struct Querier {
    loader: GraphLoader,
}

impl Querier {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            loader: GraphLoader::new(store),
        }
    }

    pub fn list_packages(&self) -> Result<Vec<String>> {
        self.loader.packages()
    }

    pub fn get_package(&self, package: &str) -> Result<PackageSummary> {
        let graph = self.loader.load_existing(package)?;
        Ok(PackageSummary {
            name: graph.name.clone(),
            default_channel: graph.default_channel.clone(),
            channels: graph
                .channels
                .values()
                .map(|channel| ChannelSummary {
                    name: channel.name.clone(),
                    head: channel.head.clone(),
                    bundles: channel.entries.len(),
                })
                .collect(),
        })
    }

    pub fn list_channels(&self, package: &str) -> Result<Vec<String>> {
        let graph = self.loader.load_existing(package)?;
        Ok(graph.channels.keys().cloned().collect())
    }

    pub fn default_channel(&self, package: &str) -> Result<Option<String>> {
        Ok(self.loader.load_existing(package)?.default_channel)
    }

    /// Head bundle of a channel
    pub fn channel_head(&self, package: &str, channel: &str) -> Result<String> {
        let graph = self.loader.load_existing(package)?;
        graph
            .channel(channel)
            .and_then(|c| c.head.clone())
            .ok_or_else(|| channel_not_found(package, channel))
    }

    /// All bundles of a package, newest version first. Empty for an unknown
    /// package.
    pub fn list_bundles(&self, package: &str) -> Result<Vec<Bundle>> {
        let graph = self.loader.load(package)?;
        Ok(sorted_newest_first(graph.bundles.into_values().collect()))
    }

    /// Bundle by name or version
    pub fn get_bundle(&self, package: &str, key: &str) -> Result<Bundle> {
        let graph = self.loader.load_existing(package)?;
        if let Some(bundle) = graph.bundle(key) {
            return Ok(bundle.clone());
        }
        self.loader
            .store()
            .find_version(package, key)?
            .and_then(|name| graph.bundles.get(&name).cloned())
            .ok_or_else(|| bundle_not_found(package, key))
    }

    /// Bundles of one channel, newest version first
    pub fn bundles_for_channel(&self, package: &str, channel: &str) -> Result<Vec<Bundle>> {
        let graph = self.loader.load_existing(package)?;
        let entries = graph
            .channel(channel)
            .ok_or_else(|| channel_not_found(package, channel))?;
        let bundles = entries
            .entries
            .keys()
            .filter_map(|name| graph.bundle(name).cloned())
            .collect();
        Ok(sorted_newest_first(bundles))
    }

    /// Upgrade path between two bundles (by version or name), walking
    /// replaces and skip-range edges
    pub fn bundle_path(
        &self,
        package: &str,
        channel: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<String>> {
        let graph = self.loader.load_existing(package)?;
        let (from_bundle, to_bundle) = resolve_pair(&graph, channel, from, to)?;

        graph
            .upgrade_path(channel, &from_bundle, &to_bundle)
            .ok_or_else(|| CatalogError::NoPathFound {
                package: package.to_string(),
                channel: channel.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Bundles that may be installed over `bundle` in `channel`
    pub fn replacements(
        &self,
        package: &str,
        channel: &str,
        bundle: &str,
    ) -> Result<Vec<Replacement>> {
        let graph = self.loader.load_existing(package)?;
        if graph.channel(channel).is_none() {
            return Err(channel_not_found(package, channel));
        }
        let resolved = graph
            .resolve_in_channel(channel, bundle)
            .map(|b| b.name.clone())
            .ok_or_else(|| bundle_not_found(package, bundle))?;
        Ok(graph.replacements(channel, &resolved))
    }
}

fn resolve_pair(
    graph: &PackageGraph,
    channel: &str,
    from: &str,
    to: &str,
) -> Result<(String, String)> {
    if graph.channel(channel).is_none() {
        return Err(channel_not_found(&graph.name, channel));
    }
    let resolve = |key: &str| {
        graph
            .resolve_in_channel(channel, key)
            .map(|bundle| bundle.name.clone())
            .ok_or_else(|| bundle_not_found(&graph.name, key))
    };
    Ok((resolve(from)?, resolve(to)?))
}

fn sorted_newest_first(mut bundles: Vec<Bundle>) -> Vec<Bundle> {
    bundles.sort_by(|a, b| b.semver().cmp(&a.semver()).then_with(|| a.name.cmp(&b.name)));
    bundles
}

fn channel_not_found(package: &str, channel: &str) -> CatalogError {
    CatalogError::ChannelNotFound {
        package: package.to_string(),
        channel: channel.to_string(),
    }
}

fn bundle_not_found(package: &str, bundle: &str) -> CatalogError {
    CatalogError::BundleNotFound {
        package: package.to_string(),
        bundle: bundle.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;
    use crate::model::BundleDescriptor;
    use crate::observer::NoopObserver;
    use crate::populator::{Populator, PopulatorOptions};
    use crate::storage::MemoryGraphStore;

    fn seeded() -> Querier {
        let store: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::migrated());
        let populator = Populator::new(
            store.clone(),
            PopulatorOptions::default(),
            Arc::new(NoopObserver),
        );
        for (version, skip_range) in [("1.0.0", None), ("1.1.0", None), ("1.2.0", Some("<1.1.0"))] {
            let mut descriptor =
                BundleDescriptor::new(format!("foo.v{}", version), "foo", version).in_channel("stable");
            descriptor.skip_range = skip_range.map(String::from);
            populator.insert(&descriptor).unwrap();
        }
        Querier::new(store)
    }

    #[test]
    fn test_package_overview() {
        let querier = seeded();
        assert_eq!(querier.list_packages().unwrap(), vec!["foo"]);
        assert_eq!(querier.channel_head("foo", "stable").unwrap(), "foo.v1.2.0");
        assert_eq!(querier.list_channels("foo").unwrap(), vec!["stable"]);
        assert_eq!(querier.default_channel("foo").unwrap().as_deref(), Some("stable"));

        let summary = querier.get_package("foo").unwrap();
        assert_eq!(summary.channels.len(), 1);
        assert_eq!(summary.channels[0].bundles, 3);

        let versions: Vec<String> = querier
            .list_bundles("foo")
            .unwrap()
            .into_iter()
            .map(|b| b.version)
            .collect();
        assert_eq!(versions, vec!["1.2.0", "1.1.0", "1.0.0"]);
    }

    #[test]
    fn test_lookup_errors() {
        let querier = seeded();
        assert!(matches!(
            querier.channel_head("bar", "stable"),
            Err(CatalogError::PackageNotFound { .. })
        ));
        assert!(matches!(
            querier.channel_head("foo", "alpha"),
            Err(CatalogError::ChannelNotFound { .. })
        ));
        assert!(matches!(
            querier.get_bundle("foo", "9.9.9"),
            Err(CatalogError::BundleNotFound { .. })
        ));
        assert_eq!(querier.get_bundle("foo", "1.1.0").unwrap().name, "foo.v1.1.0");
        assert_eq!(querier.get_bundle("foo", "v1.1.0+rebuild").unwrap().name, "foo.v1.1.0");
        assert!(querier.list_bundles("bar").unwrap().is_empty());
    }

    #[test]
    fn test_bundle_path_uses_skip_range() {
        let querier = seeded();
        assert_eq!(
            querier.bundle_path("foo", "stable", "1.0.0", "1.2.0").unwrap(),
            vec!["foo.v1.0.0", "foo.v1.2.0"]
        );
        assert_eq!(
            querier.bundle_path("foo", "stable", "foo.v1.1.0", "1.2.0").unwrap(),
            vec!["foo.v1.1.0", "foo.v1.2.0"]
        );
        assert!(matches!(
            querier.bundle_path("foo", "stable", "1.2.0", "1.0.0"),
            Err(CatalogError::NoPathFound { .. })
        ));
        assert!(matches!(
            querier.bundle_path("foo", "stable", "1.0.0", "3.0.0"),
            Err(CatalogError::BundleNotFound { .. })
        ));
    }

    #[test]
    fn test_replacements() {
        let querier = seeded();
        let replacements = querier.replacements("foo", "stable", "1.0.0").unwrap();
        assert_eq!(
            replacements,
            vec![
                Replacement {
                    bundle: "foo.v1.1.0".to_string(),
                    via: EdgeKind::Replaces
                },
                Replacement {
                    bundle: "foo.v1.2.0".to_string(),
                    via: EdgeKind::SkipRange
                },
            ]
        );
        let bundles = querier.bundles_for_channel("foo", "stable").unwrap();
        assert_eq!(bundles[0].name, "foo.v1.2.0");
    }
}
