// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Package graph: the channel/bundle/edge state of one package
//!
//! A [`PackageGraph`] is what the store loads and persists per package. It
//! owns the structural checks run before any commit:
//! - replaces edges inside a channel form a DAG
//! - a non-empty channel has exactly one head (no incoming replaces edge)
//! - skip-range edges never point back up the replaces chain

use petgraph::algo::{astar, is_cyclic_directed};
use petgraph::graphmap::DiGraphMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{CatalogError, Result};
use crate::model::{Bundle, Channel};

/// Kind of an upgrade edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Explicit or derived replaces edge; participates in head computation
    Replaces,
    /// Advisory edge derived from a skip range
    SkipRange,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Replaces => write!(f, "replaces"),
            EdgeKind::SkipRange => write!(f, "skip-range"),
        }
    }
}

/// A bundle that may upgrade from some other bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub bundle: String,
    pub via: EdgeKind,
}

/// Current graph state of one package
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackageGraph {
    pub name: String,
    pub default_channel: Option<String>,
    pub bundles: BTreeMap<String, Bundle>,
    pub channels: BTreeMap<String, Channel>,
}

impl PackageGraph {
    /// Graph of a package with no bundles yet
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn bundle(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(name)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Find a bundle by semantic version
    pub fn bundle_by_version(&self, version: &Version) -> Option<&Bundle> {
        self.bundles
            .values()
            .find(|bundle| bundle.semver().as_ref() == Some(version))
    }

    /// Find a bundle of `channel` by version string or bundle name
    pub fn resolve_in_channel(&self, channel: &str, key: &str) -> Option<&Bundle> {
        let channel = self.channels.get(channel)?;
        if channel.contains(key) {
            return self.bundles.get(key);
        }
        let version = crate::model::parse_version(key).ok()?;
        channel
            .entries
            .keys()
            .filter_map(|name| self.bundles.get(name))
            .find(|bundle| bundle.semver().as_ref() == Some(&version))
    }

    /// Bundles of a channel with no incoming replaces edge
    pub fn channel_heads(&self, channel: &str) -> Vec<String> {
        let Some(channel) = self.channels.get(channel) else {
            return Vec::new();
        };

        let replaced: BTreeSet<&str> = channel.replaces_edges().map(|(_, target)| target).collect();
        channel
            .entries
            .keys()
            .filter(|name| !replaced.contains(name.as_str()))
            .cloned()
            .collect()
    }

    /// Replaces edges of a channel as a graph; an edge `a -> b` means a replaces b
    fn replaces_graph<'a>(&'a self, channel: &'a Channel) -> DiGraphMap<&'a str, EdgeKind> {
        let mut graph = DiGraphMap::new();
        for name in channel.entries.keys() {
            graph.add_node(name.as_str());
        }
        for (source, target) in channel.replaces_edges() {
            graph.add_edge(source, target, EdgeKind::Replaces);
        }
        graph
    }

    /// Skip-range edges of a channel as `(source, target)`: source's skip range
    /// covers target's version.
    pub fn skip_edges(&self, channel: &str) -> Vec<(String, String)> {
        let Some(channel) = self.channels.get(channel) else {
            return Vec::new();
        };

        let members: Vec<&Bundle> = channel
            .entries
            .keys()
            .filter_map(|name| self.bundles.get(name))
            .collect();

        let mut edges = Vec::new();
        for source in &members {
            let Some(range) = source.parsed_skip_range() else {
                continue;
            };
            for target in &members {
                if source.name == target.name {
                    continue;
                }
                if let Some(version) = target.semver() {
                    if range.matches(&version) {
                        edges.push((source.name.clone(), target.name.clone()));
                    }
                }
            }
        }
        edges
    }

    /// Upgrade graph of a channel; an edge `a -> b` means b may be installed
    /// over a. Replaces edges win over skip-range edges between the same pair.
    pub fn upgrade_graph<'a>(&'a self, channel: &'a Channel) -> DiGraphMap<&'a str, EdgeKind> {
        let mut graph = DiGraphMap::new();
        for name in channel.entries.keys() {
            graph.add_node(name.as_str());
        }
        for (source, target) in self.skip_edges(&channel.name) {
            if let (Some((source, _)), Some((target, _))) = (
                channel.entries.get_key_value(&source),
                channel.entries.get_key_value(&target),
            ) {
                graph.add_edge(target.as_str(), source.as_str(), EdgeKind::SkipRange);
            }
        }
        for (source, target) in channel.replaces_edges() {
            graph.add_edge(target, source, EdgeKind::Replaces);
        }
        graph
    }

    /// Verify the channel invariants and return its head.
    ///
    /// Fails with `GraphInconsistency` on a replaces cycle, a skip range that
    /// points back up the replaces chain, zero heads or several heads.
    pub fn check_channel(&self, channel_name: &str) -> Result<Option<String>> {
        let Some(channel) = self.channels.get(channel_name) else {
            return Ok(None);
        };
        if channel.is_empty() {
            return Ok(None);
        }

        for (source, target) in channel.replaces_edges() {
            if !channel.contains(target) {
                return Err(CatalogError::inconsistency(
                    &self.name,
                    channel_name,
                    format!("{} replaces {} which is not in the channel", source, target),
                ));
            }
        }

        if is_cyclic_directed(&self.replaces_graph(channel)) {
            return Err(CatalogError::inconsistency(
                &self.name,
                channel_name,
                "cycle detected in replaces chain",
            ));
        }

        if is_cyclic_directed(&self.upgrade_graph(channel)) {
            return Err(CatalogError::inconsistency(
                &self.name,
                channel_name,
                "skip range contradicts the replaces chain",
            ));
        }

        let heads = self.channel_heads(channel_name);
        match heads.as_slice() {
            [head] => Ok(Some(head.clone())),
            [] => Err(CatalogError::inconsistency(
                &self.name,
                channel_name,
                "no channel head",
            )),
            many => Err(CatalogError::inconsistency(
                &self.name,
                channel_name,
                format!("multiple channel heads: {}", many.join(", ")),
            )),
        }
    }

    /// Verify every channel and that stored heads match the computed ones
    pub fn check(&self) -> Result<()> {
        for (name, channel) in &self.channels {
            let head = self.check_channel(name)?;
            if head != channel.head {
                return Err(CatalogError::inconsistency(
                    &self.name,
                    name,
                    format!(
                        "stored head {:?} differs from computed head {:?}",
                        channel.head, head
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Shortest upgrade path between two bundles of a channel, walking
    /// replaces and skip-range edges.
    pub fn upgrade_path(&self, channel: &str, from: &str, to: &str) -> Option<Vec<String>> {
        let channel = self.channels.get(channel)?;
        if !channel.contains(from) || !channel.contains(to) {
            return None;
        }

        let graph = self.upgrade_graph(channel);
        astar(&graph, from, |node| node == to, |_| 1usize, |_| 0)
            .map(|(_, path)| path.into_iter().map(str::to_string).collect())
    }

    /// Bundles that may be installed over `bundle` within a channel
    pub fn replacements(&self, channel: &str, bundle: &str) -> Vec<Replacement> {
        let Some(channel) = self.channels.get(channel) else {
            return Vec::new();
        };
        if !channel.contains(bundle) {
            return Vec::new();
        }

        let graph = self.upgrade_graph(channel);
        let mut replacements: Vec<Replacement> = graph
            .edges(bundle)
            .map(|(_, successor, kind)| Replacement {
                bundle: successor.to_string(),
                via: *kind,
            })
            .collect();
        replacements.sort_by(|a, b| a.bundle.cmp(&b.bundle));
        replacements
    }
}
