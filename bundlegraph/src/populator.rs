// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Bundle insertion
//!
//! One insert is one store transaction. For every channel the bundle
//! declares, its replaces targets are chosen, the entry is added and the
//! channel head recomputed. A cycle, fork or dangling reference aborts the
//! whole transaction.

use semver::Version;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{CatalogError, Result};
use crate::graph::PackageGraph;
use crate::model::{Bundle, BundleDescriptor, Channel, ChannelEntry, DuplicatePolicy, UpgradeMode};
use crate::observer::{EventFields, Observer};
use crate::storage::{GraphStore, StorageError};

/// Insertion policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulatorOptions {
    pub mode: UpgradeMode,
    pub on_duplicate: DuplicatePolicy,
}

impl PopulatorOptions {
    pub fn new(mode: UpgradeMode) -> Self {
        Self {
            mode,
            on_duplicate: DuplicatePolicy::default(),
        }
    }
}

/// Result of a successful insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Bundle committed; `heads` lists `(channel, head)` for every channel
    /// the bundle joined
    Inserted {
        bundle: String,
        heads: Vec<(String, String)>,
    },
    /// Same (package, version) already stored and duplicates are ignored
    Skipped { bundle: String },
}

/// Inserts bundles into the package graph
pub struct Populator {
    store: Arc<dyn GraphStore>,
    options: PopulatorOptions,
    observer: Arc<dyn Observer>,
}

impl Populator {
    pub fn new(
        store: Arc<dyn GraphStore>,
        options: PopulatorOptions,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            store,
            options,
            observer,
        }
    }

    pub fn options(&self) -> PopulatorOptions {
        self.options
    }

    /// Insert one bundle, or change nothing at all
    pub fn insert(&self, descriptor: &BundleDescriptor) -> Result<InsertOutcome> {
        let (version, _) = descriptor.validate()?;
        let fields = EventFields::new()
            .package(&descriptor.package)
            .version(&descriptor.version);

        let mut outcome = None;
        self.store.update(&descriptor.package, &mut |graph| {
            outcome = Some(self.apply(graph, descriptor, &version)?);
            Ok(())
        })?;
        let outcome = outcome.ok_or_else(|| {
            StorageError::Backend(format!(
                "store did not run the insert of {}",
                descriptor.name
            ))
        })?;

        match &outcome {
            InsertOutcome::Inserted { bundle, heads } => {
                for (channel, head) in heads {
                    self.observer.debug(
                        &fields.clone().channel(channel),
                        &format!("channel head is now {}", head),
                    );
                }
                self.observer
                    .info(&fields, &format!("added bundle {}", bundle));
            }
            InsertOutcome::Skipped { bundle } => {
                self.observer.warn(
                    &fields,
                    &format!("bundle {} already present, skipping", bundle),
                );
            }
        }
        Ok(outcome)
    }

    fn apply(
        &self,
        graph: &mut PackageGraph,
        descriptor: &BundleDescriptor,
        version: &Version,
    ) -> Result<InsertOutcome> {
        let existing = graph
            .bundle(&descriptor.name)
            .or_else(|| graph.bundle_by_version(version));
        if let Some(existing) = existing {
            return match self.options.on_duplicate {
                DuplicatePolicy::Reject => Err(CatalogError::DuplicateBundle {
                    package: descriptor.package.clone(),
                    version: descriptor.version.clone(),
                    bundle: existing.name.clone(),
                }),
                DuplicatePolicy::Ignore => Ok(InsertOutcome::Skipped {
                    bundle: existing.name.clone(),
                }),
            };
        }

        if let Some(target) = &descriptor.replaces {
            if !graph.bundles.contains_key(target) {
                return Err(CatalogError::inconsistency(
                    &descriptor.package,
                    descriptor.channels.first().map(String::as_str).unwrap_or_default(),
                    format!(
                        "bundle {} replaces nonexistent bundle {}",
                        descriptor.name, target
                    ),
                ));
            }
        }

        graph
            .bundles
            .insert(descriptor.name.clone(), Bundle::from(descriptor));

        if let Some(default) = &descriptor.default_channel {
            graph.default_channel = Some(default.clone());
        } else if graph.default_channel.is_none() {
            graph.default_channel = descriptor.channels.first().cloned();
        }

        let mut heads = Vec::with_capacity(descriptor.channels.len());
        for channel_name in &descriptor.channels {
            let targets = self.link(graph, channel_name, descriptor, version);

            let channel = graph
                .channels
                .entry(channel_name.clone())
                .or_insert_with(|| Channel::new(channel_name.as_str()));
            channel.entries.insert(
                descriptor.name.clone(),
                ChannelEntry {
                    bundle: descriptor.name.clone(),
                    replaces: targets,
                },
            );

            let head = graph.check_channel(channel_name)?;
            if let Some(channel) = graph.channels.get_mut(channel_name) {
                channel.head = head.clone();
            }
            if let Some(head) = head {
                heads.push((channel_name.clone(), head));
            }
        }

        Ok(InsertOutcome::Inserted {
            bundle: descriptor.name.clone(),
            heads,
        })
    }

    /// Choose the replaces targets of the new bundle in one channel. In
    /// semver mode this may also re-point the successor at the new bundle.
    fn link(
        &self,
        graph: &mut PackageGraph,
        channel_name: &str,
        descriptor: &BundleDescriptor,
        version: &Version,
    ) -> BTreeSet<String> {
        let Some(channel) = graph.channels.get(channel_name) else {
            return BTreeSet::new();
        };

        if descriptor.has_explicit_edges() {
            let targets: BTreeSet<String> = descriptor
                .explicit_targets()
                .filter(|target| channel.contains(target))
                .map(String::from)
                .collect();
            // Only dangling skips: link as if nothing explicit was declared
            if !targets.is_empty() || descriptor.replaces.is_some() {
                return targets;
            }
        }

        match self.options.mode {
            UpgradeMode::Replaces => channel.head.iter().cloned().collect(),
            UpgradeMode::Semver => {
                let (predecessor, successor) = neighbours(graph, channel, version);
                if let Some(successor) = successor {
                    splice(graph, channel_name, &successor, predecessor.as_deref(), &descriptor.name);
                }
                predecessor.into_iter().collect()
            }
        }
    }
}

/// Closest lower and higher versioned bundles of a channel
fn neighbours(
    graph: &PackageGraph,
    channel: &Channel,
    version: &Version,
) -> (Option<String>, Option<String>) {
    let mut below: Option<(Version, &str)> = None;
    let mut above: Option<(Version, &str)> = None;

    for name in channel.entries.keys() {
        let Some(other) = graph.bundle(name).and_then(Bundle::semver) else {
            continue;
        };
        if &other < version && below.as_ref().map_or(true, |(v, _)| &other > v) {
            below = Some((other, name.as_str()));
        } else if &other > version && above.as_ref().map_or(true, |(v, _)| &other < v) {
            above = Some((other, name.as_str()));
        }
    }

    (
        below.map(|(_, name)| name.to_string()),
        above.map(|(_, name)| name.to_string()),
    )
}

/// Make `successor` replace `inserted` instead of `predecessor`, keeping the
/// channel one version-ordered chain
fn splice(
    graph: &mut PackageGraph,
    channel_name: &str,
    successor: &str,
    predecessor: Option<&str>,
    inserted: &str,
) {
    let Some(entry) = graph
        .channels
        .get_mut(channel_name)
        .and_then(|channel| channel.entries.get_mut(successor))
    else {
        return;
    };

    match predecessor {
        Some(predecessor) if entry.replaces.remove(predecessor) => {
            entry.replaces.insert(inserted.to_string());
        }
        None if entry.replaces.is_empty() => {
            entry.replaces.insert(inserted.to_string());
        }
        _ => {}
    }
}
