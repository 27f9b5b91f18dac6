// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Persistent schema: table layout, row encoding and migrations
//!
//! Tables (keys are `/`-joined, package first, so one package is one key
//! range):
//! - `schema_meta`      `schema_version` -> u32
//! - `packages`         `pkg` -> PackageRecord
//! - `channels`         `pkg/channel` -> ChannelRecord
//! - `bundles`          `pkg/bundle` -> Bundle
//! - `channel_entries`  `pkg/channel/bundle` -> EntryRecord
//! - `bundle_versions`  `pkg/version` -> bundle name (migration 2), version
//!   without build metadata

use redb::{ReadableTable, Table, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};

use super::types::{StorageError, StorageResult};
use crate::graph::PackageGraph;
use crate::model::{version_key, Bundle, Channel, ChannelEntry};

pub const CURRENT_SCHEMA_VERSION: u32 = 2;

pub(crate) const SCHEMA_META: TableDefinition<&str, u32> = TableDefinition::new("schema_meta");
pub(crate) const SCHEMA_VERSION_KEY: &str = "schema_version";

pub(crate) const PACKAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("packages");
pub(crate) const CHANNELS: TableDefinition<&str, &[u8]> = TableDefinition::new("channels");
pub(crate) const BUNDLES: TableDefinition<&str, &[u8]> = TableDefinition::new("bundles");
pub(crate) const CHANNEL_ENTRIES: TableDefinition<&str, &[u8]> =
    TableDefinition::new("channel_entries");
pub(crate) const BUNDLE_VERSIONS: TableDefinition<&str, &str> =
    TableDefinition::new("bundle_versions");

/// One forward-only schema step
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub apply: fn(&WriteTransaction) -> StorageResult<()>,
}

pub(crate) const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create package, channel, bundle and channel entry tables",
        apply: create_graph_tables,
    },
    Migration {
        version: 2,
        description: "index bundles by package and version",
        apply: index_bundle_versions,
    },
];

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PackageRecord {
    pub name: String,
    pub default_channel: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ChannelRecord {
    pub name: String,
    pub head: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct EntryRecord {
    pub channel: String,
    pub bundle: String,
    pub replaces: Vec<String>,
}

pub(crate) fn key(parts: &[&str]) -> String {
    parts.join("/")
}

/// `bundle_versions` key of a bundle version
pub(crate) fn version_row(package: &str, version: &str) -> String {
    key(&[package, &version_key(version)])
}

/// Key bounds covering every row of a package. '0' sorts right after '/'.
pub(crate) fn package_bounds(package: &str) -> (String, String) {
    (format!("{}/", package), format!("{}0", package))
}

fn create_graph_tables(txn: &WriteTransaction) -> StorageResult<()> {
    txn.open_table(PACKAGES)?;
    txn.open_table(CHANNELS)?;
    txn.open_table(BUNDLES)?;
    txn.open_table(CHANNEL_ENTRIES)?;
    Ok(())
}

fn index_bundle_versions(txn: &WriteTransaction) -> StorageResult<()> {
    let bundles = txn.open_table(BUNDLES)?;
    let mut versions = txn.open_table(BUNDLE_VERSIONS)?;

    let mut rows = Vec::new();
    for item in bundles.iter()? {
        let (_, value) = item?;
        let bundle: Bundle = bincode::deserialize(value.value())?;
        rows.push((version_row(&bundle.package, &bundle.version), bundle.name));
    }
    for (version_key, name) in &rows {
        versions.insert(version_key.as_str(), name.as_str())?;
    }

    log::debug!("Indexed {} existing bundles by version", rows.len());
    Ok(())
}

/// Read one package's rows from any readable view of the tables
pub(crate) fn read_graph<P, C, B, E>(
    packages: &P,
    channels: &C,
    bundles: &B,
    entries: &E,
    package: &str,
) -> StorageResult<PackageGraph>
where
    P: ReadableTable<&'static str, &'static [u8]>,
    C: ReadableTable<&'static str, &'static [u8]>,
    B: ReadableTable<&'static str, &'static [u8]>,
    E: ReadableTable<&'static str, &'static [u8]>,
{
    let mut graph = PackageGraph::empty(package);

    let record: PackageRecord = match packages.get(package)? {
        Some(row) => bincode::deserialize(row.value())?,
        None => return Ok(graph),
    };
    graph.default_channel = record.default_channel;

    let (start, end) = package_bounds(package);

    for item in bundles.range(start.as_str()..end.as_str())? {
        let (_, value) = item?;
        let bundle: Bundle = bincode::deserialize(value.value())?;
        graph.bundles.insert(bundle.name.clone(), bundle);
    }

    for item in channels.range(start.as_str()..end.as_str())? {
        let (_, value) = item?;
        let record: ChannelRecord = bincode::deserialize(value.value())?;
        let mut channel = Channel::new(record.name.clone());
        channel.head = record.head;
        graph.channels.insert(record.name, channel);
    }

    for item in entries.range(start.as_str()..end.as_str())? {
        let (row_key, value) = item?;
        let record: EntryRecord = bincode::deserialize(value.value())?;
        let channel = graph.channels.get_mut(&record.channel).ok_or_else(|| {
            StorageError::Corrupt(format!(
                "entry {} references unknown channel {}",
                row_key.value(),
                record.channel
            ))
        })?;
        if !graph.bundles.contains_key(&record.bundle) {
            return Err(StorageError::Corrupt(format!(
                "entry {} references unknown bundle {}",
                row_key.value(),
                record.bundle
            )));
        }
        channel.entries.insert(
            record.bundle.clone(),
            ChannelEntry {
                bundle: record.bundle,
                replaces: record.replaces.into_iter().collect(),
            },
        );
    }

    Ok(graph)
}

fn remove_range<V: redb::Value + 'static>(
    table: &mut Table<'_, &'static str, V>,
    package: &str,
) -> StorageResult<usize> {
    let (start, end) = package_bounds(package);
    let keys = table
        .range(start.as_str()..end.as_str())?
        .map(|item| item.map(|(row_key, _)| row_key.value().to_string()))
        .collect::<Result<Vec<String>, redb::StorageError>>()?;

    for row_key in &keys {
        table.remove(row_key.as_str())?;
    }
    Ok(keys.len())
}

/// Delete every row of a package
pub(crate) fn clear_graph(txn: &WriteTransaction, package: &str) -> StorageResult<()> {
    txn.open_table(PACKAGES)?.remove(package)?;
    remove_range(&mut txn.open_table(CHANNELS)?, package)?;
    remove_range(&mut txn.open_table(BUNDLES)?, package)?;
    remove_range(&mut txn.open_table(CHANNEL_ENTRIES)?, package)?;
    remove_range(&mut txn.open_table(BUNDLE_VERSIONS)?, package)?;
    Ok(())
}

/// Replace a package's rows with the contents of `graph`
pub(crate) fn write_graph(txn: &WriteTransaction, graph: &PackageGraph) -> StorageResult<()> {
    clear_graph(txn, &graph.name)?;
    if graph.is_empty() {
        return Ok(());
    }

    let record = PackageRecord {
        name: graph.name.clone(),
        default_channel: graph.default_channel.clone(),
    };
    txn.open_table(PACKAGES)?
        .insert(graph.name.as_str(), bincode::serialize(&record)?.as_slice())?;

    {
        let mut bundles = txn.open_table(BUNDLES)?;
        let mut versions = txn.open_table(BUNDLE_VERSIONS)?;
        for bundle in graph.bundles.values() {
            let row = bincode::serialize(bundle)?;
            bundles.insert(key(&[&graph.name, &bundle.name]).as_str(), row.as_slice())?;
            versions.insert(
                version_row(&graph.name, &bundle.version).as_str(),
                bundle.name.as_str(),
            )?;
        }
    }

    {
        let mut channels = txn.open_table(CHANNELS)?;
        let mut entries = txn.open_table(CHANNEL_ENTRIES)?;
        for channel in graph.channels.values() {
            let record = ChannelRecord {
                name: channel.name.clone(),
                head: channel.head.clone(),
            };
            channels.insert(
                key(&[&graph.name, &channel.name]).as_str(),
                bincode::serialize(&record)?.as_slice(),
            )?;

            for entry in channel.entries.values() {
                let record = EntryRecord {
                    channel: channel.name.clone(),
                    bundle: entry.bundle.clone(),
                    replaces: entry.replaces.iter().cloned().collect(),
                };
                entries.insert(
                    key(&[&graph.name, &channel.name, &entry.bundle]).as_str(),
                    bincode::serialize(&record)?.as_slice(),
                )?;
            }
        }
    }

    Ok(())
}
