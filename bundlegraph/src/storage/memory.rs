// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory graph store

use parking_lot::RwLock;
use std::collections::BTreeMap;

use super::schema::{CURRENT_SCHEMA_VERSION, MIGRATIONS};
use super::types::{StorageError, StorageType};
use super::{check_schema_version, GraphMutation, GraphStore};
use crate::error::Result;
use crate::graph::PackageGraph;

/// Graph store kept entirely in memory.
///
/// Mutations run against a clone of the package graph and are swapped in
/// only after they succeed, so a failing or panicking mutation leaves the
/// committed state untouched. The write lock serializes writers; readers
/// only see swapped-in graphs.
#[derive(Default)]
pub struct MemoryGraphStore {
    packages: RwLock<BTreeMap<String, PackageGraph>>,
    schema_version: RwLock<u32>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that is already at the current schema version
    pub fn migrated() -> Self {
        let store = Self::new();
        *store.schema_version.write() = CURRENT_SCHEMA_VERSION;
        store
    }
}

impl GraphStore for MemoryGraphStore {
    fn migrate(&self) -> Result<u32> {
        let mut version = self.schema_version.write();
        if *version > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::SchemaTooNew {
                found: *version,
                supported: CURRENT_SCHEMA_VERSION,
            }
            .into());
        }
        let start = *version;
        for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
            log::debug!(
                "Applied catalog migration {}: {}",
                migration.version,
                migration.description
            );
            *version = migration.version;
        }
        Ok(*version)
    }

    fn schema_version(&self) -> Result<u32> {
        Ok(*self.schema_version.read())
    }

    fn load(&self, package: &str) -> Result<PackageGraph> {
        Ok(self
            .packages
            .read()
            .get(package)
            .cloned()
            .unwrap_or_else(|| PackageGraph::empty(package)))
    }

    fn list_packages(&self) -> Result<Vec<String>> {
        Ok(self.packages.read().keys().cloned().collect())
    }

    fn update(&self, package: &str, apply: &mut GraphMutation<'_>) -> Result<()> {
        check_schema_version(*self.schema_version.read())?;

        let mut packages = self.packages.write();
        let before = packages
            .get(package)
            .cloned()
            .unwrap_or_else(|| PackageGraph::empty(package));

        let mut graph = before.clone();
        apply(&mut graph)?;

        if graph == before {
            return Ok(());
        }

        graph.check()?;
        if graph.is_empty() {
            packages.remove(package);
        } else {
            packages.insert(package.to_string(), graph);
        }
        Ok(())
    }

    fn delete(&self, package: &str) -> Result<Option<PackageGraph>> {
        check_schema_version(*self.schema_version.read())?;
        Ok(self.packages.write().remove(package))
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}
