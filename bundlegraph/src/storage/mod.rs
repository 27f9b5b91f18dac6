// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Graph storage for the package/channel/bundle catalog
//!
//! This module provides:
//! - The [`GraphStore`] trait every storage driver implements
//! - A persistent redb driver with versioned, forward-only migrations
//! - An in-memory driver with identical transactional semantics
//!
//! All mutations go through [`GraphStore::update`] or
//! [`GraphStore::delete`], each of which runs as one transaction: the
//! package graph is loaded, changed, checked and committed, or nothing is
//! written at all.

mod memory;
mod redb;
pub mod schema;
mod types;

pub use self::memory::MemoryGraphStore;
pub use self::redb::RedbGraphStore;
pub use schema::CURRENT_SCHEMA_VERSION;
pub use types::{StorageError, StorageResult, StorageType};

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::graph::PackageGraph;
use crate::model::version_key;

/// Mutation applied to a package graph inside a store transaction
pub type GraphMutation<'a> = dyn FnMut(&mut PackageGraph) -> Result<()> + 'a;

/// Persistent, transactional storage for package graphs
pub trait GraphStore: Send + Sync {
    /// Bring the schema to [`CURRENT_SCHEMA_VERSION`]. Idempotent; returns the
    /// resulting schema version.
    fn migrate(&self) -> Result<u32>;

    /// Schema version currently recorded in the store (0 when fresh)
    fn schema_version(&self) -> Result<u32>;

    /// Committed state of one package; an empty graph if the package is unknown
    fn load(&self, package: &str) -> Result<PackageGraph>;

    /// Names of all packages with at least one bundle, sorted
    fn list_packages(&self) -> Result<Vec<String>>;

    /// Run `apply` against the package's graph in one write transaction.
    ///
    /// The changed graph is checked and committed only if `apply` returns
    /// `Ok`; any error (or panic) leaves the store exactly as it was.
    fn update(&self, package: &str, apply: &mut GraphMutation<'_>) -> Result<()>;

    /// Delete a package with all its channels, bundles and edges in one
    /// transaction. Returns the removed graph, or `None` if it did not exist.
    fn delete(&self, package: &str) -> Result<Option<PackageGraph>>;

    /// Name of the committed bundle of `package` at `version`, compared by
    /// semver precedence
    fn find_version(&self, package: &str, version: &str) -> Result<Option<String>> {
        Ok(scan_version(self.load(package)?, version))
    }

    fn storage_type(&self) -> StorageType;
}

/// Open the storage driver selected by `storage_type`. `path` is ignored by
/// the in-memory driver.
pub fn open_store(storage_type: StorageType, path: &Path) -> Result<Arc<dyn GraphStore>> {
    let store: Arc<dyn GraphStore> = match storage_type {
        StorageType::Redb => Arc::new(RedbGraphStore::open(path)?),
        StorageType::Memory => Arc::new(MemoryGraphStore::new()),
    };
    log::debug!("Opened {} graph store", storage_type);
    Ok(store)
}

fn scan_version(graph: PackageGraph, version: &str) -> Option<String> {
    let key = version_key(version);
    graph
        .bundles
        .into_values()
        .find(|bundle| version_key(&bundle.version) == key)
        .map(|bundle| bundle.name)
}

fn check_schema_version(found: u32) -> StorageResult<()> {
    if found > CURRENT_SCHEMA_VERSION {
        return Err(StorageError::SchemaTooNew {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    if found < CURRENT_SCHEMA_VERSION {
        return Err(StorageError::NotMigrated {
            found,
            required: CURRENT_SCHEMA_VERSION,
        });
    }
    Ok(())
}
