// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! REDB graph store implementation

use log::{debug, info};
use redb::{
    Database, ReadOnlyTable, ReadTransaction, ReadableTable, TableDefinition, TableHandle,
};
use std::path::{Path, PathBuf};

use super::schema::{
    self, BUNDLES, BUNDLE_VERSIONS, CHANNELS, CHANNEL_ENTRIES, CURRENT_SCHEMA_VERSION,
    MIGRATIONS, PACKAGES, SCHEMA_META, SCHEMA_VERSION_KEY,
};
use super::types::{StorageError, StorageResult, StorageType};
use super::{check_schema_version, scan_version, GraphMutation, GraphStore};
use crate::error::Result;
use crate::graph::PackageGraph;

/// Default database file name when a directory is given
pub const DEFAULT_DATABASE_FILE: &str = "bundles.redb";

/// Graph store backed by a single redb database file.
///
/// redb serializes write transactions and gives readers MVCC snapshots, so
/// queries only ever observe committed package graphs. A write transaction
/// dropped without commit is aborted.
pub struct RedbGraphStore {
    db: Database,
    path: PathBuf,
}

impl RedbGraphStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        // REDB requires a file path, not a directory
        let db_path = if path.as_ref().is_dir() {
            path.as_ref().join(DEFAULT_DATABASE_FILE)
        } else {
            path.as_ref().to_path_buf()
        };

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(&db_path)?;
        debug!("Opened redb catalog at {:?}", db_path);

        Ok(Self { db, path: db_path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_version(&self) -> StorageResult<u32> {
        let txn = self.db.begin_read()?;
        let Some(meta) = open_read(&txn, SCHEMA_META)? else {
            return Ok(0);
        };
        Ok(meta
            .get(SCHEMA_VERSION_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    fn ensure_current(&self) -> StorageResult<()> {
        check_schema_version(self.read_version()?)
    }

    fn load_committed(&self, package: &str) -> StorageResult<PackageGraph> {
        let version = self.read_version()?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::SchemaTooNew {
                found: version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        let txn = self.db.begin_read()?;
        let Some(packages) = open_read(&txn, PACKAGES)? else {
            return Ok(PackageGraph::empty(package));
        };
        let channels = require_read(&txn, CHANNELS)?;
        let bundles = require_read(&txn, BUNDLES)?;
        let entries = require_read(&txn, CHANNEL_ENTRIES)?;

        schema::read_graph(&packages, &channels, &bundles, &entries, package)
    }

    fn package_names(&self) -> StorageResult<Vec<String>> {
        let txn = self.db.begin_read()?;
        let Some(packages) = open_read(&txn, PACKAGES)? else {
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        for item in packages.iter()? {
            let (name, _) = item?;
            names.push(name.value().to_string());
        }
        Ok(names)
    }

    /// `None` when the index is not built yet
    fn indexed_version(
        &self,
        package: &str,
        version: &str,
    ) -> StorageResult<Option<Option<String>>> {
        let schema_version = self.read_version()?;
        if schema_version > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::SchemaTooNew {
                found: schema_version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if schema_version < CURRENT_SCHEMA_VERSION {
            return Ok(None);
        }

        let txn = self.db.begin_read()?;
        let versions = require_read(&txn, BUNDLE_VERSIONS)?;
        let row = schema::version_row(package, version);
        Ok(Some(
            versions.get(row.as_str())?.map(|name| name.value().to_string()),
        ))
    }

    fn apply_migrations(&self) -> StorageResult<u32> {
        let mut version = self.read_version()?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(StorageError::SchemaTooNew {
                found: version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        let start = version;
        for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
            let txn = self.db.begin_write()?;
            (migration.apply)(&txn)?;
            txn.open_table(SCHEMA_META)?
                .insert(SCHEMA_VERSION_KEY, migration.version)?;
            txn.commit()?;

            info!(
                "Applied catalog migration {}: {}",
                migration.version, migration.description
            );
            version = migration.version;
        }

        Ok(version)
    }
}

fn open_read<K, V>(
    txn: &ReadTransaction,
    definition: TableDefinition<K, V>,
) -> StorageResult<Option<ReadOnlyTable<K, V>>>
where
    K: redb::Key + 'static,
    V: redb::Value + 'static,
{
    match txn.open_table(definition) {
        Ok(table) => Ok(Some(table)),
        Err(redb::TableError::TableDoesNotExist(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn require_read<K, V>(
    txn: &ReadTransaction,
    definition: TableDefinition<K, V>,
) -> StorageResult<ReadOnlyTable<K, V>>
where
    K: redb::Key + 'static,
    V: redb::Value + 'static,
{
    let name = definition.name().to_string();
    open_read(txn, definition)?
        .ok_or_else(|| StorageError::Corrupt(format!("table {} is missing", name)))
}

impl GraphStore for RedbGraphStore {
    fn migrate(&self) -> Result<u32> {
        Ok(self.apply_migrations()?)
    }

    fn schema_version(&self) -> Result<u32> {
        Ok(self.read_version()?)
    }

    fn load(&self, package: &str) -> Result<PackageGraph> {
        Ok(self.load_committed(package)?)
    }

    fn list_packages(&self) -> Result<Vec<String>> {
        Ok(self.package_names()?)
    }

    fn update(&self, package: &str, apply: &mut GraphMutation<'_>) -> Result<()> {
        self.ensure_current()?;

        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let before = {
            let packages = txn.open_table(PACKAGES).map_err(StorageError::from)?;
            let channels = txn.open_table(CHANNELS).map_err(StorageError::from)?;
            let bundles = txn.open_table(BUNDLES).map_err(StorageError::from)?;
            let entries = txn.open_table(CHANNEL_ENTRIES).map_err(StorageError::from)?;
            schema::read_graph(&packages, &channels, &bundles, &entries, package)?
        };

        let mut graph = before.clone();
        // An error here drops `txn`, which aborts it
        apply(&mut graph)?;

        if graph == before {
            txn.abort().map_err(StorageError::from)?;
            return Ok(());
        }

        graph.check()?;
        schema::write_graph(&txn, &graph)?;
        txn.commit().map_err(StorageError::from)?;
        debug!("Committed package {}", package);
        Ok(())
    }

    fn delete(&self, package: &str) -> Result<Option<PackageGraph>> {
        self.ensure_current()?;

        let txn = self.db.begin_write().map_err(StorageError::from)?;
        let existing = {
            let packages = txn.open_table(PACKAGES).map_err(StorageError::from)?;
            let channels = txn.open_table(CHANNELS).map_err(StorageError::from)?;
            let bundles = txn.open_table(BUNDLES).map_err(StorageError::from)?;
            let entries = txn.open_table(CHANNEL_ENTRIES).map_err(StorageError::from)?;
            schema::read_graph(&packages, &channels, &bundles, &entries, package)?
        };

        if existing.is_empty() {
            txn.abort().map_err(StorageError::from)?;
            return Ok(None);
        }

        schema::clear_graph(&txn, package)?;
        txn.commit().map_err(StorageError::from)?;
        debug!("Deleted package {}", package);
        Ok(Some(existing))
    }

    fn find_version(&self, package: &str, version: &str) -> Result<Option<String>> {
        match self.indexed_version(package, version)? {
            Some(found) => Ok(found),
            None => Ok(scan_version(self.load(package)?, version)),
        }
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Redb
    }
}
