// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Shared helpers for catalog integration tests

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

use bundlegraph::{GraphStore, MemoryGraphStore, RedbGraphStore};
use std::sync::Arc;
use tempfile::TempDir;

/// Migrated in-memory store
pub fn memory_store() -> Arc<dyn GraphStore> {
    let store = MemoryGraphStore::new();
    store.migrate().expect("Failed to migrate memory store");
    Arc::new(store)
}

/// Migrated redb store in a fresh temp directory; keep the `TempDir` alive
pub fn redb_store() -> (Arc<dyn GraphStore>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = RedbGraphStore::open(temp_dir.path()).expect("Failed to open redb store");
    store.migrate().expect("Failed to migrate redb store");
    (Arc::new(store), temp_dir)
}

/// Both drivers, for tests that must hold on either
pub fn all_stores() -> Vec<(Arc<dyn GraphStore>, Option<TempDir>)> {
    let (redb, temp_dir) = redb_store();
    vec![(memory_store(), None), (redb, Some(temp_dir))]
}
