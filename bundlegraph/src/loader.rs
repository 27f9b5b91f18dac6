// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Reading committed package graphs

use std::sync::Arc;

use crate::error::{CatalogError, Result};
use crate::graph::PackageGraph;
use crate::storage::GraphStore;

/// Loads the committed graph state of packages
#[derive(Clone)]
pub struct GraphLoader {
    store: Arc<dyn GraphStore>,
}

impl GraphLoader {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// Graph of `package`; empty if the package is unknown
    pub fn load(&self, package: &str) -> Result<PackageGraph> {
        self.store.load(package)
    }

    /// Graph of a package that must exist
    pub fn load_existing(&self, package: &str) -> Result<PackageGraph> {
        let graph = self.store.load(package)?;
        if graph.is_empty() {
            return Err(CatalogError::PackageNotFound {
                package: package.to_string(),
            });
        }
        Ok(graph)
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn packages(&self) -> Result<Vec<String>> {
        self.store.list_packages()
    }
}
