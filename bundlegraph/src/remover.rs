// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Whole-package removal

use serde::Serialize;
use std::sync::Arc;

use crate::error::{CatalogError, Result};
use crate::observer::{EventFields, Observer};
use crate::storage::GraphStore;

/// What a removal deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalSummary {
    pub package: String,
    pub channels: usize,
    pub bundles: usize,
}

/// Deletes packages with all their channels, bundles and edges
pub struct Remover {
    store: Arc<dyn GraphStore>,
    observer: Arc<dyn Observer>,
}

impl Remover {
    pub fn new(store: Arc<dyn GraphStore>, observer: Arc<dyn Observer>) -> Self {
        Self { store, observer }
    }

    /// Remove `package` in one transaction. Removing an unknown package is
    /// always `PackageNotFound`, so a repeated removal fails deterministically.
    pub fn remove_package(&self, package: &str) -> Result<RemovalSummary> {
        let fields = EventFields::new().package(package);
        let Some(removed) = self.store.delete(package)? else {
            self.observer.debug(&fields, "package not present");
            return Err(CatalogError::PackageNotFound {
                package: package.to_string(),
            });
        };

        let summary = RemovalSummary {
            package: package.to_string(),
            channels: removed.channels.len(),
            bundles: removed.bundles.len(),
        };
        self.observer.info(
            &fields,
            &format!(
                "removed package with {} bundles in {} channels",
                summary.bundles, summary.channels
            ),
        );
        Ok(summary)
    }
}
