// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CatalogError, Result};
use crate::image::{ContainerTool, RegistryOptions};
use crate::model::{DuplicatePolicy, UpgradeMode};
use crate::populator::PopulatorOptions;
use crate::storage::{self, GraphStore, StorageType};
use crate::updater::{AddToRegistryRequest, DeleteFromRegistryRequest};

/// Default location of the catalog database
pub const DEFAULT_DATABASE_PATH: &str = "bundles.redb";

/// Settings shared by every catalog operation. Missing fields take their
/// defaults when loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub database: PathBuf,
    pub storage_type: StorageType,
    pub mode: UpgradeMode,
    pub on_duplicate: DuplicatePolicy,
    pub permissive: bool,
    pub container_tool: ContainerTool,
    pub skip_tls: bool,
    pub ca_file: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE_PATH),
            storage_type: StorageType::default(),
            mode: UpgradeMode::default(),
            on_duplicate: DuplicatePolicy::default(),
            permissive: false,
            container_tool: ContainerTool::default(),
            skip_tls: false,
            ca_file: None,
        }
    }
}

impl CatalogConfig {
    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            CatalogError::InvalidConfig(format!("cannot parse {}: {}", path.display(), e))
        })?;
        log::debug!("Loaded catalog config from {:?}", path);
        Ok(config)
    }

    pub fn open_store(&self) -> Result<Arc<dyn GraphStore>> {
        storage::open_store(self.storage_type, &self.database)
    }

    pub fn populator_options(&self) -> PopulatorOptions {
        PopulatorOptions {
            mode: self.mode,
            on_duplicate: self.on_duplicate,
        }
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            container_tool: self.container_tool,
            skip_tls: self.skip_tls,
            ca_file: self.ca_file.clone(),
        }
    }

    pub fn add_request(&self, bundles: Vec<String>) -> AddToRegistryRequest {
        AddToRegistryRequest {
            bundles,
            options: self.populator_options(),
            permissive: self.permissive,
            registry: self.registry_options(),
        }
    }

    pub fn delete_request(&self, packages: Vec<String>) -> DeleteFromRegistryRequest {
        DeleteFromRegistryRequest {
            packages,
            permissive: self.permissive,
        }
    }
}
