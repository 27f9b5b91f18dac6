// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Fake collaborators: image registries, manifest parser, store, observer

use bundlegraph::error::Result;
use bundlegraph::storage::{GraphMutation, StorageError};
use bundlegraph::{
    BundleDescriptor, CatalogError, EventFields, GraphStore, ImageRegistry, ManifestParser,
    MemoryGraphStore, Observer, PackageGraph, RegistryOptions, RegistryProvider, StorageType,
};
use log::Level;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const DESCRIPTOR_FILE: &str = "descriptor.json";

/// What the fake registry does for one reference
#[derive(Clone)]
pub enum FakeImage {
    /// Unpacks to this descriptor
    Bundle(BundleDescriptor),
    /// Unpacks to content no parser accepts
    Garbage,
    /// Pull fails
    Unreachable,
}

/// Shared record of what the fake registries were asked to do
#[derive(Default)]
pub struct RegistryLog {
    pub pulled: Vec<String>,
    pub unpacked_into: Vec<PathBuf>,
    pub destroyed: usize,
    pub created: usize,
}

/// Provider of registries serving a fixed set of images
#[derive(Clone, Default)]
pub struct FakeRegistryProvider {
    images: Arc<HashMap<String, FakeImage>>,
    pub log: Arc<Mutex<RegistryLog>>,
    fail_destroy: bool,
}

impl FakeRegistryProvider {
    pub fn new(images: Vec<(&str, FakeImage)>) -> Self {
        Self {
            images: Arc::new(
                images
                    .into_iter()
                    .map(|(reference, image)| (reference.to_string(), image))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }
}

impl RegistryProvider for FakeRegistryProvider {
    fn create(&self, _options: &RegistryOptions) -> Result<Box<dyn ImageRegistry>> {
        self.log.lock().unwrap().created += 1;
        Ok(Box::new(FakeRegistry {
            images: self.images.clone(),
            log: self.log.clone(),
            fail_destroy: self.fail_destroy,
        }))
    }
}

struct FakeRegistry {
    images: Arc<HashMap<String, FakeImage>>,
    log: Arc<Mutex<RegistryLog>>,
    fail_destroy: bool,
}

impl ImageRegistry for FakeRegistry {
    fn pull(&self, reference: &str) -> Result<()> {
        self.log.lock().unwrap().pulled.push(reference.to_string());
        match self.images.get(reference) {
            Some(FakeImage::Unreachable) | None => Err(CatalogError::UnpackFailure {
                reference: reference.to_string(),
                reason: "manifest unknown".to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    fn unpack(&self, reference: &str, dest: &Path) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .unpacked_into
            .push(dest.to_path_buf());
        let content = match self.images.get(reference) {
            Some(FakeImage::Bundle(descriptor)) => serde_json::to_string(descriptor).unwrap(),
            _ => "not json".to_string(),
        };
        std::fs::write(dest.join(DESCRIPTOR_FILE), content).unwrap();
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        self.log.lock().unwrap().destroyed += 1;
        if self.fail_destroy {
            return Err(CatalogError::UnpackFailure {
                reference: "cache".to_string(),
                reason: "busy".to_string(),
            });
        }
        Ok(())
    }
}

/// Reads the descriptor the fake registry unpacked
pub struct FakeManifestParser;

impl ManifestParser for FakeManifestParser {
    fn parse(&self, dir: &Path, reference: &str) -> Result<BundleDescriptor> {
        let raw = std::fs::read_to_string(dir.join(DESCRIPTOR_FILE)).map_err(|e| {
            CatalogError::ManifestParseFailure {
                origin: reference.to_string(),
                reason: e.to_string(),
            }
        })?;
        serde_json::from_str(&raw).map_err(|e| CatalogError::ManifestParseFailure {
            origin: reference.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Memory store whose writes to one package fail like a broken disk
pub struct FailingStore {
    inner: MemoryGraphStore,
    broken_package: String,
}

impl FailingStore {
    pub fn new(broken_package: &str) -> Self {
        Self {
            inner: MemoryGraphStore::new(),
            broken_package: broken_package.to_string(),
        }
    }

    fn check(&self, package: &str) -> Result<()> {
        if package == self.broken_package {
            return Err(StorageError::Backend("disk I/O error".to_string()).into());
        }
        Ok(())
    }
}

impl GraphStore for FailingStore {
    fn migrate(&self) -> Result<u32> {
        self.inner.migrate()
    }

    fn schema_version(&self) -> Result<u32> {
        self.inner.schema_version()
    }

    fn load(&self, package: &str) -> Result<PackageGraph> {
        self.inner.load(package)
    }

    fn list_packages(&self) -> Result<Vec<String>> {
        self.inner.list_packages()
    }

    fn update(&self, package: &str, apply: &mut GraphMutation<'_>) -> Result<()> {
        self.check(package)?;
        self.inner.update(package, apply)
    }

    fn delete(&self, package: &str) -> Result<Option<PackageGraph>> {
        self.check(package)?;
        self.inner.delete(package)
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}

/// Observer keeping every event for assertions
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<(Level, String, String)>>,
}

impl RecordingObserver {
    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _, _)| *l == level)
            .map(|(_, fields, message)| format!("{} {}", message, fields))
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn event(&self, level: Level, fields: &EventFields, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push((level, fields.to_string(), message.to_string()));
    }
}
