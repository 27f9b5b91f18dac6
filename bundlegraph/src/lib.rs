// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! BundleGraph - operator bundle catalog graph engine
//!
//! Ingests operator bundles (one deployable version of a package plus its
//! upgrade metadata) and maintains a persistent graph of
//! packages, channels and bundles whose edges encode upgrade paths.
//!
//! # Components
//! - [`GraphStore`]: transactional storage (redb or in-memory)
//! - [`GraphLoader`]: committed graph state of one package
//! - [`Populator`]: inserts one bundle, computing and checking its edges
//! - [`Remover`]: deletes a whole package
//! - [`Querier`]: read-only access to heads, bundles and upgrade paths
//! - [`CatalogUpdater`]: sequential add/delete batches over image references

pub mod config;
pub mod error;
pub mod graph;
pub mod image;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod observer;
pub mod populator;
pub mod querier;
pub mod remover;
pub mod storage;
pub mod updater;

pub use config::CatalogConfig;
pub use error::{BatchError, CatalogError, ItemFailure, Result};
pub use graph::{EdgeKind, PackageGraph, Replacement};
pub use image::{
    ContainerTool, DefaultRegistryProvider, ImageRegistry, RegistryOptions, RegistryProvider,
};
pub use loader::GraphLoader;
pub use manifest::{DirectoryManifestParser, ManifestParser};
pub use model::{Bundle, BundleDescriptor, Channel, DuplicatePolicy, UpgradeMode};
pub use observer::{EventFields, LogObserver, NoopObserver, Observer};
pub use populator::{InsertOutcome, Populator, PopulatorOptions};
pub use querier::{ChannelSummary, PackageSummary, Querier};
pub use remover::{RemovalSummary, Remover};
pub use storage::{open_store, GraphStore, MemoryGraphStore, RedbGraphStore, StorageType};
pub use updater::{
    AddToRegistryRequest, BatchReport, CatalogUpdater, DeleteFromRegistryRequest, ItemReport,
    ItemState,
};
