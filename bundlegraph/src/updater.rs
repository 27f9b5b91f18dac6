// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Batch orchestration of registry additions and deletions
//!
//! Items are processed strictly in order by a single writer. Inserting a
//! bundle is not commutative: a bundle that presumes to replace the channel
//! head links differently depending on what was committed before it.
//!
//! Per-item failures are recorded in a [`BatchReport`]. A permissive batch
//! keeps going and aggregates them; otherwise the batch stops at the first
//! failure. A `StoreFailure` always stops the batch.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::error::{BatchError, CatalogError, ItemFailure, Result};
use crate::image::{DefaultRegistryProvider, ImageRegistry, RegistryOptions, RegistryProvider};
use crate::manifest::{DirectoryManifestParser, ManifestParser};
use crate::observer::{EventFields, Observer};
use crate::populator::{InsertOutcome, Populator, PopulatorOptions};
use crate::remover::Remover;
use crate::storage::GraphStore;

/// Working directory prefix of each unpacked item
const WORKDIR_PREFIX: &str = "bundle_tmp";

/// Add a list of bundle images to the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddToRegistryRequest {
    pub bundles: Vec<String>,
    pub options: PopulatorOptions,
    pub permissive: bool,
    pub registry: RegistryOptions,
}

/// Remove a list of packages from the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteFromRegistryRequest {
    pub packages: Vec<String>,
    pub permissive: bool,
}

/// Progress of one batch item. Additions move
/// `Pending -> Unpacking -> Parsing -> GraphInserting -> Committed | Skipped | Failed`,
/// deletions `Pending -> Removing -> Committed | Failed`. Never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Pending,
    Unpacking,
    Parsing,
    GraphInserting,
    Removing,
    Committed,
    /// Duplicate left untouched under the ignore policy
    Skipped,
    Failed,
}

impl ItemState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemState::Committed | ItemState::Skipped | ItemState::Failed
        )
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemState::Pending => "pending",
            ItemState::Unpacking => "unpacking",
            ItemState::Parsing => "parsing",
            ItemState::GraphInserting => "inserting",
            ItemState::Removing => "removing",
            ItemState::Committed => "committed",
            ItemState::Skipped => "skipped",
            ItemState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Final state of one batch item
#[derive(Debug)]
pub struct ItemReport {
    pub item: String,
    pub state: ItemState,
    /// Last stage entered before the item reached its final state
    pub stage: ItemState,
    pub error: Option<CatalogError>,
}

impl ItemReport {
    fn pending(item: &str) -> Self {
        Self {
            item: item.to_string(),
            state: ItemState::Pending,
            stage: ItemState::Pending,
            error: None,
        }
    }

    fn advance(&mut self, state: ItemState) {
        self.state = state;
        if !state.is_terminal() {
            self.stage = state;
        }
    }

    fn fail(&mut self, error: CatalogError) {
        self.state = ItemState::Failed;
        self.error = Some(error);
    }
}

/// Per-item outcome of a batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub permissive: bool,
    /// Item whose failure stopped the batch, if any
    pub aborted_at: Option<usize>,
}

impl BatchReport {
    fn new(items: &[String], permissive: bool) -> Self {
        Self {
            items: items.iter().map(|item| ItemReport::pending(item)).collect(),
            permissive,
            aborted_at: None,
        }
    }

    fn items_in(&self, state: ItemState) -> Vec<&str> {
        self.items
            .iter()
            .filter(|report| report.state == state)
            .map(|report| report.item.as_str())
            .collect()
    }

    pub fn committed(&self) -> Vec<&str> {
        self.items_in(ItemState::Committed)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.items_in(ItemState::Skipped)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.items_in(ItemState::Failed)
    }

    /// Items never started because the batch stopped early
    pub fn unprocessed(&self) -> Vec<&str> {
        self.items_in(ItemState::Pending)
    }

    pub fn is_success(&self) -> bool {
        self.items.iter().all(|report| report.error.is_none())
    }

    /// The batch outcome as an error value. A stopped batch yields the error
    /// that stopped it; a permissive batch yields every failure combined.
    pub fn into_result(self) -> Result<()> {
        let mut items = self.items;

        if let Some(index) = self.aborted_at {
            if let Some(error) = items.get_mut(index).and_then(|report| report.error.take()) {
                return Err(error);
            }
        }

        let failures: Vec<ItemFailure> = items
            .into_iter()
            .filter_map(|report| {
                report.error.map(|error| ItemFailure {
                    item: report.item,
                    error,
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Batch(BatchError { failures }))
        }
    }
}

/// Runs add/delete batches against one graph store
pub struct CatalogUpdater {
    store: Arc<dyn GraphStore>,
    observer: Arc<dyn Observer>,
    registries: Arc<dyn RegistryProvider>,
    parser: Arc<dyn ManifestParser>,
}

impl CatalogUpdater {
    pub fn new(store: Arc<dyn GraphStore>, observer: Arc<dyn Observer>) -> Self {
        Self {
            store,
            observer,
            registries: Arc::new(DefaultRegistryProvider),
            parser: Arc::new(DirectoryManifestParser::new()),
        }
    }

    pub fn with_registry_provider(mut self, registries: Arc<dyn RegistryProvider>) -> Self {
        self.registries = registries;
        self
    }

    pub fn with_manifest_parser(mut self, parser: Arc<dyn ManifestParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Add every bundle of the request; the aggregated outcome
    pub fn add_to_registry(&self, request: &AddToRegistryRequest) -> Result<()> {
        self.process_additions(request)?.into_result()
    }

    /// Remove every package of the request; the aggregated outcome
    pub fn delete_from_registry(&self, request: &DeleteFromRegistryRequest) -> Result<()> {
        self.process_deletions(request)?.into_result()
    }

    /// Process an add batch and report every item. Fails outright only when
    /// the batch cannot start (migration or registry setup).
    pub fn process_additions(&self, request: &AddToRegistryRequest) -> Result<BatchReport> {
        self.store.migrate()?;
        let registry = self.registries.create(&request.registry)?;
        let populator = Populator::new(self.store.clone(), request.options, self.observer.clone());

        let mut report = BatchReport::new(&request.bundles, request.permissive);
        for (index, reference) in request.bundles.iter().enumerate() {
            let item = &mut report.items[index];
            let fields = EventFields::new().reference(reference);

            match self.add_one(registry.as_ref(), &populator, reference, item) {
                Ok(outcome) => {
                    item.advance(match outcome {
                        InsertOutcome::Inserted { .. } => ItemState::Committed,
                        InsertOutcome::Skipped { .. } => ItemState::Skipped,
                    });
                }
                Err(error) => {
                    let stop = error.is_fatal() || !request.permissive;
                    self.log_failure(&fields, &error, request.permissive);
                    item.fail(error);
                    if stop {
                        report.aborted_at = Some(index);
                        break;
                    }
                }
            }
        }

        if let Err(e) = registry.destroy() {
            self.observer.warn(
                &EventFields::new(),
                &format!("error destroying image registry: {}", e),
            );
        }

        Ok(report)
    }

    /// Process a delete batch and report every item
    pub fn process_deletions(&self, request: &DeleteFromRegistryRequest) -> Result<BatchReport> {
        self.store.migrate()?;
        let remover = Remover::new(self.store.clone(), self.observer.clone());

        let mut report = BatchReport::new(&request.packages, request.permissive);
        for (index, package) in request.packages.iter().enumerate() {
            let item = &mut report.items[index];
            let fields = EventFields::new().package(package);

            item.advance(ItemState::Removing);
            match remover.remove_package(package) {
                Ok(_) => item.advance(ItemState::Committed),
                Err(error) => {
                    let stop = error.is_fatal() || !request.permissive;
                    self.log_failure(&fields, &error, request.permissive);
                    item.fail(error);
                    if stop {
                        report.aborted_at = Some(index);
                        break;
                    }
                }
            }
        }

        Ok(report)
    }

    fn add_one(
        &self,
        registry: &dyn ImageRegistry,
        populator: &Populator,
        reference: &str,
        item: &mut ItemReport,
    ) -> Result<InsertOutcome> {
        // Removed on drop, whichever way this function returns
        let workdir = tempfile::Builder::new()
            .prefix(WORKDIR_PREFIX)
            .tempdir()
            .map_err(|e| CatalogError::unpack(reference, format!("working directory: {}", e)))?;

        item.advance(ItemState::Unpacking);
        registry.pull(reference)?;
        registry.unpack(reference, workdir.path())?;

        item.advance(ItemState::Parsing);
        let mut descriptor = self.parser.parse(workdir.path(), reference)?;
        if descriptor.image.is_none() {
            descriptor.image = Some(reference.to_string());
        }

        item.advance(ItemState::GraphInserting);
        populator.insert(&descriptor)
    }

    fn log_failure(&self, fields: &EventFields, error: &CatalogError, permissive: bool) {
        if error.is_fatal() {
            self.observer
                .error(fields, &format!("store failure, aborting batch: {}", error));
        } else if permissive {
            self.observer
                .warn(fields, &format!("permissive mode enabled, continuing: {}", error));
        } else {
            self.observer
                .error(fields, &format!("permissive mode disabled, stopping: {}", error));
        }
    }
}
