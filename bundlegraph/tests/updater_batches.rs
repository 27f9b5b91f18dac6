// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Batch add/delete behaviour of the catalog updater

#[path = "testutils/mod.rs"]
mod testutils;

use bundlegraph::{
    AddToRegistryRequest, CatalogError, CatalogUpdater, DeleteFromRegistryRequest,
    DuplicatePolicy, GraphStore, ItemState, MemoryGraphStore, Observer, PopulatorOptions,
    UpgradeMode,
};
use log::Level;
use std::sync::Arc;
use testutils::fakes::{
    FailingStore, FakeImage, FakeManifestParser, FakeRegistryProvider, RecordingObserver,
};
use testutils::fixtures::{descriptor, foo};

fn updater(
    store: Arc<dyn GraphStore>,
    provider: &FakeRegistryProvider,
    observer: Arc<dyn Observer>,
) -> CatalogUpdater {
    CatalogUpdater::new(store, observer)
        .with_registry_provider(Arc::new(provider.clone()))
        .with_manifest_parser(Arc::new(FakeManifestParser))
}

fn three_images() -> FakeRegistryProvider {
    FakeRegistryProvider::new(vec![
        ("quay.io/foo:1.0.0", FakeImage::Bundle(foo("1.0.0"))),
        ("quay.io/foo:broken", FakeImage::Garbage),
        ("quay.io/foo:1.1.0", FakeImage::Bundle(foo("1.1.0"))),
    ])
}

fn add_request(permissive: bool) -> AddToRegistryRequest {
    AddToRegistryRequest {
        bundles: vec![
            "quay.io/foo:1.0.0".to_string(),
            "quay.io/foo:broken".to_string(),
            "quay.io/foo:1.1.0".to_string(),
        ],
        permissive,
        ..Default::default()
    }
}

fn bundle_names(store: &Arc<dyn GraphStore>, package: &str) -> Vec<String> {
    store.load(package).unwrap().bundles.into_keys().collect()
}

#[test]
fn test_permissive_batch_continues_and_aggregates() {
    let store = testutils::memory_store();
    let provider = three_images();
    let updater = updater(store.clone(), &provider, Arc::new(RecordingObserver::default()));

    let report = updater.process_additions(&add_request(true)).unwrap();
    assert_eq!(report.committed(), vec!["quay.io/foo:1.0.0", "quay.io/foo:1.1.0"]);
    assert_eq!(report.failed(), vec!["quay.io/foo:broken"]);
    assert_eq!(report.items[1].stage, ItemState::Parsing);
    assert_eq!(bundle_names(&store, "foo"), vec!["foo.v1.0.0", "foo.v1.1.0"]);

    match report.into_result() {
        Err(CatalogError::Batch(batch)) => {
            assert_eq!(batch.len(), 1);
            assert!(matches!(
                batch.failure_for("quay.io/foo:broken"),
                Some(CatalogError::ManifestParseFailure { .. })
            ));
            assert!(batch.to_string().contains("quay.io/foo:broken"));
        }
        other => panic!("expected aggregated error, got {:?}", other),
    }
}

#[test]
fn test_strict_batch_stops_at_first_failure() {
    let store = testutils::memory_store();
    let provider = three_images();
    let updater = updater(store.clone(), &provider, Arc::new(RecordingObserver::default()));

    let err = updater.add_to_registry(&add_request(false)).unwrap_err();
    assert!(matches!(err, CatalogError::ManifestParseFailure { .. }));
    assert_eq!(bundle_names(&store, "foo"), vec!["foo.v1.0.0"]);

    let log = provider.log.lock().unwrap();
    assert_eq!(log.pulled, vec!["quay.io/foo:1.0.0", "quay.io/foo:broken"]);
    assert_eq!(log.destroyed, 1);
}

#[test]
fn test_clean_batch_returns_ok() {
    let store = testutils::memory_store();
    let provider = three_images();
    let updater = updater(store.clone(), &provider, Arc::new(RecordingObserver::default()));

    let request = AddToRegistryRequest {
        bundles: vec!["quay.io/foo:1.0.0".to_string(), "quay.io/foo:1.1.0".to_string()],
        ..Default::default()
    };
    updater.add_to_registry(&request).unwrap();
    assert_eq!(
        store.load("foo").unwrap().channels["stable"].head.as_deref(),
        Some("foo.v1.1.0")
    );
}

#[test]
fn test_store_failure_aborts_permissive_batch() {
    let store: Arc<dyn GraphStore> = Arc::new(FailingStore::new("bar"));
    let provider = FakeRegistryProvider::new(vec![
        ("quay.io/foo:1.0.0", FakeImage::Bundle(foo("1.0.0"))),
        ("quay.io/bar:1.0.0", FakeImage::Bundle(descriptor("bar", "1.0.0", &["stable"]))),
        ("quay.io/foo:1.1.0", FakeImage::Bundle(foo("1.1.0"))),
    ]);
    let observer = Arc::new(RecordingObserver::default());
    let updater = updater(store.clone(), &provider, observer.clone());

    let request = AddToRegistryRequest {
        bundles: vec![
            "quay.io/foo:1.0.0".to_string(),
            "quay.io/bar:1.0.0".to_string(),
            "quay.io/foo:1.1.0".to_string(),
        ],
        permissive: true,
        ..Default::default()
    };
    let report = updater.process_additions(&request).unwrap();
    assert_eq!(report.committed(), vec!["quay.io/foo:1.0.0"]);
    assert_eq!(report.unprocessed(), vec!["quay.io/foo:1.1.0"]);

    let err = report.into_result().unwrap_err();
    assert!(err.is_fatal());
    assert!(observer
        .messages_at(Level::Error)
        .iter()
        .any(|m| m.contains("store failure") && m.contains("reference=quay.io/bar:1.0.0")));
}

#[test]
fn test_unpack_failure_and_workdir_cleanup() {
    let store = testutils::memory_store();
    let provider = FakeRegistryProvider::new(vec![
        ("quay.io/foo:missing", FakeImage::Unreachable),
        ("quay.io/foo:1.0.0", FakeImage::Bundle(foo("1.0.0"))),
    ])
    .failing_destroy();
    let observer = Arc::new(RecordingObserver::default());
    let updater = updater(store.clone(), &provider, observer.clone());

    let request = AddToRegistryRequest {
        bundles: vec!["quay.io/foo:missing".to_string(), "quay.io/foo:1.0.0".to_string()],
        permissive: true,
        ..Default::default()
    };
    let report = updater.process_additions(&request).unwrap();
    assert_eq!(report.items[0].state, ItemState::Failed);
    assert_eq!(report.items[0].stage, ItemState::Unpacking);
    assert!(matches!(
        report.items[0].error,
        Some(CatalogError::UnpackFailure { .. })
    ));
    assert_eq!(report.items[1].state, ItemState::Committed);

    let log = provider.log.lock().unwrap();
    assert_eq!(log.unpacked_into.len(), 1);
    assert!(log.unpacked_into.iter().all(|dir| !dir.exists()));
    assert!(observer
        .messages_at(Level::Warn)
        .iter()
        .any(|m| m.contains("error destroying image registry")));
}

#[test]
fn test_duplicates_are_rejected_or_skipped() {
    let store = testutils::memory_store();
    let provider = FakeRegistryProvider::new(vec![
        ("quay.io/foo:1.0.0", FakeImage::Bundle(foo("1.0.0"))),
        ("quay.io/foo:1.0.0-again", FakeImage::Bundle(foo("1.0.0"))),
    ]);
    let updater = updater(store.clone(), &provider, Arc::new(RecordingObserver::default()));
    let bundles = vec![
        "quay.io/foo:1.0.0".to_string(),
        "quay.io/foo:1.0.0-again".to_string(),
    ];

    let strict = AddToRegistryRequest {
        bundles: bundles.clone(),
        ..Default::default()
    };
    let err = updater.add_to_registry(&strict).unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateBundle { .. }));

    let lenient = AddToRegistryRequest {
        bundles,
        options: PopulatorOptions {
            mode: UpgradeMode::Replaces,
            on_duplicate: DuplicatePolicy::Ignore,
        },
        ..Default::default()
    };
    let report = updater.process_additions(&lenient).unwrap();
    assert_eq!(report.skipped().len(), 2);
    assert!(report.is_success());
    assert_eq!(bundle_names(&store, "foo"), vec!["foo.v1.0.0"]);
}

#[test]
fn test_batch_migrates_fresh_store() {
    let store: Arc<dyn GraphStore> = Arc::new(MemoryGraphStore::new());
    let provider = three_images();
    let updater = updater(store.clone(), &provider, Arc::new(RecordingObserver::default()));

    let request = AddToRegistryRequest {
        bundles: vec!["quay.io/foo:1.0.0".to_string()],
        ..Default::default()
    };
    updater.add_to_registry(&request).unwrap();
    assert_eq!(store.schema_version().unwrap(), bundlegraph::storage::CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_delete_batch_policy() {
    let store = testutils::memory_store();
    let provider = FakeRegistryProvider::new(vec![
        ("quay.io/foo:1.0.0", FakeImage::Bundle(foo("1.0.0"))),
        ("quay.io/bar:1.0.0", FakeImage::Bundle(descriptor("bar", "1.0.0", &["stable"]))),
        ("quay.io/baz:1.0.0", FakeImage::Bundle(descriptor("baz", "1.0.0", &["stable"]))),
    ]);
    let updater = updater(store.clone(), &provider, Arc::new(RecordingObserver::default()));
    updater
        .add_to_registry(&AddToRegistryRequest {
            bundles: vec![
                "quay.io/foo:1.0.0".to_string(),
                "quay.io/bar:1.0.0".to_string(),
                "quay.io/baz:1.0.0".to_string(),
            ],
            ..Default::default()
        })
        .unwrap();

    let strict = DeleteFromRegistryRequest {
        packages: vec!["foo".to_string(), "ghost".to_string(), "bar".to_string()],
        permissive: false,
    };
    let err = updater.delete_from_registry(&strict).unwrap_err();
    assert!(matches!(err, CatalogError::PackageNotFound { ref package } if package == "ghost"));
    assert_eq!(store.list_packages().unwrap(), vec!["bar", "baz"]);

    let permissive = DeleteFromRegistryRequest {
        packages: vec!["ghost".to_string(), "bar".to_string(), "baz".to_string()],
        permissive: true,
    };
    let report = updater.process_deletions(&permissive).unwrap();
    assert_eq!(report.committed(), vec!["bar", "baz"]);
    assert_eq!(report.items[0].stage, ItemState::Removing);
    assert!(matches!(report.into_result(), Err(CatalogError::Batch(_))));
    assert!(store.list_packages().unwrap().is_empty());
}

#[test]
fn test_store_failure_aborts_permissive_delete_batch() {
    let store: Arc<dyn GraphStore> = Arc::new(FailingStore::new("bar"));
    let provider = FakeRegistryProvider::new(vec![
        ("quay.io/foo:1.0.0", FakeImage::Bundle(foo("1.0.0"))),
        ("quay.io/baz:1.0.0", FakeImage::Bundle(descriptor("baz", "1.0.0", &["stable"]))),
    ]);
    let observer = Arc::new(RecordingObserver::default());
    let updater = updater(store.clone(), &provider, observer.clone());
    updater
        .add_to_registry(&AddToRegistryRequest {
            bundles: vec!["quay.io/foo:1.0.0".to_string(), "quay.io/baz:1.0.0".to_string()],
            ..Default::default()
        })
        .unwrap();

    let request = DeleteFromRegistryRequest {
        packages: vec!["foo".to_string(), "bar".to_string(), "baz".to_string()],
        permissive: true,
    };
    let report = updater.process_deletions(&request).unwrap();
    assert_eq!(report.committed(), vec!["foo"]);
    assert_eq!(report.failed(), vec!["bar"]);
    assert_eq!(report.unprocessed(), vec!["baz"]);
    assert_eq!(report.aborted_at, Some(1));
    assert_eq!(store.list_packages().unwrap(), vec!["baz"]);

    let err = report.into_result().unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, CatalogError::StoreFailure(_)));
    assert!(observer
        .messages_at(Level::Error)
        .iter()
        .any(|m| m.contains("store failure") && m.contains("package=bar")));
}
