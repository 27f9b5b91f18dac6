// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for catalog graph operations

use std::fmt;
use thiserror::Error;

use crate::storage::StorageError;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Main error type for catalog graph operations
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The image collaborator could not produce an unpacked bundle
    #[error("unable to unpack bundle image {reference}: {reason}")]
    UnpackFailure { reference: String, reason: String },

    /// A bundle descriptor could not be built from unpacked content
    #[error("unable to parse bundle manifests from {origin}: {reason}")]
    ManifestParseFailure { origin: String, reason: String },

    /// The (package, version) pair or bundle name is already present
    #[error("bundle {bundle} (package {package}, version {version}) already exists")]
    DuplicateBundle {
        package: String,
        version: String,
        bundle: String,
    },

    /// Cycle, fork or dangling edge detected; the insert was rolled back
    #[error("graph inconsistency in package {package}, channel {channel}: {reason}")]
    GraphInconsistency {
        package: String,
        channel: String,
        reason: String,
    },

    /// Persistence failure; store health cannot be assumed afterwards
    #[error("store failure: {0}")]
    StoreFailure(#[from] StorageError),

    #[error("package {package} not found")]
    PackageNotFound { package: String },

    #[error("channel {channel} not found in package {package}")]
    ChannelNotFound { package: String, channel: String },

    #[error("bundle {bundle} not found in package {package}")]
    BundleNotFound { package: String, bundle: String },

    #[error("no upgrade path from {from} to {to} in package {package}, channel {channel}")]
    NoPathFound {
        package: String,
        channel: String,
        from: String,
        to: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Errors collected by a permissive batch
    #[error("{0}")]
    Batch(BatchError),
}

impl CatalogError {
    /// Whether this error aborts a batch regardless of permissive mode
    pub fn is_fatal(&self) -> bool {
        matches!(self, CatalogError::StoreFailure(_))
    }

    pub(crate) fn inconsistency(
        package: impl Into<String>,
        channel: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CatalogError::GraphInconsistency {
            package: package.into(),
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn manifest(origin: impl Into<String>, reason: impl fmt::Display) -> Self {
        CatalogError::ManifestParseFailure {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unpack(reference: impl Into<String>, reason: impl fmt::Display) -> Self {
        CatalogError::UnpackFailure {
            reference: reference.into(),
            reason: reason.to_string(),
        }
    }
}

/// One failed item of a batch, keyed by the image reference or package name
/// that was being processed.
#[derive(Debug)]
pub struct ItemFailure {
    pub item: String,
    pub error: CatalogError,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.item, self.error)
    }
}

/// Aggregated per-item failures of a permissive batch
#[derive(Debug, Default)]
pub struct BatchError {
    pub failures: Vec<ItemFailure>,
}

impl BatchError {
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure recorded for a given item, if any
    pub fn failure_for(&self, item: &str) -> Option<&CatalogError> {
        self.failures
            .iter()
            .find(|failure| failure.item == item)
            .map(|failure| &failure.error)
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [] => write!(f, "no errors"),
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "[")?;
                for (i, failure) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", failure)?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_is_fatal() {
        let err = CatalogError::StoreFailure(StorageError::Backend("disk gone".to_string()));
        assert!(err.is_fatal());

        let err = CatalogError::DuplicateBundle {
            package: "foo".to_string(),
            version: "1.0.0".to_string(),
            bundle: "foo.v1.0.0".to_string(),
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = CatalogError::inconsistency("foo", "stable", "multiple channel heads");
        let msg = err.to_string();
        assert!(msg.contains("foo"));
        assert!(msg.contains("stable"));
        assert!(msg.contains("multiple channel heads"));
    }

    #[test]
    fn test_batch_error_display() {
        let mut batch = BatchError::default();
        assert_eq!(batch.to_string(), "no errors");

        batch.failures.push(ItemFailure {
            item: "quay.io/foo:1".to_string(),
            error: CatalogError::unpack("quay.io/foo:1", "unauthorized"),
        });
        assert!(batch.to_string().starts_with("quay.io/foo:1: "));

        batch.failures.push(ItemFailure {
            item: "bar".to_string(),
            error: CatalogError::PackageNotFound {
                package: "bar".to_string(),
            },
        });
        let msg = batch.to_string();
        assert!(msg.starts_with('['));
        assert!(msg.contains("package bar not found"));
        assert!(batch.failure_for("bar").is_some());
        assert!(batch.failure_for("baz").is_none());
    }
}
