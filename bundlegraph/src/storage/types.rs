// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Storage driver types and error handling
//!
//! This module defines the driver selection enum and the error type shared
//! by every graph store driver.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Storage driver type configuration
///
/// Specifies which underlying storage technology backs the catalog graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// Redb - Pure Rust ACID-compliant embedded database
    /// Best for: persistent catalogs, crash-safety, MVCC reads
    #[default]
    Redb,

    /// Memory - In-memory storage
    /// Best for: Unit testing, dry runs
    Memory,
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redb" => Ok(StorageType::Redb),
            "memory" => Ok(StorageType::Memory),
            _ => Err(format!(
                "Unknown storage type: {}. Valid options: redb, memory",
                s
            )),
        }
    }
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageType::Redb => "redb",
            StorageType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Error type for storage driver operations
///
/// Covers every failure mode of the persistence layer. Converted into
/// `CatalogError::StoreFailure` at the store boundary.
#[derive(Debug)]
pub enum StorageError {
    /// I/O related errors (file system)
    IoError(std::io::Error),

    /// Record encoding or decoding failed
    SerializationError(String),

    /// Driver-specific error (redb transaction, table, commit)
    Backend(String),

    /// The database was written by a newer schema than this build supports
    SchemaTooNew { found: u32, supported: u32 },

    /// Mutation attempted before the schema was brought up to date
    NotMigrated { found: u32, required: u32 },

    /// Persisted rows do not describe a well-formed graph
    Corrupt(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::IoError(e) => write!(f, "I/O error: {}", e),
            StorageError::SerializationError(e) => write!(f, "Serialization error: {}", e),
            StorageError::Backend(e) => write!(f, "Storage driver error: {}", e),
            StorageError::SchemaTooNew { found, supported } => write!(
                f,
                "database schema version {} is newer than supported version {}",
                found, supported
            ),
            StorageError::NotMigrated { found, required } => write!(
                f,
                "database schema version {} is older than required version {}, run migrate first",
                found, required
            ),
            StorageError::Corrupt(e) => write!(f, "Corrupt catalog data: {}", e),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::IoError(e)
    }
}

impl From<bincode::Error> for StorageError {
    fn from(e: bincode::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

impl From<redb::DatabaseError> for StorageError {
    fn from(e: redb::DatabaseError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(e: redb::TransactionError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(e: redb::TableError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(e: redb::StorageError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(e: redb::CommitError) -> Self {
        StorageError::Backend(e.to_string())
    }
}

/// Result type for storage driver operations
pub type StorageResult<T> = Result<T, StorageError>;
