// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for BundleGraph
//!
//! Provides batch add/remove of bundles, schema migration and read-only
//! catalog queries.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, LogLevel};
pub use handlers::run;
