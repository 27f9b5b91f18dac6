// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions for BundleGraph

use bundlegraph::{ContainerTool, DuplicatePolicy, StorageType, UpgradeMode};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above (verbose)
    Debug,
    /// All messages including trace (very verbose)
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    /// Convert to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// BundleGraph CLI - operator bundle catalog
#[derive(Parser)]
#[command(name = "bundlegraph")]
#[command(about = "BundleGraph - operator bundle catalog graph engine")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Catalog database path
    #[arg(short = 'd', long = "database", global = true)]
    pub database: Option<PathBuf>,

    /// Storage driver (redb, memory)
    #[arg(long = "storage", global = true)]
    pub storage: Option<StorageType>,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Add bundle images to the catalog, in order
    Add {
        /// Bundle image references (directories when --container-tool is none)
        #[arg(required = true)]
        bundles: Vec<String>,

        /// How bundles without explicit replaces are linked (replaces, semver)
        #[arg(short, long)]
        mode: Option<UpgradeMode>,

        /// What to do with an already present version (reject, ignore)
        #[arg(long = "on-duplicate")]
        on_duplicate: Option<DuplicatePolicy>,

        /// Keep going past failed bundles and report them together
        #[arg(short, long)]
        permissive: bool,

        /// Tool used to pull images (none, docker, podman)
        #[arg(long = "container-tool")]
        container_tool: Option<ContainerTool>,

        /// Skip TLS verification when pulling
        #[arg(long = "skip-tls")]
        skip_tls: bool,

        /// Additional CA certificate for the registry
        #[arg(long = "ca-file")]
        ca_file: Option<PathBuf>,
    },

    /// Remove packages and all their bundles from the catalog
    Rm {
        /// Package names
        #[arg(required = true)]
        packages: Vec<String>,

        /// Keep going past failed packages and report them together
        #[arg(short, long)]
        permissive: bool,
    },

    /// Bring the catalog schema to the current version
    Migrate,

    /// List packages with their channels and heads
    Packages,

    /// List the bundles of a package
    Bundles {
        package: String,

        /// Only bundles of this channel
        #[arg(long)]
        channel: Option<String>,
    },

    /// List the channels of a package
    Channels { package: String },

    /// Show the head bundle of a channel
    Head { package: String, channel: String },

    /// Show the upgrade path between two bundles (names or versions)
    Path {
        package: String,
        channel: String,
        from: String,
        to: String,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_parsing() {
        let cli = Cli::try_parse_from([
            "bundlegraph",
            "add",
            "quay.io/foo:1",
            "quay.io/foo:2",
            "--mode",
            "semver",
            "--permissive",
            "--container-tool",
            "podman",
            "-d",
            "/tmp/catalog.redb",
        ])
        .unwrap();

        assert_eq!(cli.database, Some(PathBuf::from("/tmp/catalog.redb")));
        match cli.command {
            Commands::Add {
                bundles,
                mode,
                permissive,
                container_tool,
                ..
            } => {
                assert_eq!(bundles, vec!["quay.io/foo:1", "quay.io/foo:2"]);
                assert_eq!(mode, Some(UpgradeMode::Semver));
                assert!(permissive);
                assert_eq!(container_tool, Some(ContainerTool::Podman));
            }
            _ => panic!("Expected Add command"),
        }
    }

    #[test]
    fn test_add_requires_bundles() {
        assert!(Cli::try_parse_from(["bundlegraph", "add"]).is_err());
        assert!(Cli::try_parse_from(["bundlegraph", "add", "x", "--mode", "sideways"]).is_err());
    }

    #[test]
    fn test_query_parsing() {
        let cli = Cli::try_parse_from([
            "bundlegraph",
            "path",
            "etcd",
            "alpha",
            "0.9.0",
            "0.9.4",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Path { .. }));
    }
}
