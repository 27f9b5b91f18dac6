// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Image collaborator: pulling bundle images and unpacking their contents
//!
//! The catalog never manages image storage itself. A batch asks a
//! [`RegistryProvider`] for one [`ImageRegistry`], selected by
//! [`ContainerTool`], and uses it for every item before destroying it.

mod directory;
mod exec;

pub use directory::DirectoryRegistry;
pub use exec::ExecRegistry;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// Pulls bundle images and unpacks them into a working directory
pub trait ImageRegistry: Send + Sync {
    /// Make `reference` available locally
    fn pull(&self, reference: &str) -> Result<()>;

    /// Write the filesystem of a pulled image into `dest`
    fn unpack(&self, reference: &str, dest: &Path) -> Result<()>;

    /// Release everything the registry holds. Called once per batch.
    fn destroy(&self) -> Result<()>;
}

/// Tool used to fetch bundle images
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerTool {
    /// References are paths of already unpacked bundle directories
    #[default]
    None,
    Docker,
    Podman,
}

impl ContainerTool {
    /// Executable name for tools that shell out
    pub fn command(&self) -> Option<&'static str> {
        match self {
            ContainerTool::None => None,
            ContainerTool::Docker => Some("docker"),
            ContainerTool::Podman => Some("podman"),
        }
    }
}

impl std::str::FromStr for ContainerTool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(ContainerTool::None),
            "docker" => Ok(ContainerTool::Docker),
            "podman" => Ok(ContainerTool::Podman),
            _ => Err(format!(
                "Unknown container tool: {}. Valid options: none, docker, podman",
                s
            )),
        }
    }
}

impl std::fmt::Display for ContainerTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerTool::None => write!(f, "none"),
            ContainerTool::Docker => write!(f, "docker"),
            ContainerTool::Podman => write!(f, "podman"),
        }
    }
}

/// How a batch reaches its image registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    pub container_tool: ContainerTool,
    /// Skip TLS verification when pulling
    pub skip_tls: bool,
    /// Additional CA certificate for the registry
    pub ca_file: Option<PathBuf>,
}

impl RegistryOptions {
    pub fn new(container_tool: ContainerTool) -> Self {
        Self {
            container_tool,
            ..Default::default()
        }
    }

    /// A configured CA file must exist
    pub fn validate(&self) -> Result<()> {
        if let Some(ca_file) = &self.ca_file {
            if !ca_file.is_file() {
                return Err(CatalogError::InvalidConfig(format!(
                    "CA file {} does not exist",
                    ca_file.display()
                )));
            }
        }
        Ok(())
    }
}

/// Builds the image registry of a batch
pub trait RegistryProvider: Send + Sync {
    fn create(&self, options: &RegistryOptions) -> Result<Box<dyn ImageRegistry>>;
}

/// Chooses the registry implementation from the configured container tool
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRegistryProvider;

impl RegistryProvider for DefaultRegistryProvider {
    fn create(&self, options: &RegistryOptions) -> Result<Box<dyn ImageRegistry>> {
        options.validate()?;
        let registry: Box<dyn ImageRegistry> = match options.container_tool {
            ContainerTool::None => Box::new(DirectoryRegistry::new()),
            ContainerTool::Docker | ContainerTool::Podman => {
                Box::new(ExecRegistry::new(options.clone()))
            }
        };
        log::debug!("Using {} image registry", options.container_tool);
        Ok(registry)
    }
}
