// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Manifest collaborator: building bundle descriptors from unpacked content
//!
//! The default parser understands the registry+v1 bundle layout:
//! - `metadata/annotations.yaml` names the package and its channels
//! - `manifests/` holds the ClusterServiceVersion and other objects

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{CatalogError, Result};
use crate::model::BundleDescriptor;

pub const ANNOTATIONS_FILE: &str = "metadata/annotations.yaml";
pub const MANIFESTS_DIR: &str = "manifests";

pub const PACKAGE_ANNOTATION: &str = "operators.operatorframework.io.bundle.package.v1";
pub const CHANNELS_ANNOTATION: &str = "operators.operatorframework.io.bundle.channels.v1";
pub const DEFAULT_CHANNEL_ANNOTATION: &str =
    "operators.operatorframework.io.bundle.channel.default.v1";
pub const SKIP_RANGE_ANNOTATION: &str = "olm.skipRange";

const CSV_KIND: &str = "ClusterServiceVersion";

/// Turns an unpacked bundle directory into a descriptor
pub trait ManifestParser: Send + Sync {
    fn parse(&self, dir: &Path, reference: &str) -> Result<BundleDescriptor>;
}

#[derive(Debug, Deserialize)]
struct AnnotationsFile {
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct KindProbe {
    #[serde(default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ClusterServiceVersion {
    metadata: CsvMetadata,
    #[serde(default)]
    spec: CsvSpec,
}

#[derive(Debug, Deserialize)]
struct CsvMetadata {
    name: String,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct CsvSpec {
    version: Option<String>,
    replaces: Option<String>,
    #[serde(default)]
    skips: Vec<String>,
}

/// Parser for the `metadata/` + `manifests/` bundle layout
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryManifestParser;

impl DirectoryManifestParser {
    pub fn new() -> Self {
        Self
    }

    fn read_annotations(&self, dir: &Path, reference: &str) -> Result<BTreeMap<String, String>> {
        let path = dir.join(ANNOTATIONS_FILE);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            CatalogError::manifest(reference, format!("{}: {}", ANNOTATIONS_FILE, e))
        })?;
        let file: AnnotationsFile = serde_yaml_ng::from_str(&raw).map_err(|e| {
            CatalogError::manifest(reference, format!("{}: {}", ANNOTATIONS_FILE, e))
        })?;
        Ok(file.annotations)
    }

    /// Read every regular file under `metadata/` and `manifests/`, keyed by
    /// relative path
    fn read_files(&self, dir: &Path, reference: &str) -> Result<BTreeMap<String, String>> {
        let mut files = BTreeMap::new();
        for root in ["metadata", MANIFESTS_DIR] {
            let root = dir.join(root);
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.map_err(|e| CatalogError::manifest(reference, e))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry
                    .path()
                    .strip_prefix(dir)
                    .map_err(|e| CatalogError::manifest(reference, e))?
                    .to_string_lossy()
                    .replace('\\', "/");
                let content = std::fs::read_to_string(entry.path())
                    .map_err(|e| CatalogError::manifest(reference, format!("{}: {}", relative, e)))?;
                files.insert(relative, content);
            }
        }
        Ok(files)
    }

    fn find_csv(
        &self,
        files: &BTreeMap<String, String>,
        reference: &str,
    ) -> Result<ClusterServiceVersion> {
        let prefix = format!("{}/", MANIFESTS_DIR);
        for (path, content) in files.iter().filter(|(path, _)| path.starts_with(&prefix)) {
            let Ok(probe) = serde_yaml_ng::from_str::<KindProbe>(content) else {
                log::debug!("Skipping unparseable manifest {}", path);
                continue;
            };
            if probe.kind == CSV_KIND {
                return serde_yaml_ng::from_str(content)
                    .map_err(|e| CatalogError::manifest(reference, format!("{}: {}", path, e)));
            }
        }
        Err(CatalogError::manifest(
            reference,
            "no ClusterServiceVersion found in manifests",
        ))
    }
}

impl ManifestParser for DirectoryManifestParser {
    fn parse(&self, dir: &Path, reference: &str) -> Result<BundleDescriptor> {
        let annotations = self.read_annotations(dir, reference)?;
        let files = self.read_files(dir, reference)?;
        let csv = self.find_csv(&files, reference)?;

        let package = annotations
            .get(PACKAGE_ANNOTATION)
            .cloned()
            .ok_or_else(|| {
                CatalogError::manifest(reference, format!("missing {} annotation", PACKAGE_ANNOTATION))
            })?;
        let channels: Vec<String> = annotations
            .get(CHANNELS_ANNOTATION)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let version = csv.spec.version.clone().ok_or_else(|| {
            CatalogError::manifest(
                reference,
                format!("ClusterServiceVersion {} has no spec.version", csv.metadata.name),
            )
        })?;

        let manifest = serde_json::to_string(&files)
            .map_err(|e| CatalogError::manifest(reference, e))?;

        Ok(BundleDescriptor {
            name: csv.metadata.name,
            package,
            version,
            channels,
            default_channel: annotations
                .get(DEFAULT_CHANNEL_ANNOTATION)
                .filter(|c| !c.trim().is_empty())
                .cloned(),
            replaces: csv.spec.replaces.filter(|r| !r.trim().is_empty()),
            skips: csv.spec.skips,
            skip_range: csv.metadata.annotations.get(SKIP_RANGE_ANNOTATION).cloned(),
            image: Some(reference.to_string()),
            manifest,
        })
    }
}
