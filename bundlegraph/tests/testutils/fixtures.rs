// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Descriptor builders and on-disk bundle fixtures

use bundlegraph::manifest::{ANNOTATIONS_FILE, MANIFESTS_DIR};
use bundlegraph::BundleDescriptor;
use std::path::{Path, PathBuf};

/// `foo.v<version>` in `stable`
pub fn foo(version: &str) -> BundleDescriptor {
    descriptor("foo", version, &["stable"])
}

pub fn descriptor(package: &str, version: &str, channels: &[&str]) -> BundleDescriptor {
    let mut descriptor = BundleDescriptor::new(bundle_name(package, version), package, version);
    for channel in channels {
        descriptor = descriptor.in_channel(*channel);
    }
    descriptor
}

pub fn bundle_name(package: &str, version: &str) -> String {
    format!("{}.v{}", package, version)
}

/// An unpacked registry+v1 bundle under `root/<package>-<version>`
pub struct BundleDir {
    pub package: String,
    pub version: String,
    pub channels: Vec<String>,
    pub default_channel: Option<String>,
    pub replaces: Option<String>,
    pub skip_range: Option<String>,
}

impl BundleDir {
    pub fn new(package: &str, version: &str) -> Self {
        Self {
            package: package.to_string(),
            version: version.to_string(),
            channels: vec!["stable".to_string()],
            default_channel: None,
            replaces: None,
            skip_range: None,
        }
    }

    pub fn channels(mut self, channels: &[&str]) -> Self {
        self.channels = channels.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn default_channel(mut self, channel: &str) -> Self {
        self.default_channel = Some(channel.to_string());
        self
    }

    pub fn replaces(mut self, version: &str) -> Self {
        self.replaces = Some(bundle_name(&self.package, version));
        self
    }

    pub fn skip_range(mut self, range: &str) -> Self {
        self.skip_range = Some(range.to_string());
        self
    }

    pub fn name(&self) -> String {
        bundle_name(&self.package, &self.version)
    }

    /// Write the bundle and return its directory, usable as a reference
    pub fn write(&self, root: &Path) -> PathBuf {
        let dir = root.join(format!("{}-{}", self.package, self.version));
        std::fs::create_dir_all(dir.join("metadata")).expect("Failed to create metadata dir");
        std::fs::create_dir_all(dir.join(MANIFESTS_DIR)).expect("Failed to create manifests dir");

        let mut annotations = format!(
            "annotations:\n  operators.operatorframework.io.bundle.package.v1: {}\n  operators.operatorframework.io.bundle.channels.v1: {}\n",
            self.package,
            self.channels.join(",")
        );
        if let Some(default) = &self.default_channel {
            annotations.push_str(&format!(
                "  operators.operatorframework.io.bundle.channel.default.v1: {}\n",
                default
            ));
        }
        std::fs::write(dir.join(ANNOTATIONS_FILE), annotations).expect("Failed to write annotations");

        let mut csv = format!(
            "apiVersion: operators.coreos.com/v1alpha1\nkind: ClusterServiceVersion\nmetadata:\n  name: {}\n",
            self.name()
        );
        if let Some(range) = &self.skip_range {
            csv.push_str(&format!("  annotations:\n    olm.skipRange: \"{}\"\n", range));
        }
        csv.push_str(&format!("spec:\n  version: {}\n", self.version));
        if let Some(replaces) = &self.replaces {
            csv.push_str(&format!("  replaces: {}\n", replaces));
        }
        std::fs::write(dir.join(MANIFESTS_DIR).join("csv.yaml"), csv).expect("Failed to write CSV");

        dir
    }
}

pub fn reference(dir: &Path) -> String {
    dir.to_string_lossy().to_string()
}
