// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Registry over already unpacked bundle directories

use std::path::Path;
use walkdir::WalkDir;

use super::ImageRegistry;
use crate::error::{CatalogError, Result};

/// Treats every reference as the path of an unpacked bundle and copies it
/// into the working directory on unpack.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryRegistry;

impl DirectoryRegistry {
    pub fn new() -> Self {
        Self
    }
}

impl ImageRegistry for DirectoryRegistry {
    fn pull(&self, reference: &str) -> Result<()> {
        if Path::new(reference).is_dir() {
            Ok(())
        } else {
            Err(CatalogError::unpack(
                reference,
                "not a directory of unpacked bundle content",
            ))
        }
    }

    fn unpack(&self, reference: &str, dest: &Path) -> Result<()> {
        let source = Path::new(reference);
        for entry in WalkDir::new(source).min_depth(1) {
            let entry = entry.map_err(|e| CatalogError::unpack(reference, e))?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| CatalogError::unpack(reference, e))?;
            let target = dest.join(relative);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target).map_err(|e| CatalogError::unpack(reference, e))?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| CatalogError::unpack(reference, e))?;
                }
                std::fs::copy(entry.path(), &target)
                    .map_err(|e| CatalogError::unpack(reference, e))?;
            }
        }
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        Ok(())
    }
}
