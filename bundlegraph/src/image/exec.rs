// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Registry that shells out to docker or podman

use parking_lot::Mutex;
use std::path::Path;
use std::process::Command;

use super::{ContainerTool, ImageRegistry, RegistryOptions};
use crate::error::{CatalogError, Result};

/// Pulls with `<tool> pull` and unpacks by creating a throwaway container
/// and copying its root filesystem out.
pub struct ExecRegistry {
    tool: &'static str,
    options: RegistryOptions,
    /// Containers whose removal failed during unpack; retried on destroy
    leftovers: Mutex<Vec<String>>,
}

impl ExecRegistry {
    pub fn new(options: RegistryOptions) -> Self {
        let tool = match options.container_tool {
            ContainerTool::Podman => "podman",
            ContainerTool::Docker | ContainerTool::None => "docker",
        };
        Self {
            tool,
            options,
            leftovers: Mutex::new(Vec::new()),
        }
    }

    fn pull_args(&self, reference: &str) -> Vec<String> {
        let mut args = vec!["pull".to_string()];
        if self.options.container_tool == ContainerTool::Podman {
            if self.options.skip_tls {
                args.push("--tls-verify=false".to_string());
            }
            if let Some(cert_dir) = self.options.ca_file.as_ref().and_then(|f| f.parent()) {
                args.push(format!("--cert-dir={}", cert_dir.display()));
            }
        }
        args.push(reference.to_string());
        args
    }

    fn run(&self, reference: &str, args: &[String]) -> Result<String> {
        log::debug!("Running {} {}", self.tool, args.join(" "));
        let output = Command::new(self.tool)
            .args(args)
            .output()
            .map_err(|e| CatalogError::unpack(reference, format!("{}: {}", self.tool, e)))?;

        if !output.status.success() {
            return Err(CatalogError::unpack(
                reference,
                format!(
                    "{} {} failed: {}",
                    self.tool,
                    args.first().map(String::as_str).unwrap_or_default(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl ImageRegistry for ExecRegistry {
    fn pull(&self, reference: &str) -> Result<()> {
        if self.options.skip_tls && self.options.container_tool == ContainerTool::Docker {
            log::warn!("docker does not support skipping TLS per pull; configure the daemon instead");
        }
        self.run(reference, &self.pull_args(reference))?;
        Ok(())
    }

    fn unpack(&self, reference: &str, dest: &Path) -> Result<()> {
        // Bundle images carry no entrypoint, so give create a placeholder command
        let container = self.run(
            reference,
            &["create".to_string(), reference.to_string(), "true".to_string()],
        )?;

        let copied = self.run(
            reference,
            &[
                "cp".to_string(),
                format!("{}:/.", container),
                dest.display().to_string(),
            ],
        );

        if let Err(e) = self.run(reference, &["rm".to_string(), container.clone()]) {
            log::warn!("Unable to remove container {}: {}", container, e);
            self.leftovers.lock().push(container);
        }

        copied.map(|_| ())
    }

    fn destroy(&self) -> Result<()> {
        let leftovers: Vec<String> = self.leftovers.lock().drain(..).collect();
        let mut failed = Vec::new();
        for container in leftovers {
            if self
                .run(&container, &["rm".to_string(), "-f".to_string(), container.clone()])
                .is_err()
            {
                failed.push(container);
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::unpack(
                failed.join(", "),
                "unable to remove leftover containers",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_podman_pull_args_carry_tls_options() {
        let registry = ExecRegistry::new(RegistryOptions {
            container_tool: ContainerTool::Podman,
            skip_tls: true,
            ca_file: Some(PathBuf::from("/etc/certs/ca.crt")),
        });
        assert_eq!(
            registry.pull_args("quay.io/foo/bundle:1.0.0"),
            vec![
                "pull",
                "--tls-verify=false",
                "--cert-dir=/etc/certs",
                "quay.io/foo/bundle:1.0.0"
            ]
        );
    }

    #[test]
    fn test_docker_pull_args_are_plain() {
        let registry = ExecRegistry::new(RegistryOptions::new(ContainerTool::Docker));
        assert_eq!(registry.pull_args("foo:1"), vec!["pull", "foo:1"]);
        assert!(registry.destroy().is_ok());
    }
}
