// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for BundleGraph

use bundlegraph::{CatalogConfig, CatalogUpdater, GraphStore, LogObserver, Querier};
use colored::Colorize;
use std::sync::Arc;

use super::commands::{Cli, Commands};
use super::output::ResultFormatter;

type HandlerResult = Result<(), Box<dyn std::error::Error>>;

/// Configuration from the optional file with global flags applied on top
pub fn resolve_config(cli: &Cli) -> Result<CatalogConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => CatalogConfig::from_file(path)?,
        None => CatalogConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(storage) = cli.storage {
        config.storage_type = storage;
    }

    match &cli.command {
        Commands::Add {
            mode,
            on_duplicate,
            permissive,
            container_tool,
            skip_tls,
            ca_file,
            ..
        } => {
            if let Some(mode) = mode {
                config.mode = *mode;
            }
            if let Some(policy) = on_duplicate {
                config.on_duplicate = *policy;
            }
            if let Some(tool) = container_tool {
                config.container_tool = *tool;
            }
            if ca_file.is_some() {
                config.ca_file = ca_file.clone();
            }
            config.permissive |= *permissive;
            config.skip_tls |= *skip_tls;
        }
        Commands::Rm { permissive, .. } => {
            config.permissive |= *permissive;
        }
        _ => {}
    }
    Ok(config)
}

pub fn run(cli: Cli) -> HandlerResult {
    let config = resolve_config(&cli)?;
    let formatter = ResultFormatter::new(cli.format);
    let store = config.open_store()?;

    match cli.command {
        Commands::Add { bundles, .. } => handle_add(&config, store, &formatter, bundles),
        Commands::Rm { packages, .. } => handle_rm(&config, store, &formatter, packages),
        Commands::Migrate => handle_migrate(store),
        Commands::Packages => {
            let querier = Querier::new(store);
            let packages = querier
                .list_packages()?
                .iter()
                .map(|name| querier.get_package(name))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", formatter.packages(&packages));
            Ok(())
        }
        Commands::Bundles { package, channel } => {
            let querier = Querier::new(store);
            let bundles = match channel {
                Some(channel) => querier.bundles_for_channel(&package, &channel)?,
                None => querier.list_bundles(&package)?,
            };
            println!("{}", formatter.bundles(&bundles));
            Ok(())
        }
        Commands::Channels { package } => {
            let channels = Querier::new(store).list_channels(&package)?;
            println!("{}", formatter.names("Channel", &channels));
            Ok(())
        }
        Commands::Head { package, channel } => {
            let head = Querier::new(store).channel_head(&package, &channel)?;
            println!("{}", formatter.value(&head));
            Ok(())
        }
        Commands::Path {
            package,
            channel,
            from,
            to,
        } => {
            let path = Querier::new(store).bundle_path(&package, &channel, &from, &to)?;
            println!("{}", formatter.path(&path));
            Ok(())
        }
    }
}

fn handle_add(
    config: &CatalogConfig,
    store: Arc<dyn GraphStore>,
    formatter: &ResultFormatter,
    bundles: Vec<String>,
) -> HandlerResult {
    let updater = CatalogUpdater::new(store, Arc::new(LogObserver::new()));
    let report = updater.process_additions(&config.add_request(bundles))?;
    println!("{}", formatter.report(&report));
    finish(report.into_result())
}

fn handle_rm(
    config: &CatalogConfig,
    store: Arc<dyn GraphStore>,
    formatter: &ResultFormatter,
    packages: Vec<String>,
) -> HandlerResult {
    let updater = CatalogUpdater::new(store, Arc::new(LogObserver::new()));
    let report = updater.process_deletions(&config.delete_request(packages))?;
    println!("{}", formatter.report(&report));
    finish(report.into_result())
}

fn handle_migrate(store: Arc<dyn GraphStore>) -> HandlerResult {
    let version = store.migrate()?;
    println!(
        "{}",
        format!("Catalog schema at version {}", version).green()
    );
    Ok(())
}

fn finish(result: bundlegraph::Result<()>) -> HandlerResult {
    match result {
        Ok(()) => {
            println!("{}", "Batch completed".bold().green());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
