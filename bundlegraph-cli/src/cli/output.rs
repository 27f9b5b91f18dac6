// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Result formatting for the CLI

use bundlegraph::{BatchReport, Bundle, ItemState, PackageSummary};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use super::commands::OutputFormat;

/// Renders query results as tables or JSON
pub struct ResultFormatter {
    format: OutputFormat,
}

#[derive(Serialize)]
struct BundleRow<'a> {
    name: &'a str,
    version: &'a str,
    replaces: Option<&'a str>,
    skip_range: Option<&'a str>,
    image: Option<&'a str>,
}

#[derive(Serialize)]
struct ItemRow<'a> {
    item: &'a str,
    state: ItemState,
    error: Option<String>,
}

impl ResultFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn table(headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(headers.to_vec());
        table
    }

    fn json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    pub fn packages(&self, packages: &[PackageSummary]) -> String {
        if self.format == OutputFormat::Json {
            return Self::json(&packages);
        }
        let mut table = Self::table(&["Package", "Channel", "Head", "Bundles", "Default"]);
        for package in packages {
            for channel in &package.channels {
                let is_default = package.default_channel.as_deref() == Some(channel.name.as_str());
                table.add_row(vec![
                    package.name.clone(),
                    channel.name.clone(),
                    channel.head.clone().unwrap_or_default(),
                    channel.bundles.to_string(),
                    if is_default { "*".to_string() } else { String::new() },
                ]);
            }
        }
        table.to_string()
    }

    pub fn bundles(&self, bundles: &[Bundle]) -> String {
        let rows: Vec<BundleRow<'_>> = bundles
            .iter()
            .map(|bundle| BundleRow {
                name: &bundle.name,
                version: &bundle.version,
                replaces: bundle.replaces.as_deref(),
                skip_range: bundle.skip_range.as_deref(),
                image: bundle.image.as_deref(),
            })
            .collect();
        if self.format == OutputFormat::Json {
            return Self::json(&rows);
        }
        let mut table = Self::table(&["Bundle", "Version", "Replaces", "Skip Range", "Image"]);
        for row in rows {
            table.add_row(vec![
                row.name,
                row.version,
                row.replaces.unwrap_or_default(),
                row.skip_range.unwrap_or_default(),
                row.image.unwrap_or_default(),
            ]);
        }
        table.to_string()
    }

    pub fn names(&self, header: &str, names: &[String]) -> String {
        if self.format == OutputFormat::Json {
            return Self::json(&names);
        }
        let mut table = Self::table(&[header]);
        for name in names {
            table.add_row(vec![name.as_str()]);
        }
        table.to_string()
    }

    pub fn value(&self, value: &str) -> String {
        if self.format == OutputFormat::Json {
            return Self::json(&value);
        }
        value.to_string()
    }

    pub fn path(&self, path: &[String]) -> String {
        if self.format == OutputFormat::Json {
            return Self::json(&path);
        }
        path.join(" -> ")
    }

    pub fn report(&self, report: &BatchReport) -> String {
        let rows: Vec<ItemRow<'_>> = report
            .items
            .iter()
            .map(|item| ItemRow {
                item: &item.item,
                state: item.state,
                error: item.error.as_ref().map(|e| e.to_string()),
            })
            .collect();
        if self.format == OutputFormat::Json {
            return Self::json(&rows);
        }
        let mut table = Self::table(&["Item", "State", "Error"]);
        for row in rows {
            let state = match row.state {
                ItemState::Committed => row.state.to_string().green(),
                ItemState::Skipped => row.state.to_string().yellow(),
                ItemState::Failed => row.state.to_string().red(),
                _ => row.state.to_string().normal(),
            };
            table.add_row(vec![
                row.item.to_string(),
                state.to_string(),
                row.error.unwrap_or_default(),
            ]);
        }
        table.to_string()
    }
}
