// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! BundleGraph command-line entry point

mod cli;

use clap::Parser;
use cli::{Cli, LogLevel};
use colored::Colorize;

fn init_logging(cli: &Cli) {
    let level = match (cli.log_level, cli.verbose) {
        (Some(level), _) => level.to_level_filter(),
        (None, true) => LogLevel::Debug.to_level_filter(),
        (None, false) => LogLevel::Warn.to_level_filter(),
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = cli::run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
