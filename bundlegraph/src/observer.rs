// Copyright (c) 2025 BundleGraph Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Structured event observation
//!
//! Components never log through global state of their own; callers hand
//! them an [`Observer`] and attach the package/version/channel/reference
//! fields relevant to each event.

use log::Level;
use std::fmt;

/// Structured context attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFields {
    pub package: Option<String>,
    pub version: Option<String>,
    pub channel: Option<String>,
    pub reference: Option<String>,
}

impl EventFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.package.is_none()
            && self.version.is_none()
            && self.channel.is_none()
            && self.reference.is_none()
    }
}

impl fmt::Display for EventFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs = [
            ("package", &self.package),
            ("version", &self.version),
            ("channel", &self.channel),
            ("reference", &self.reference),
        ];
        let mut first = true;
        for (key, value) in pairs {
            if let Some(value) = value {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{}={}", key, value)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Receiver of structured catalog events
pub trait Observer: Send + Sync {
    fn event(&self, level: Level, fields: &EventFields, message: &str);

    fn debug(&self, fields: &EventFields, message: &str) {
        self.event(Level::Debug, fields, message);
    }

    fn info(&self, fields: &EventFields, message: &str) {
        self.event(Level::Info, fields, message);
    }

    fn warn(&self, fields: &EventFields, message: &str) {
        self.event(Level::Warn, fields, message);
    }

    fn error(&self, fields: &EventFields, message: &str) {
        self.event(Level::Error, fields, message);
    }
}

/// Forwards events to the `log` facade
#[derive(Debug, Clone)]
pub struct LogObserver {
    target: String,
}

impl LogObserver {
    pub fn new() -> Self {
        Self::with_target("bundlegraph")
    }

    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for LogObserver {
    fn event(&self, level: Level, fields: &EventFields, message: &str) {
        if fields.is_empty() {
            log::log!(target: self.target.as_str(), level, "{}", message);
        } else {
            log::log!(target: self.target.as_str(), level, "{} {}", message, fields);
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn event(&self, _level: Level, _fields: &EventFields, _message: &str) {}
}
