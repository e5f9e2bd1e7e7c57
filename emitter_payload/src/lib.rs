//! The emitter payloads
//!
//! This library builds the randomized log records that the emitter posts to a
//! log ingestion endpoint. Two record shapes exist, the older `/log` shape
//! and the `/v0/log` warehouse shape, selected by [`Variant`].

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

use std::{str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

pub mod event;
pub mod record;
pub mod strings;

pub use event::EventKind;
pub use record::{BasicData, Data, Record, Records, WarehouseData};

/// Errors related to record generation
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Json payload could not be encoded
    #[error("Json payload could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
    /// The wall clock reads earlier than the Unix epoch
    #[error("System clock is set before the Unix epoch: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

/// The record shape to emit
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// `source`, `schema` and `data` only, posted to `/log`
    Basic,
    /// Adds `warehouse` and `client_timestamp`, posted to `/v0/log`
    #[default]
    Warehouse,
}

impl Variant {
    /// The configuration name of this variant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Basic => "basic",
            Variant::Warehouse => "warehouse",
        }
    }

    /// The path on the log service that accepts this record shape.
    #[must_use]
    pub fn default_path(self) -> &'static str {
        match self {
            Variant::Basic => "/log",
            Variant::Warehouse => "/v0/log",
        }
    }

    /// The pause taken before each record of this shape is sent.
    #[must_use]
    pub fn default_delay(self) -> Duration {
        match self {
            Variant::Basic => Duration::from_millis(30),
            Variant::Warehouse => Duration::from_micros(300),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "basic" => Ok(Variant::Basic),
            "warehouse" => Ok(Variant::Warehouse),
            other => Err(format!(
                "unknown variant '{other}', expected 'basic' or 'warehouse'"
            )),
        }
    }
}

fn default_schema() -> String {
    "events".to_string()
}

fn default_warehouse() -> String {
    "dev".to_string()
}

/// Configuration for [`Records`]
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The record shape to emit
    #[serde(default)]
    pub variant: Variant,
    /// The constant `schema` value of every record
    #[serde(default = "default_schema")]
    pub schema: String,
    /// The constant `warehouse` tag, used by [`Variant::Warehouse`] only
    #[serde(default = "default_warehouse")]
    pub warehouse: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variant: Variant::default(),
            schema: default_schema(),
            warehouse: default_warehouse(),
        }
    }
}

impl Config {
    /// Construct the default configuration for a given `variant`.
    #[must_use]
    pub fn with_variant(variant: Variant) -> Self {
        Self {
            variant,
            ..Self::default()
        }
    }
}
