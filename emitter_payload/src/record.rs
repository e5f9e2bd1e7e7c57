//! The emitted log record.
//!
//! A [`Record`] is built fresh for every request and discarded once sent. All
//! fields other than the structural constants -- `schema`, `warehouse`, the
//! `float` literal and the field set itself -- are independent random draws or
//! clock readings.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Config, Error, EventKind, Variant, strings};

/// The constant numeric literal carried in every record's `data`.
pub const FLOAT_LITERAL: f64 = 123.456;

/// `data` of a [`Variant::Basic`] record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicData {
    /// The simulated event kind
    pub things: EventKind,
    /// Random identifier
    pub foo: String,
    /// Wall-clock seconds since the epoch, as text
    pub fizz: String,
    /// Always [`FLOAT_LITERAL`]
    pub float: f64,
    /// Random identifier
    pub splunk: String,
}

/// `data` of a [`Variant::Warehouse`] record.
///
/// The wire names of the two identifiers are misspelled on the receiving side
/// and must stay that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarehouseData {
    /// The simulated event kind
    pub event_key: EventKind,
    /// Random identifier
    #[serde(rename = "randum_string_id")]
    pub string_id: String,
    /// Wall-clock seconds since the epoch, as text
    pub time: String,
    /// Always [`FLOAT_LITERAL`]
    pub float: f64,
    /// Random identifier
    #[serde(rename = "another_raudnm_str")]
    pub other_string_id: String,
}

/// The nested `data` mapping of a [`Record`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Data {
    /// See [`BasicData`]
    Basic(BasicData),
    /// See [`WarehouseData`]
    Warehouse(WarehouseData),
}

/// A single log record as posted to the log service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    /// Fresh v4 UUID per record
    pub source: Uuid,
    /// The record family
    pub schema: String,
    /// Warehouse tag, warehouse variant only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    /// Milliseconds since the epoch at generation, warehouse variant only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// The randomized body
    pub data: Data,
}

/// Seconds since the epoch as text. Whole seconds keep a trailing `.0`, the
/// `Debug` rendering of `f64`, so the value always reads as a float.
fn seconds_text(since_epoch: Duration) -> String {
    format!("{:?}", since_epoch.as_secs_f64())
}

/// Generator of [`Record`] instances
#[derive(Debug, Clone)]
pub struct Records {
    config: Config,
}

impl Records {
    /// Create a new instance of `Records`
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The record shape this generator produces.
    #[must_use]
    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    /// Generate a record stamped with the current wall-clock time.
    ///
    /// # Errors
    ///
    /// Function will error if the system clock reads before the Unix epoch.
    pub fn generate<R>(&self, rng: &mut R) -> Result<Record, Error>
    where
        R: Rng + ?Sized,
    {
        self.generate_at(rng, SystemTime::now())
    }

    /// Generate a record stamped with `now`.
    ///
    /// # Errors
    ///
    /// Function will error if `now` is before the Unix epoch.
    pub fn generate_at<R>(&self, rng: &mut R, now: SystemTime) -> Result<Record, Error>
    where
        R: Rng + ?Sized,
    {
        let since_epoch = now.duration_since(UNIX_EPOCH)?;
        let seconds = seconds_text(since_epoch);

        let mut uuid_bytes = [0_u8; 16];
        rng.fill(&mut uuid_bytes);
        let source = uuid::Builder::from_random_bytes(uuid_bytes).into_uuid();

        let record = match self.config.variant {
            Variant::Basic => Record {
                source,
                schema: self.config.schema.clone(),
                warehouse: None,
                client_timestamp: None,
                data: Data::Basic(BasicData {
                    things: rng.random(),
                    foo: strings::random_id(rng),
                    fizz: seconds,
                    float: FLOAT_LITERAL,
                    splunk: strings::random_id(rng),
                }),
            },
            Variant::Warehouse => {
                // round to the nearest millisecond
                let millis = since_epoch.as_nanos().saturating_add(500_000) / 1_000_000;
                Record {
                    source,
                    schema: self.config.schema.clone(),
                    warehouse: Some(self.config.warehouse.clone()),
                    client_timestamp: Some(i64::try_from(millis).unwrap_or(i64::MAX)),
                    data: Data::Warehouse(WarehouseData {
                        event_key: rng.random(),
                        string_id: strings::random_id(rng),
                        time: seconds,
                        float: FLOAT_LITERAL,
                        other_string_id: strings::random_id(rng),
                    }),
                }
            }
        };
        Ok(record)
    }

    /// Generate a record and encode it as a JSON object.
    ///
    /// # Errors
    ///
    /// See [`Records::generate`]. Encoding errors are also passed up.
    pub fn encode<R>(&self, rng: &mut R) -> Result<Vec<u8>, Error>
    where
        R: Rng + ?Sized,
    {
        let record = self.generate(rng)?;
        Ok(serde_json::to_vec(&record)?)
    }
}
