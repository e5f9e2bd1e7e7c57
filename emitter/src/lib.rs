//! The synthetic event emitter.
//!
//! This library supports the emitter binary found elsewhere in this project.
//! The emitter posts randomized log records at a log ingestion service on a
//! fixed pace, ignoring whatever the service answers. It exists to put traffic
//! on a locally running service during development.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod emitter;
