//! Chromosome detection and model benchmarking for a desktop host application.
//!
//! Two binaries, `detect` and `benchmark`, wrap the library. Each prints exactly one
//! JSON document on stdout; logs go to stderr.

pub mod annotations;
pub mod benchmark;
pub mod cli;
pub mod detect;
pub mod error;
pub mod image_utils;
pub mod logging;
pub mod metrics;
pub mod object_detection;

pub use error::{DetectorError, Result};
