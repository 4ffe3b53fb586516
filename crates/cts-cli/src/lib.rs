//! CLI library components for the clinical time-series matrix pipeline.

#![allow(missing_docs)]
#![allow(clippy::needless_pass_by_value)]

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
