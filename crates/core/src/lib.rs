//! # pipesync-core
//!
//! Pipeline identity types and the error type shared by every pipesync
//! collaborator.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod error;
pub mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{GateState, Pipeline, PipelineKey};
