//! Core types shared across the cadence scheduling workspace.
//!
//! This crate provides the `Result` alias used by every layer and the
//! strongly-typed identifiers handed to the execution runtime.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ExecutionId, ParseIdError};
