//! Flow-side types consumed and produced by the cadence scheduler.
//!
//! This crate provides:
//!
//! - **Flow**: the subset of a flow definition the scheduler needs (identity,
//!   revision, labels, declared inputs, variables)
//! - **Labels**: key/value execution labels and the system label conventions
//! - **Execution requests**: the record handed to the execution runtime
//! - **Input resolution**: defaults, required checks and type coercion for
//!   execution inputs

pub mod error;
pub mod execution;
pub mod flow;
pub mod input;
pub mod label;

pub use error::InputError;
pub use execution::{ExecutionRequest, ExecutionState, ExecutionTrigger};
pub use flow::{Flow, FlowInput, InputType};
pub use input::{DefaultInputResolver, InputResolver};
pub use label::{Label, merge_labels, without_system_labels};
