//! Query execution
//!
//! - `shape`: the closed set of method result shapes
//! - `strategy`: strategy selection and the strategies themselves
//! - `outcome`: lazy results and their conversion

mod outcome;
mod shape;
mod strategy;

pub use outcome::{Deleted, Outcome};
pub use shape::{DeleteMode, ExecutionDescriptor, ExecutionShape};
pub use strategy::ExecutionStrategy;
