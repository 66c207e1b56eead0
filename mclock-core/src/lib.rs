//! mclock Core - Strongly-typed identifiers and QoS parameters.
//!
//! This crate holds the value types shared by the scheduler and its drivers.
//! It has no scheduling logic of its own.
//!
//! # Design Principles
//!
//! - **Strongly-typed IDs**: a `ClientId` is not a bare integer
//! - **Explicit types**: rates are u64, weights are u32
//! - **No unsafe code**

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod slo;
mod types;

pub use slo::ServiceLevelObjective;
pub use types::ClientId;
