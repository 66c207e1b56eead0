//! mclock Workload: deterministic, verifiable scheduler simulation.
//!
//! Runs a [`SimulationProfile`] against a fresh scheduler and checks the
//! recorded history for:
//!
//! 1. **Correctness** - no lost, duplicated or misrouted tokens; FIFO per client
//! 2. **Objectives** - limit ceilings and reservation floors
//! 3. **Shares** - dispatch counts matching a profile's expectations
//!
//! All time is virtual and all randomness comes from a seeded `ChaCha8Rng`,
//! so a (profile, seed) pair always produces the same run.
//!
//! # Example
//!
//! ```rust
//! use mclock_workload::profiles::load_profile;
//! use mclock_workload::Workload;
//!
//! let mut workload = Workload::builder()
//!     .seed(42)
//!     .profile(load_profile("limit").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let stats = workload.run().unwrap();
//! assert!(stats.violations.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod error;
mod history;
mod verification;
mod workload;

pub mod profiles;

pub use error::{WorkloadError, WorkloadResult};
pub use history::{DispatchRecord, History, HistoryStats, Registration, TokenTag};
pub use profiles::{ClientProfile, PatternProfile, ProfileError, SimulationProfile};
pub use verification::{Verification, Violation};
pub use workload::{ClientSummary, Workload, WorkloadBuilder, WorkloadStats};
