//! Reservation / limit / weight tag scheduling.
//!
//! This crate arbitrates a shared resource among clients, each with a
//! service-level objective:
//!
//! - **Reservation**: a minimum rate, served ahead of everything else when due.
//! - **Limit**: a ceiling; a client over its limit is not eligible at all.
//! - **Weight**: a share of whatever capacity the reservations leave over.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        MClockScheduler                           │
//! │                                                                  │
//! │  enqueue ──▶ ┌────────────────┐    ┌───────────────┐             │
//! │              │ ClientRegistry │───▶│ DeadlineCache │──▶ dequeue  │
//! │              │ (tags, queues) │    │ (best R / P)  │             │
//! │              └────────────────┘    └───────────────┘             │
//! │                       ▲                    │                     │
//! │                       └──── VirtualClock ◀─┘                     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Deadlines
//!
//! | Series | Spacing | Charged when |
//! |--------|---------|--------------|
//! | Reservation | `system_throughput / reserve` | Selected by reservation |
//! | Limit | `system_throughput / limit` | Every dispatch |
//! | Proportional | `total_weight / weight` | Every dispatch |
//!
//! A client with neither reservation nor weight is best-effort: its
//! proportional spacing is infinite, so it only runs when no weighted client
//! is eligible.
//!
//! All time is virtual: one dispatch or one idle step advances the clock by
//! one tick. Runs are fully deterministic for a given call sequence.
//!
//! # Example
//!
//! ```rust
//! use mclock_core::{ClientId, ServiceLevelObjective};
//! use mclock_sched::{MClockScheduler, SchedulerConfig};
//!
//! let mut sched = MClockScheduler::new(&SchedulerConfig::new(1000)).unwrap();
//!
//! let tenant = ClientId::new(1);
//! let slo = ServiceLevelObjective::new(100, 10, 500);
//! sched.enqueue(tenant, slo, "request-1").unwrap();
//!
//! let dispatch = sched.dequeue_dispatch().unwrap();
//! assert_eq!(dispatch.client_id, tenant);
//! assert_eq!(dispatch.token, "request-1");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod stats;
pub mod tag;

// Re-export main types for convenience.
pub use clock::VirtualClock;
pub use config::SchedulerConfig;
pub use error::{SchedError, SchedResult};
pub use scheduler::{Dispatch, MClockScheduler};
pub use stats::{ClientStats, SchedulerStats};
pub use tag::{ClientTag, DeadlineSeries, SelectionMode};
