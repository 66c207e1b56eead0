//! Simulation profiles.
//!
//! A profile describes the system throughput, the client population with
//! their objectives, how tokens arrive, and optionally the dispatch counts a
//! correct scheduler produces for it.
//!
//! # Example
//!
//! ```ignore
//! use mclock_workload::profiles::{load_profile, SimulationProfile};
//!
//! // Load a named profile
//! let profile = load_profile("reference").unwrap();
//!
//! // Or load from a TOML file
//! let profile = SimulationProfile::from_file("tenants.toml").unwrap();
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use mclock_core::{ClientId, ServiceLevelObjective};
use serde::{Deserialize, Serialize};

use crate::error::{WorkloadError, WorkloadResult};

/// One client in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientProfile {
    /// Client identifier.
    pub id: u64,
    /// Reserved rate (0 = none).
    pub reserve: u64,
    /// Proportional weight (0 = none).
    pub weight: u32,
    /// Rate ceiling (0 = unlimited, raised to `reserve` if lower).
    pub limit: u64,
    /// Tokens this client submits over the run.
    pub tokens: u64,
    /// Dispatches a correct scheduler gives this client, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_dispatches: Option<u64>,
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self {
            id: 0,
            reserve: 0,
            weight: 1,
            limit: 0,
            tokens: 1_000,
            expected_dispatches: None,
        }
    }
}

impl ClientProfile {
    /// Returns the client ID.
    #[must_use]
    pub const fn client_id(&self) -> ClientId {
        ClientId::new(self.id)
    }

    /// Returns the client's objective.
    #[must_use]
    pub const fn slo(&self) -> ServiceLevelObjective {
        ServiceLevelObjective::new(self.reserve, self.weight, self.limit)
    }
}

/// How tokens arrive during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternProfile {
    /// Every client's tokens are enqueued up front, one per client per round,
    /// then the scheduler is drained for the configured dispatch count.
    #[default]
    Backlogged,

    /// Enqueues and dequeues are mixed at random, so clients drain and
    /// reactivate throughout the run.
    Interleaved {
        /// Probability that a step enqueues rather than dequeues.
        enqueue_probability: f64,
    },
}

/// A complete simulation profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationProfile {
    /// Profile name.
    pub name: String,
    /// Description of what this profile exercises.
    pub description: String,
    /// Scheduler capacity baseline.
    pub system_throughput: u64,
    /// Number of dispatches to request.
    pub dispatches: u64,
    /// Arrival pattern.
    pub pattern: PatternProfile,
    /// Client population.
    pub clients: Vec<ClientProfile>,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: "Two equally weighted clients".to_string(),
            system_throughput: 1_000,
            dispatches: 1_000,
            pattern: PatternProfile::default(),
            clients: vec![
                ClientProfile {
                    id: 1,
                    ..ClientProfile::default()
                },
                ClientProfile {
                    id: 2,
                    ..ClientProfile::default()
                },
            ],
        }
    }
}

impl SimulationProfile {
    /// Load a profile from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| ProfileError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Parse a profile from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML cannot be parsed.
    pub fn from_toml(toml: &str) -> Result<Self, ProfileError> {
        toml::from_str(toml).map_err(|e| ProfileError::Parse {
            message: e.to_string(),
        })
    }

    /// Serialize the profile to a TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Returns the sum of all reservations.
    #[must_use]
    pub fn total_reserve(&self) -> u64 {
        self.clients.iter().map(|c| c.reserve).sum()
    }

    /// Returns whether every reservation fits in the system throughput.
    #[must_use]
    pub fn reservations_fit(&self) -> bool {
        self.total_reserve() <= self.system_throughput
    }

    /// Drops expected dispatch counts, which only hold for the dispatch count
    /// the profile was written for.
    pub fn clear_expectations(&mut self) {
        for client in &mut self.clients {
            client.expected_dispatches = None;
        }
    }

    /// Checks that the profile can be run.
    ///
    /// # Errors
    ///
    /// Returns `WorkloadError::InvalidProfile` describing the first problem.
    pub fn validate(&self) -> WorkloadResult<()> {
        let invalid = |message: String| Err(WorkloadError::InvalidProfile { message });

        if self.system_throughput == 0 {
            return invalid(format!("{}: system_throughput must be positive", self.name));
        }
        if self.clients.is_empty() {
            return invalid(format!("{}: no clients", self.name));
        }
        if let PatternProfile::Interleaved {
            enqueue_probability,
        } = self.pattern
        {
            if !(enqueue_probability > 0.0 && enqueue_probability <= 1.0) {
                return invalid(format!(
                    "{}: enqueue_probability {enqueue_probability} outside (0, 1]",
                    self.name
                ));
            }
        }

        let mut seen = BTreeSet::new();
        for client in &self.clients {
            if !seen.insert(client.id) {
                return invalid(format!("{}: duplicate client id {}", self.name, client.id));
            }
        }
        Ok(())
    }
}

/// Error type for profile operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// I/O error reading profile file.
    #[error("failed to read profile from {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Parse error in TOML.
    #[error("failed to parse profile: {message}")]
    Parse {
        /// Error message.
        message: String,
    },
    /// Profile not found.
    #[error("profile not found: {name}")]
    NotFound {
        /// Profile name.
        name: String,
    },
}

fn client(id: u64, slo: (u64, u32, u64), tokens: u64, expected: Option<u64>) -> ClientProfile {
    let (reserve, weight, limit) = slo;
    ClientProfile {
        id,
        reserve,
        weight,
        limit,
        tokens,
        expected_dispatches: expected,
    }
}

fn profile(
    name: &str,
    desc: &str,
    system_throughput: u64,
    dispatches: u64,
    pattern: PatternProfile,
    clients: Vec<ClientProfile>,
) -> SimulationProfile {
    SimulationProfile {
        name: name.to_string(),
        description: desc.to_string(),
        system_throughput,
        dispatches,
        pattern,
        clients,
    }
}

/// Built-in simulation profiles.
#[must_use]
pub fn builtin_profiles() -> HashMap<&'static str, SimulationProfile> {
    let backlogged = PatternProfile::Backlogged;
    HashMap::from([
        (
            "reference",
            profile(
                "reference",
                "Two reserved tenants and one capped tenant sharing 2000/s",
                2_000,
                2_000,
                backlogged,
                vec![
                    client(1, (250, 100, 500_000_000), 2_000, Some(333)),
                    client(2, (250, 200, 500_000_000), 2_000, Some(667)),
                    client(3, (0, 300, 1_000), 2_000, Some(1_000)),
                ],
            ),
        ),
        (
            "reservation",
            profile(
                "reservation",
                "Reservations honored against a heavily weighted tenant",
                1_000,
                1_000,
                backlogged,
                vec![
                    client(1, (200, 0, 0), 1_000, Some(200)),
                    client(2, (100, 1, 1_000), 1_000, Some(160)),
                    client(3, (0, 4, 0), 1_000, Some(640)),
                ],
            ),
        ),
        (
            "limit",
            profile(
                "limit",
                "A heavily weighted tenant held to its ceiling",
                1_000,
                1_000,
                backlogged,
                vec![
                    client(1, (0, 5, 100), 1_000, Some(100)),
                    client(2, (0, 1, 0), 1_000, Some(450)),
                    client(3, (0, 1, 0), 1_000, Some(450)),
                ],
            ),
        ),
        (
            "churn",
            profile(
                "churn",
                "Random arrivals that repeatedly drain and reactivate tenants",
                500,
                4_000,
                PatternProfile::Interleaved {
                    enqueue_probability: 0.55,
                },
                vec![
                    client(1, (50, 2, 200), 2_000, None),
                    client(2, (0, 3, 0), 2_000, None),
                    client(3, (0, 1, 100), 2_000, None),
                    client(4, (100, 0, 0), 2_000, None),
                ],
            ),
        ),
    ])
}

/// Load a built-in profile by name.
///
/// # Errors
///
/// Returns an error if the profile name is not found.
pub fn load_profile(name: &str) -> Result<SimulationProfile, ProfileError> {
    builtin_profiles()
        .remove(name)
        .ok_or_else(|| ProfileError::NotFound {
            name: name.to_string(),
        })
}

/// List all available built-in profile names.
#[must_use]
pub fn list_profiles() -> Vec<&'static str> {
    let mut names: Vec<_> = builtin_profiles().keys().copied().collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = SimulationProfile::default();
        assert_eq!(profile.clients.len(), 2);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_builtin_profiles_are_valid() {
        assert_eq!(list_profiles(), vec!["churn", "limit", "reference", "reservation"]);
        for (name, profile) in builtin_profiles() {
            assert_eq!(profile.name, name);
            assert!(profile.validate().is_ok(), "{name}");
            assert!(profile.reservations_fit(), "{name}");
        }
    }

    #[test]
    fn test_expected_counts_sum_to_dispatches() {
        for profile in builtin_profiles().into_values() {
            let expected: Option<u64> = profile
                .clients
                .iter()
                .map(|c| c.expected_dispatches)
                .sum();
            if let Some(total) = expected {
                assert_eq!(total, profile.dispatches, "{}", profile.name);
            }
        }
    }

    #[test]
    fn test_profile_not_found() {
        let result = load_profile("nonexistent");
        assert!(matches!(result, Err(ProfileError::NotFound { .. })));
    }

    #[test]
    fn test_toml_roundtrip() {
        let profile = load_profile("churn").unwrap();
        let parsed = SimulationProfile::from_toml(&profile.to_toml()).unwrap();
        assert_eq!(parsed, profile);
    }

    #[test]
    fn test_parse_partial_toml() {
        let profile = SimulationProfile::from_toml(
            r#"
            name = "two-tenants"
            system_throughput = 400

            [pattern]
            kind = "interleaved"
            enqueue_probability = 0.7

            [[clients]]
            id = 7
            reserve = 100

            [[clients]]
            id = 8
            weight = 3
            expected_dispatches = 12
            "#,
        )
        .unwrap();

        assert_eq!(profile.dispatches, 1_000);
        assert_eq!(
            profile.pattern,
            PatternProfile::Interleaved {
                enqueue_probability: 0.7
            }
        );
        assert_eq!(profile.clients[0].slo(), ServiceLevelObjective::new(100, 1, 0));
        assert_eq!(profile.clients[0].tokens, 1_000);
        assert_eq!(profile.clients[1].expected_dispatches, Some(12));
        assert_eq!(profile.total_reserve(), 100);
    }

    #[test]
    fn test_parse_error() {
        let result = SimulationProfile::from_toml("system_throughput = \"fast\"");
        assert!(matches!(result, Err(ProfileError::Parse { .. })));
    }

    #[test]
    fn test_validate_accepts_best_effort_client() {
        let mut profile = SimulationProfile::default();
        profile.clients[0].reserve = 0;
        profile.clients[0].weight = 0;
        assert!(profile.clients[0].slo().is_best_effort());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_profiles() {
        let mut profile = SimulationProfile::default();
        profile.clients[1].id = 1;
        assert!(matches!(
            profile.validate(),
            Err(WorkloadError::InvalidProfile { .. })
        ));

        let mut profile = SimulationProfile::default();
        profile.pattern = PatternProfile::Interleaved {
            enqueue_probability: 0.0,
        };
        assert!(profile.validate().is_err());

        let profile = SimulationProfile {
            system_throughput: 0,
            ..SimulationProfile::default()
        };
        assert!(profile.validate().is_err());
    }
}
