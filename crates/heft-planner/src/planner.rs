//! Selection of the planning algorithm.

use std::collections::BTreeMap;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::cost::CostEstimator;
use crate::error::{LoadError, PlanError};
use crate::schedule::Assignment;
use crate::schedulers::common::SlotPolicy;
use crate::schedulers::heft::{HeftPlanner, RankTable};
use crate::schedulers::random::RandomPlanner;

/// Algorithm name with optional parameters, written as `Name` or `Name[key=value,...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmParams {
    name: String,
    params: BTreeMap<String, String>,
}

impl AlgorithmParams {
    pub fn parse(s: &str) -> Option<Self> {
        let Some(open) = s.find('[') else {
            return Some(Self {
                name: s.trim().to_string(),
                params: BTreeMap::new(),
            });
        };
        if !s.ends_with(']') {
            return None;
        }

        let mut params = BTreeMap::new();
        for param in s[open + 1..s.len() - 1].split(',').filter(|p| !p.trim().is_empty()) {
            let pos = param.find('=')?;
            params.insert(param[..pos].trim().to_string(), param[pos + 1..].trim().to_string());
        }

        Some(Self {
            name: s[..open].trim().to_string(),
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get<T: FromStr, K: AsRef<str>>(&self, name: K) -> Option<T> {
        self.params.get(name.as_ref()).and_then(|s| s.parse().ok())
    }

    /// Like `get`, but a present value that does not parse is an error.
    pub fn try_get<T: FromStr, K: AsRef<str>>(&self, name: K) -> Result<Option<T>, LoadError> {
        let name = name.as_ref();
        match self.params.get(name) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| {
                LoadError::InvalidParameter(format!("bad value {value} of parameter {name} in {self}"))
            }),
        }
    }

    /// Fails on the first parameter not listed in `allowed`.
    pub fn check_keys(&self, allowed: &[&str]) -> Result<(), LoadError> {
        match self.params.keys().find(|k| !allowed.contains(&k.as_str())) {
            Some(key) => Err(LoadError::InvalidParameter(format!("unknown parameter {key} in {self}"))),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for AlgorithmParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.params.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(
                f,
                "{}[{}]",
                self.name,
                self.params.iter().map(|(k, v)| format!("{k}={v}")).join(",")
            )
        }
    }
}

/// Closed set of planning strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PlanningAlgorithm {
    Heft { slot_policy: SlotPolicy },
    Random { seed: u64 },
}

impl Default for PlanningAlgorithm {
    fn default() -> Self {
        PlanningAlgorithm::Heft {
            slot_policy: SlotPolicy::Append,
        }
    }
}

impl FromStr for PlanningAlgorithm {
    type Err = LoadError;

    /// Accepts `Heft`, `Heft[insertion=true]` and `Random[seed=N]` (names are case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let params =
            AlgorithmParams::parse(s).ok_or_else(|| LoadError::InvalidParameter(format!("bad algorithm {s}")))?;
        match params.name().to_ascii_lowercase().as_str() {
            "heft" => {
                params.check_keys(&["insertion"])?;
                let insertion = params.try_get::<bool, _>("insertion")?.unwrap_or(false);
                Ok(PlanningAlgorithm::Heft {
                    slot_policy: if insertion {
                        SlotPolicy::Insertion
                    } else {
                        SlotPolicy::Append
                    },
                })
            }
            "random" => {
                params.check_keys(&["seed"])?;
                Ok(PlanningAlgorithm::Random {
                    seed: params.try_get("seed")?.unwrap_or(0),
                })
            }
            _ => Err(LoadError::InvalidParameter(format!("unknown algorithm {s}"))),
        }
    }
}

impl TryFrom<String> for PlanningAlgorithm {
    type Error = LoadError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PlanningAlgorithm> for String {
    fn from(algorithm: PlanningAlgorithm) -> Self {
        algorithm.to_string()
    }
}

impl std::fmt::Display for PlanningAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PlanningAlgorithm::Heft {
                slot_policy: SlotPolicy::Append,
            } => write!(f, "Heft"),
            PlanningAlgorithm::Heft {
                slot_policy: SlotPolicy::Insertion,
            } => write!(f, "Heft[insertion=true]"),
            PlanningAlgorithm::Random { seed } => write!(f, "Random[seed={seed}]"),
        }
    }
}

/// Outcome of a planning pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Upward ranks, present for rank-based algorithms.
    pub ranks: Option<RankTable>,
    pub assignment: Assignment,
}

impl PlanningAlgorithm {
    /// Produces a static assignment, updating VM free-times in `cluster`.
    pub fn plan(&self, estimator: &CostEstimator, cluster: &mut Cluster) -> Result<Plan, PlanError> {
        match *self {
            PlanningAlgorithm::Heft { slot_policy } => {
                let mut planner = HeftPlanner::new().with_slot_policy(slot_policy);
                let assignment = planner.schedule(estimator, cluster)?;
                Ok(Plan {
                    ranks: planner.into_ranks(),
                    assignment,
                })
            }
            PlanningAlgorithm::Random { seed } => Ok(Plan {
                ranks: None,
                assignment: RandomPlanner::new(seed).schedule(estimator, cluster)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_params() {
        let params = AlgorithmParams::parse("Heft[insertion=true,foo=1]").unwrap();
        assert_eq!(params.name(), "Heft");
        assert_eq!(params.get::<bool, _>("insertion"), Some(true));
        assert_eq!(params.get::<u32, _>("foo"), Some(1));
        assert_eq!(params.to_string(), "Heft[foo=1,insertion=true]");
        assert!(AlgorithmParams::parse("Heft[insertion=true").is_none());
        assert_eq!(params.try_get::<bool, _>("missing").unwrap(), None);
        assert!(params.try_get::<bool, _>("foo").is_err());
        assert!(params.check_keys(&["insertion"]).is_err());
        assert!(params.check_keys(&["insertion", "foo"]).is_ok());
    }

    #[test]
    fn parse_algorithms() {
        assert_eq!("heft".parse::<PlanningAlgorithm>().unwrap(), PlanningAlgorithm::default());
        assert_eq!(
            "Heft[insertion=true]".parse::<PlanningAlgorithm>().unwrap(),
            PlanningAlgorithm::Heft {
                slot_policy: SlotPolicy::Insertion
            }
        );
        assert_eq!(
            "Random[seed=7]".parse::<PlanningAlgorithm>().unwrap(),
            PlanningAlgorithm::Random { seed: 7 }
        );
        assert!("Peft".parse::<PlanningAlgorithm>().is_err());
        for bad in [
            "Heft[insertion=yes]",
            "Heft[insertoin=true]",
            "Heft[seed=1]",
            "Random[seed=abc]",
            "Random[seed=-1]",
            "Random[insertion=true]",
        ] {
            assert!(
                matches!(bad.parse::<PlanningAlgorithm>(), Err(LoadError::InvalidParameter(_))),
                "{bad} accepted"
            );
        }
        for algorithm in ["Heft", "Heft[insertion=true]", "Random[seed=3]"] {
            assert_eq!(algorithm.parse::<PlanningAlgorithm>().unwrap().to_string(), algorithm);
        }
    }
}
