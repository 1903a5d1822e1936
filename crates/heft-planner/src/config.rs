//! Configuration files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterConfig;
use crate::error::{read_file, LoadError};
use crate::parsers::config::ParserConfig;
use crate::planner::PlanningAlgorithm;
use crate::schedulers::common::SlotPolicy;

/// Settings of one planning run.
///
/// ```yaml
/// algorithm: Heft
/// slot_policy: insertion
/// trace: trace.json
/// parser:
///   reference_speed: 1000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub algorithm: PlanningAlgorithm,
    /// Overrides the slot policy of HEFT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_policy: Option<SlotPolicy>,
    /// Overrides the seed of the random planner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Where to save the execution trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<PathBuf>,
    #[serde(default, skip_serializing)]
    pub parser: ParserConfig,
}

impl RunConfig {
    pub fn new(algorithm: PlanningAlgorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }

    /// Algorithm with the overrides applied.
    pub fn resolved_algorithm(&self) -> PlanningAlgorithm {
        match self.algorithm {
            PlanningAlgorithm::Heft { slot_policy } => PlanningAlgorithm::Heft {
                slot_policy: self.slot_policy.unwrap_or(slot_policy),
            },
            PlanningAlgorithm::Random { seed } => PlanningAlgorithm::Random {
                seed: self.seed.unwrap_or(seed),
            },
        }
    }

    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_yaml_str(&read_file(path)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(s)?)
    }
}

impl ClusterConfig {
    /// Reads cluster description from a YAML file.
    ///
    /// ```yaml
    /// vms:
    ///   - name: fast
    ///     speed: 2000
    ///   - name: slow
    ///     speed: 500
    /// network:
    ///   bandwidth: 15
    ///   latency: 0.01
    /// overheads:
    ///   queue_delay: 0.5
    /// ```
    ///
    /// A random fleet can be used instead of the `vms` list:
    ///
    /// ```yaml
    /// random_vms:
    ///   count: 5
    ///   base_speed: 1000
    ///   seed: 42
    /// ```
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        Self::from_yaml_str(&read_file(path)?)
    }

    /// Parses and validates the description.
    pub fn from_yaml_str(s: &str) -> Result<Self, LoadError> {
        let config: ClusterConfig = serde_yaml::from_str(s)?;
        config.build()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{VmConfig, VmsConfig};

    #[test]
    fn cluster_config_from_yaml() {
        let config = ClusterConfig::from_yaml_str(
            "
vms:
  - name: fast
    speed: 2000
  - name: slow
    speed: 500
network:
  bandwidth: 10
overheads:
  queue_delay: 0.5
",
        )
        .unwrap();
        assert_eq!(
            config.vms,
            VmsConfig::Vms(vec![
                VmConfig {
                    name: "fast".to_string(),
                    speed: 2000.
                },
                VmConfig {
                    name: "slow".to_string(),
                    speed: 500.
                },
            ])
        );
        assert_eq!(config.network.bandwidth, 10.);
        assert_eq!(config.network.latency, 0.);
        assert_eq!(config.overheads.total(), 0.5);
    }

    #[test]
    fn random_cluster_config_from_yaml() {
        let config = ClusterConfig::from_yaml_str("random_vms:\n  count: 4\n  seed: 1\n").unwrap();
        let vms = config.vm_configs();
        assert_eq!(vms.len(), 4);
        assert!(vms.iter().all(|vm| vm.speed > 0. && vm.speed <= 1000.));
        assert_eq!(vms, config.vm_configs());
        assert_eq!(config.network.bandwidth, 15.);
    }

    #[test]
    fn invalid_cluster_config() {
        assert!(matches!(
            ClusterConfig::from_yaml_str("vms: []\n"),
            Err(LoadError::Cluster(_))
        ));
        assert!(matches!(
            ClusterConfig::from_yaml_str("vms:\n  - name: a\n    speed: 1\nnetwork:\n  bandwidth: 0\n"),
            Err(LoadError::Cluster(_))
        ));
    }

    #[test]
    fn run_config_overrides() {
        let config = RunConfig::from_yaml_str("algorithm: Heft\nslot_policy: insertion\n").unwrap();
        assert_eq!(
            config.resolved_algorithm(),
            PlanningAlgorithm::Heft {
                slot_policy: SlotPolicy::Insertion
            }
        );
        let config = RunConfig::from_yaml_str("algorithm: Random[seed=3]\nseed: 5\n").unwrap();
        assert_eq!(config.resolved_algorithm(), PlanningAlgorithm::Random { seed: 5 });
        assert_eq!(RunConfig::from_yaml_str("{}").unwrap(), RunConfig::default());
        assert!(RunConfig::from_yaml_str("algorithm: Peft\n").is_err());
    }
}
