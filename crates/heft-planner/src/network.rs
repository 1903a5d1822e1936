//! Network and overhead parameters used by the cost model.

use serde::{Deserialize, Serialize};

use crate::error::ClusterError;

/// Represents network model parameters.
///
/// A single bandwidth is shared by all pairs of distinct VMs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Network bandwidth in MB/s.
    pub bandwidth: f64,
    /// Network latency in seconds, paid once per transfer.
    #[serde(default)]
    pub latency: f64,
}

impl NetworkConfig {
    /// Bandwidth should be in MB/s, latency in seconds.
    pub fn constant(bandwidth: f64, latency: f64) -> Self {
        Self { bandwidth, latency }
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        if !(self.bandwidth > 0.) {
            return Err(ClusterError::NonPositiveBandwidth(self.bandwidth));
        }
        if !(self.latency >= 0.) {
            return Err(ClusterError::NegativeLatency(self.latency));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    /// 15 MB/s with no latency, the transfer rate of the storage in the original datacenter setup.
    fn default() -> Self {
        Self::constant(15., 0.)
    }
}

/// Extra delays charged on every transfer between two different VMs.
///
/// Each term is independent and optional; the cost model adds up whatever is configured.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OverheadConfig {
    /// Delay of staging a file out of the producing VM.
    pub output_transfer_delay: f64,
    /// Delay of staging a file into the consuming VM.
    pub input_transfer_delay: f64,
    /// Delay of merging tasks into a clustered job.
    pub clustering_delay: f64,
    /// Delay of waiting in the remote submission queue.
    pub queue_delay: f64,
}

impl OverheadConfig {
    pub fn total(&self) -> f64 {
        self.output_transfer_delay + self.input_transfer_delay + self.clustering_delay + self.queue_delay
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        for (name, value) in [
            ("output_transfer_delay", self.output_transfer_delay),
            ("input_transfer_delay", self.input_transfer_delay),
            ("clustering_delay", self.clustering_delay),
            ("queue_delay", self.queue_delay),
        ] {
            if !(value >= 0.) {
                return Err(ClusterError::NegativeOverhead { name, value });
            }
        }
        Ok(())
    }
}
