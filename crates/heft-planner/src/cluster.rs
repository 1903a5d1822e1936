//! Cluster model.

use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::error::ClusterError;
use crate::network::{NetworkConfig, OverheadConfig};

/// Parameters of one virtual machine.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VmConfig {
    pub name: String,
    /// Processing rate in work units per second (MIPS).
    pub speed: f64,
}

/// Generates a heterogeneous fleet: every VM gets `base_speed` scaled by a random ratio in `(0, 1]`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RandomVmsConfig {
    pub count: usize,
    #[serde(default = "default_base_speed")]
    pub base_speed: f64,
    #[serde(default)]
    pub seed: u64,
}

fn default_base_speed() -> f64 {
    1000.
}

/// Either an explicit list of VMs or a seeded random fleet.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum VmsConfig {
    Vms(Vec<VmConfig>),
    RandomVms(RandomVmsConfig),
}

/// Full cluster description: VMs, network and transfer overheads.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClusterConfig {
    #[serde(flatten)]
    pub vms: VmsConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub overheads: OverheadConfig,
}

impl ClusterConfig {
    pub fn new(vms: Vec<VmConfig>, network: NetworkConfig) -> Self {
        Self {
            vms: VmsConfig::Vms(vms),
            network,
            overheads: OverheadConfig::default(),
        }
    }

    /// Fleet of `count` VMs with speeds `base_speed * ratio`, ratio drawn uniformly from `(0, 1]`.
    pub fn random(count: usize, base_speed: f64, seed: u64, network: NetworkConfig) -> Self {
        Self {
            vms: VmsConfig::RandomVms(RandomVmsConfig {
                count,
                base_speed,
                seed,
            }),
            network,
            overheads: OverheadConfig::default(),
        }
    }

    pub fn with_overheads(mut self, overheads: OverheadConfig) -> Self {
        self.overheads = overheads;
        self
    }

    /// Expands the VM list, generating random VMs if needed.
    pub fn vm_configs(&self) -> Vec<VmConfig> {
        match &self.vms {
            VmsConfig::Vms(vms) => vms.clone(),
            VmsConfig::RandomVms(params) => {
                let mut rng = Pcg64::seed_from_u64(params.seed);
                (0..params.count)
                    .map(|i| {
                        // gen::<f64>() lies in [0, 1), flipping it keeps every speed positive
                        let ratio = 1. - rng.gen::<f64>();
                        VmConfig {
                            name: format!("vm-{}", i),
                            speed: params.base_speed * ratio,
                        }
                    })
                    .collect()
            }
        }
    }

    pub fn build(&self) -> Result<Cluster, ClusterError> {
        Cluster::new(self.vm_configs(), self.network.clone(), self.overheads.clone())
    }
}

/// Represents a virtual machine that executes workflow tasks one at a time.
#[derive(Debug, Clone, Serialize)]
pub struct VirtualMachine {
    pub id: usize,
    pub name: String,
    pub speed: f64,
    /// Earliest time the VM is free to start new work.
    pub free_time: f64,
}

/// Validated set of VMs together with the network parameters between them.
#[derive(Debug, Clone)]
pub struct Cluster {
    vms: Vec<VirtualMachine>,
    network: NetworkConfig,
    overheads: OverheadConfig,
}

impl Cluster {
    pub fn new(vms: Vec<VmConfig>, network: NetworkConfig, overheads: OverheadConfig) -> Result<Self, ClusterError> {
        if vms.is_empty() {
            return Err(ClusterError::NoVirtualMachines);
        }
        if let Some(vm) = vms.iter().find(|vm| !(vm.speed > 0.) || !vm.speed.is_finite()) {
            return Err(ClusterError::NonPositiveSpeed {
                vm: vm.name.clone(),
                speed: vm.speed,
            });
        }
        network.validate()?;
        overheads.validate()?;
        let vms = vms
            .into_iter()
            .enumerate()
            .map(|(id, vm)| VirtualMachine {
                id,
                name: vm.name,
                speed: vm.speed,
                free_time: 0.,
            })
            .collect();
        Ok(Self {
            vms,
            network,
            overheads,
        })
    }

    pub fn vms(&self) -> &[VirtualMachine] {
        &self.vms
    }

    pub fn vm(&self, id: usize) -> Result<&VirtualMachine, ClusterError> {
        self.vms.get(id).ok_or(ClusterError::UnknownVm(id))
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn overheads(&self) -> &OverheadConfig {
        &self.overheads
    }

    pub(crate) fn set_free_time(&mut self, id: usize, time: f64) {
        self.vms[id].free_time = time;
    }

    /// Makes every VM available from time zero, as before a planning pass.
    pub fn reset(&mut self) {
        for vm in self.vms.iter_mut() {
            vm.free_time = 0.;
        }
    }
}
