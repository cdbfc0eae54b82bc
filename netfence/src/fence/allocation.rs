use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use ipnet::IpNet;
use log::debug;

use netfence_core::ip::gateway_ip;
use netfence_core::subnets::SubnetPool;

use crate::configurer::NetworkConfigurer;

use super::{hex_ip, FenceError, FlatFence};

/// A single container's claim on the network: its subnet, container
/// address and the interface names derived for it. Dropping the value
/// does not give anything back; call [`Allocation::dismantle`].
pub struct Allocation {
    pub(super) subnet: IpNet,
    pub(super) container_ip: IpAddr,
    pub(super) container_ifc: String,
    pub(super) host_ifc: String,
    pub(super) subnet_shareable: bool,
    pub(super) bridge_ifc: String,
    pub(super) mtu: u32,
    pub(super) external_ip: IpAddr,
    pub(super) subnets: Arc<SubnetPool>,
    pub(super) configurer: Arc<dyn NetworkConfigurer>,
}

impl Allocation {
    /// Gives the claimed pair back to the pool and removes the host-side
    /// interface, plus the bridge when this was the subnet's last claim.
    /// A second call fails: the pair is no longer on record.
    pub fn dismantle(&self) -> Result<(), FenceError> {
        let subnet_now_empty = self.subnets.release(self.subnet, self.container_ip)?;

        if subnet_now_empty {
            debug!(
                "Subnet {} has no claims left, removing bridge {}!",
                self.subnet, self.bridge_ifc
            );
            self.configurer
                .deconfigure_host(&self.host_ifc, Some(&self.bridge_ifc))?;
        } else {
            self.configurer.deconfigure_host(&self.host_ifc, None)?;
        }

        Ok(())
    }

    /// Projects the allocation onto its durable record.
    pub fn flatten(&self) -> FlatFence {
        FlatFence {
            ipn: self.subnet.to_string(),
            container_ip: self.container_ip.to_string(),
            container_ifc_name: self.container_ifc.clone(),
            host_ifc_name: self.host_ifc.clone(),
            subnet_shareable: self.subnet_shareable,
            bridge_ifc_name: self.bridge_ifc.clone(),
        }
    }

    /// Serializes the durable record, ready for
    /// [`Fence::rebuild`](super::Fence::rebuild) after a restart.
    pub fn marshal(&self) -> Result<String, FenceError> {
        Ok(serde_json::to_string(&self.flatten())?)
    }

    /// Appends the network environment a container process is started
    /// with.
    pub fn configure_process_env(&self, env: &mut Vec<String>) {
        env.extend([
            format!("network_host_ip={}", self.host_ip()),
            format!("network_container_ip={}", self.container_ip),
            format!("network_cidr_suffix={}", self.subnet.prefix_len()),
            format!("container_iface_mtu={}", self.mtu),
            format!("subnet_shareable={}", self.subnet_shareable),
            format!("network_cidr={}", self.subnet),
            format!("external_ip={}", self.external_ip),
            // short enough for in-container interface naming
            format!("network_ip_hex={}", hex_ip(self.subnet.network())),
        ]);
    }

    /// The gateway address of the subnet, which the container uses as
    /// its default route.
    pub fn host_ip(&self) -> IpAddr {
        gateway_ip(self.subnet)
    }

    pub fn container_ip(&self) -> IpAddr {
        self.container_ip
    }

    pub fn external_ip(&self) -> IpAddr {
        self.external_ip
    }

    pub fn subnet(&self) -> IpNet {
        self.subnet
    }

    pub fn subnet_shareable(&self) -> bool {
        self.subnet_shareable
    }

    pub fn container_ifc_name(&self) -> &str {
        &self.container_ifc
    }

    pub fn host_ifc_name(&self) -> &str {
        &self.host_ifc
    }

    pub fn bridge_ifc_name(&self) -> &str {
        &self.bridge_ifc
    }
}

impl fmt::Debug for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("subnet", &self.subnet)
            .field("container_ip", &self.container_ip)
            .field("container_ifc", &self.container_ifc)
            .field("host_ifc", &self.host_ifc)
            .field("subnet_shareable", &self.subnet_shareable)
            .field("bridge_ifc", &self.bridge_ifc)
            .finish_non_exhaustive()
    }
}
