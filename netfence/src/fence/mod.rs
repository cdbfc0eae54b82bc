//! Builds and rebuilds per-container network fences on top of the
//! subnet pool.
//!
//! A fence build parses the caller's network spec into a pair of
//! selection strategies, claims a subnet and container address from the
//! pool, derives the interface and bridge names for the container, and
//! asks the configurer to set up the subnet's bridge. The resulting
//! [`Allocation`] is the container's handle on everything that has to be
//! undone at destruction, and its [`FlatFence`] projection is what
//! survives a daemon restart.

mod allocation;
mod record;

pub use allocation::Allocation;
pub use record::FlatFence;

use std::net::IpAddr;
use std::sync::Arc;

use data_encoding::HEXLOWER;
use ipnet::IpNet;
use log::info;
use thiserror::Error;

use netfence_core::ip::gateway_ip;
use netfence_core::subnets::{
    DynamicIpSelector, DynamicSubnetSelector, IpSelector, StaticIpSelector, StaticSubnetSelector,
    SubnetPool, SubnetSelector, SubnetsError,
};

use crate::configurer::{ConfigurerError, NetworkConfigurer};

#[derive(Debug, Error)]
pub enum FenceError {
    /// Returned when a network spec string does not parse as an address
    /// or CIDR.
    #[error("malformed network spec '{spec}': {source}")]
    MalformedSpec {
        spec: String,
        #[source]
        source: ipnet::AddrParseError,
    },

    /// Returned when a persisted record cannot be decoded or encoded.
    #[error("malformed allocation record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    /// Returned when a persisted record carries an unparseable subnet.
    #[error("malformed subnet '{ipn}' in allocation record: {source}")]
    MalformedRecordSubnet {
        ipn: String,
        #[source]
        source: ipnet::AddrParseError,
    },

    #[error(transparent)]
    Subnets(#[from] SubnetsError),

    #[error(transparent)]
    Configurer(#[from] ConfigurerError),
}

/// Settings a fence applies to every container it builds.
pub struct FenceConfig {
    /// Prepended to every interface and bridge name.
    pub interface_prefix: String,
    /// MTU handed to container processes.
    pub mtu: u32,
    /// Address of the host's externally routable interface.
    pub external_ip: IpAddr,
}

/// Builds per-container allocations out of a shared subnet pool and a
/// host network configurer.
pub struct Fence {
    subnets: Arc<SubnetPool>,
    configurer: Arc<dyn NetworkConfigurer>,
    config: FenceConfig,
}

impl Fence {
    pub fn new(
        subnets: Arc<SubnetPool>,
        configurer: Arc<dyn NetworkConfigurer>,
        config: FenceConfig,
    ) -> Self {
        Self {
            subnets,
            configurer,
            config,
        }
    }

    /// Claims a subnet and container address according to the network
    /// spec and fences the container into them.
    ///
    /// An empty spec draws both dynamically. A CIDR whose address equals
    /// its network address claims that subnet with a dynamic container
    /// address; non-zero host bits claim that exact address too. A bare
    /// address is treated as a /30 around it.
    pub fn build(&self, spec: &str, container_id: &str) -> Result<Allocation, FenceError> {
        let mut subnet_selector: Box<dyn SubnetSelector> = Box::new(DynamicSubnetSelector);
        let mut ip_selector: Box<dyn IpSelector> = Box::new(DynamicIpSelector);

        if !spec.is_empty() {
            let requested: IpNet =
                suffix_if_needed(spec)
                    .parse()
                    .map_err(|source| FenceError::MalformedSpec {
                        spec: spec.to_string(),
                        source,
                    })?;

            subnet_selector = Box::new(StaticSubnetSelector(requested));

            if requested.addr() != requested.network() {
                ip_selector = Box::new(StaticIpSelector(requested.addr()));
            }
        }

        let (subnet, container_ip, _) = self
            .subnets
            .allocate(subnet_selector.as_ref(), ip_selector.as_ref())?;

        let prefix = &self.config.interface_prefix;
        let base = interface_base(prefix, container_id);

        let host_ifc = format!("{prefix}{base}-0");
        let container_ifc = format!("{prefix}{base}-1");
        let bridge_ifc = format!("{prefix}br-{}", hex_ip(subnet.network()));

        let subnet_shareable = subnet.prefix_len() < subnet.max_prefix_len() - 2;

        self.configurer.configure_subnet(
            &bridge_ifc,
            self.config.external_ip,
            gateway_ip(subnet),
            subnet,
        )?;

        info!("Fenced container {container_id} into subnet {subnet} at {container_ip}!");

        Ok(Allocation {
            subnet,
            container_ip,
            container_ifc,
            host_ifc,
            subnet_shareable,
            bridge_ifc,
            mtu: self.config.mtu,
            external_ip: self.config.external_ip,
            subnets: Arc::clone(&self.subnets),
            configurer: Arc::clone(&self.configurer),
        })
    }

    /// Replays a serialized record produced by [`Allocation::marshal`],
    /// re-claiming its subnet and container address in the pool.
    /// Conflicts with the pool's current state are reported, never
    /// repaired.
    pub fn rebuild(&self, raw: &str) -> Result<Allocation, FenceError> {
        let record: FlatFence = serde_json::from_str(raw)?;

        let subnet: IpNet =
            record
                .ipn
                .parse()
                .map_err(|source| FenceError::MalformedRecordSubnet {
                    ipn: record.ipn.clone(),
                    source,
                })?;
        let subnet = subnet.trunc();

        let container_ip = record.container_ip.parse::<IpAddr>().ok();
        self.subnets.recover(subnet, container_ip)?;

        let Some(container_ip) = container_ip else {
            return Err(SubnetsError::IpCannotBeNil.into());
        };

        info!("Rebuilt fence for subnet {subnet} at {container_ip}!");

        Ok(Allocation {
            subnet,
            container_ip,
            container_ifc: record.container_ifc_name,
            host_ifc: record.host_ifc_name,
            subnet_shareable: record.subnet_shareable,
            bridge_ifc: record.bridge_ifc_name,
            mtu: self.config.mtu,
            external_ip: self.config.external_ip,
            subnets: Arc::clone(&self.subnets),
            configurer: Arc::clone(&self.configurer),
        })
    }

    /// Returns how many dynamic subnets the pool can hand out in total.
    pub fn capacity(&self) -> u64 {
        self.subnets.capacity()
    }
}

fn suffix_if_needed(spec: &str) -> String {
    if spec.contains('/') {
        spec.to_string()
    } else {
        format!("{spec}/30")
    }
}

fn interface_base<'a>(prefix: &str, container_id: &'a str) -> &'a str {
    // 15-character kernel limit on interface names, minus the "-0"
    // suffix and the prefix
    let max_id_len = 14usize.saturating_sub(prefix.len());

    if container_id.len() < max_id_len {
        container_id
    } else {
        &container_id[container_id.len() - max_id_len..]
    }
}

fn hex_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(ipv4) => HEXLOWER.encode(&ipv4.octets()),
        IpAddr::V6(ipv6) => HEXLOWER.encode(&ipv6.octets()),
    }
}
