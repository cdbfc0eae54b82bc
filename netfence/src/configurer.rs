//! The boundary to the host's network stack. The fence decides what to
//! configure; an implementation of [`NetworkConfigurer`] carries it out.

use std::io;
use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurerError {
    #[error("failed to create bridge '{name}' with IP {ip} in subnet {subnet}: {source}")]
    BridgeCreation {
        name: String,
        ip: IpAddr,
        subnet: IpNet,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove host interface '{interface}': {source}")]
    HostTeardown {
        interface: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to remove bridge '{name}': {source}")]
    BridgeTeardown {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Applies fence decisions to the host's network stack.
pub trait NetworkConfigurer: Send + Sync {
    /// Ensures the bridge for a subnet exists and carries the gateway
    /// address. Called once per fence build; an already configured
    /// subnet must not be an error.
    fn configure_subnet(
        &self,
        bridge_name: &str,
        external_ip: IpAddr,
        bridge_ip: IpAddr,
        subnet: IpNet,
    ) -> Result<(), ConfigurerError>;

    /// Removes a container's host-side interface, and the subnet's
    /// bridge when one is named.
    fn deconfigure_host(
        &self,
        host_ifc: &str,
        bridge_ifc: Option<&str>,
    ) -> Result<(), ConfigurerError>;
}
