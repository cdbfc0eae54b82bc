//! A subnet pool from which container networks are dynamically acquired
//! or statically reserved, one subnet and container address at a time.

mod errors;
mod pool;
mod selectors;

pub use errors::SubnetsError;
pub use pool::SubnetPool;
pub use selectors::{
    DynamicIpSelector, DynamicSubnetSelector, StaticIpSelector, StaticSubnetSelector,
};

use std::net::IpAddr;

use ipnet::IpNet;

/// A strategy for choosing a subnet.
///
/// Selection never mutates shared state; all bookkeeping happens inside
/// [`SubnetPool::allocate`].
pub trait SubnetSelector {
    /// Returns a subnet based on the pool's dynamic allocation range and
    /// the subnets that are already allocated. Returns an error if no
    /// suitable subnet can be found.
    fn select_subnet(&self, dynamic: IpNet, existing: &[IpNet]) -> Result<IpNet, SubnetsError>;
}

/// A strategy for choosing a container address inside a subnet.
pub trait IpSelector {
    /// Returns an address in the given subnet which is not one of the
    /// existing addresses. Returns an error if no such address can be
    /// found.
    fn select_ip(&self, subnet: IpNet, existing: &[IpAddr]) -> Result<IpAddr, SubnetsError>;
}
