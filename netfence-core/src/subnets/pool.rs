use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};

use ipnet::IpNet;
use log::info;

use crate::ip::{broadcast_ip, gateway_ip, network_ip, overlaps};

use super::{IpSelector, SubnetSelector, SubnetsError};

/// Tracks which subnets are carved out of a dynamic allocation range and
/// which container addresses are claimed inside each of them.
///
/// The pool hands out subnet and address pairs through pluggable
/// selectors, takes them back one address at a time, and reabsorbs pairs
/// recorded by an earlier process. All bookkeeping happens under a single
/// lock, so concurrent callers never observe a half-applied allocation.
pub struct SubnetPool {
    dynamic_range: IpNet,
    allocated: Mutex<HashMap<IpNet, Vec<IpAddr>>>,
}

impl SubnetPool {
    /// Creates a pool that allocates dynamic subnets out of the given
    /// range. The range must span more than a single address.
    pub fn new(dynamic_range: IpNet) -> Result<Self, SubnetsError> {
        let dynamic_range = dynamic_range.trunc();

        if dynamic_range.prefix_len() >= dynamic_range.max_prefix_len() {
            return Err(SubnetsError::InvalidRange(dynamic_range));
        }

        Ok(Self {
            dynamic_range,
            allocated: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the range dynamic subnets are selected from.
    pub fn dynamic_range(&self) -> IpNet {
        self.dynamic_range
    }

    /// Reserves a subnet and a container address inside it. The returned
    /// flag is true when this is the first claim on the subnet, which is
    /// the signal to set up its bridge.
    ///
    /// The network, gateway and broadcast addresses of the subnet are
    /// listed among the existing addresses handed to the selector, so
    /// they are never claimed for a container.
    pub fn allocate(
        &self,
        subnet_selector: &dyn SubnetSelector,
        ip_selector: &dyn IpSelector,
    ) -> Result<(IpNet, IpAddr, bool), SubnetsError> {
        let mut allocated = self.lock();

        let existing: Vec<IpNet> = allocated.keys().copied().collect();
        let subnet = subnet_selector.select_subnet(self.dynamic_range, &existing)?;

        let mut taken: Vec<IpAddr> = allocated.get(&subnet).cloned().unwrap_or_default();
        let first = taken.is_empty();
        taken.extend([
            network_ip(subnet),
            gateway_ip(subnet),
            broadcast_ip(subnet),
        ]);

        let ip = ip_selector.select_ip(subnet, &taken)?;

        allocated.entry(subnet).or_default().push(ip);
        info!("Allocated address {ip} in subnet {subnet}!");

        Ok((subnet, ip, first))
    }

    /// Releases a container address claimed in a subnet. The returned
    /// flag is true when the subnet holds no further claims, which is
    /// the signal to tear down its bridge.
    pub fn release(&self, subnet: IpNet, ip: IpAddr) -> Result<bool, SubnetsError> {
        let subnet = subnet.trunc();
        let mut allocated = self.lock();

        let Some(claims) = allocated.get_mut(&subnet) else {
            return Err(SubnetsError::ReleasedUnallocatedSubnet(subnet, ip));
        };

        let Some(position) = claims.iter().position(|claimed| *claimed == ip) else {
            return Err(SubnetsError::ReleasedUnallocatedSubnet(subnet, ip));
        };

        claims.remove(position);
        info!("Released address {ip} in subnet {subnet}!");

        if allocated.get(&subnet).is_some_and(Vec::is_empty) {
            allocated.remove(&subnet);
            return Ok(true);
        }

        Ok(false)
    }

    /// Reabsorbs a subnet and container address pair persisted by an
    /// earlier process, without running the selectors again.
    ///
    /// Pairs inside the dynamic range are taken back on trust. A subnet
    /// outside the range is validated the way a static request would be,
    /// except that joining a subnet which already holds claims is
    /// permitted.
    pub fn recover(&self, subnet: IpNet, ip: Option<IpAddr>) -> Result<(), SubnetsError> {
        let Some(ip) = ip else {
            return Err(SubnetsError::IpCannotBeNil);
        };

        let subnet = subnet.trunc();
        let mut allocated = self.lock();

        if allocated
            .get(&subnet)
            .is_some_and(|claims| claims.contains(&ip))
        {
            return Err(SubnetsError::OverlapsExistingSubnet(subnet, ip));
        }

        if !self.dynamic_range.contains(&subnet) {
            if overlaps(subnet, self.dynamic_range) {
                return Err(SubnetsError::NotAllowed(subnet));
            }

            for taken in allocated.keys() {
                if *taken != subnet && overlaps(*taken, subnet) {
                    return Err(SubnetsError::AlreadyAllocated(subnet));
                }
            }
        }

        allocated.entry(subnet).or_default().push(ip);
        info!("Recovered address {ip} in subnet {subnet}!");

        Ok(())
    }

    /// Returns how many /30-sized subnets fit into the dynamic range.
    pub fn capacity(&self) -> u64 {
        let host_bits =
            u32::from(self.dynamic_range.max_prefix_len() - self.dynamic_range.prefix_len());

        1u64.checked_shl(host_bits).map_or(u64::MAX, |total| total / 4)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpNet, Vec<IpAddr>>> {
        self.allocated.lock().expect("subnet pool lock poisoned")
    }
}
