use std::net::IpAddr;

use ipnet::IpNet;

use crate::ip::{broadcast_ip, gateway_ip, next_ip, overlaps};

use super::{IpSelector, SubnetSelector, SubnetsError};

/// Chooses the first unallocated /30-sized block of the dynamic range.
/// When the dynamic range is itself /30-sized, the range is the only
/// candidate block.
pub struct DynamicSubnetSelector;

impl SubnetSelector for DynamicSubnetSelector {
    fn select_subnet(&self, dynamic: IpNet, existing: &[IpNet]) -> Result<IpNet, SubnetsError> {
        let block_prefix = dynamic.max_prefix_len() - 2;

        let mut ip = dynamic.network();
        loop {
            let block = IpNet::new(ip, block_prefix)
                .expect("a shortened prefix length is always valid")
                .trunc();

            if !dynamic.contains(&block.broadcast()) {
                break;
            }

            if !existing.iter().any(|taken| overlaps(*taken, block)) {
                return Ok(block);
            }

            if block.broadcast() == dynamic.broadcast() {
                break;
            }

            ip = next_ip(block.broadcast());
        }

        Err(SubnetsError::InsufficientSubnets(dynamic))
    }
}

/// Wraps a subnet requested explicitly by the caller. Requesting a
/// subnet that is already allocated joins it; only a partial overlap
/// with a different subnet is a conflict.
pub struct StaticSubnetSelector(pub IpNet);

impl SubnetSelector for StaticSubnetSelector {
    fn select_subnet(&self, dynamic: IpNet, existing: &[IpNet]) -> Result<IpNet, SubnetsError> {
        let requested = self.0.trunc();

        if overlaps(requested, dynamic) {
            return Err(SubnetsError::NotAllowed(requested));
        }

        for taken in existing {
            if *taken != requested && overlaps(requested, *taken) {
                return Err(SubnetsError::AlreadyAllocated(requested));
            }
        }

        Ok(requested)
    }
}

/// Chooses the lowest address of the subnet that is not already taken.
/// The pool lists the network, gateway and broadcast addresses among the
/// existing ones, so they are never handed out.
pub struct DynamicIpSelector;

impl IpSelector for DynamicIpSelector {
    fn select_ip(&self, subnet: IpNet, existing: &[IpAddr]) -> Result<IpAddr, SubnetsError> {
        let mut ip = subnet.network();
        loop {
            if !existing.contains(&ip) {
                return Ok(ip);
            }

            if ip == subnet.broadcast() {
                break;
            }

            ip = next_ip(ip);
        }

        Err(SubnetsError::InsufficientIps(subnet))
    }
}

/// Wraps an address requested explicitly by the caller.
pub struct StaticIpSelector(pub IpAddr);

impl IpSelector for StaticIpSelector {
    fn select_ip(&self, subnet: IpNet, existing: &[IpAddr]) -> Result<IpAddr, SubnetsError> {
        let ip = self.0;

        if !subnet.contains(&ip) {
            return Err(SubnetsError::InvalidIp(subnet, ip));
        }

        if ip == gateway_ip(subnet) {
            return Err(SubnetsError::IpEqualsGateway(ip));
        }

        if ip == broadcast_ip(subnet) {
            return Err(SubnetsError::IpEqualsBroadcast(ip));
        }

        if existing.contains(&ip) {
            return Err(SubnetsError::IpAlreadyAllocated(ip));
        }

        Ok(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn net(raw: &str) -> IpNet {
        raw.parse().unwrap()
    }

    fn ip(raw: &str) -> IpAddr {
        raw.parse().unwrap()
    }

    #[test]
    fn dynamic_subnet_selection_walks_slash_30_blocks_in_order() {
        let dynamic = net("10.2.3.0/29");

        let first = DynamicSubnetSelector
            .select_subnet(dynamic, &[])
            .unwrap();
        assert_eq!(first, net("10.2.3.0/30"));

        let second = DynamicSubnetSelector
            .select_subnet(dynamic, &[first])
            .unwrap();
        assert_eq!(second, net("10.2.3.4/30"));
    }

    #[test]
    fn dynamic_subnet_selection_returns_the_whole_range_when_it_is_a_slash_30() {
        let dynamic = net("10.2.3.0/30");

        let selected = DynamicSubnetSelector
            .select_subnet(dynamic, &[])
            .unwrap();

        assert_eq!(selected, dynamic);
    }

    #[test]
    fn dynamic_subnet_selection_fails_when_the_range_is_exhausted() {
        let dynamic = net("10.2.3.0/30");

        let result = DynamicSubnetSelector.select_subnet(dynamic, &[dynamic]);

        assert_eq!(result, Err(SubnetsError::InsufficientSubnets(dynamic)));
    }

    #[test]
    fn dynamic_subnet_selection_fails_when_the_range_is_narrower_than_a_slash_30() {
        let dynamic = net("10.2.3.0/31");

        let result = DynamicSubnetSelector.select_subnet(dynamic, &[]);

        assert_eq!(result, Err(SubnetsError::InsufficientSubnets(dynamic)));
    }

    #[test]
    fn dynamic_subnet_selection_skips_blocks_inside_a_wider_allocation() {
        let dynamic = net("10.2.3.0/28");
        let wide = net("10.2.3.0/29");

        let selected = DynamicSubnetSelector
            .select_subnet(dynamic, &[wide])
            .unwrap();

        assert_eq!(selected, net("10.2.3.8/30"));
    }

    #[test]
    fn static_subnet_selection_refuses_the_dynamic_range() {
        let dynamic = net("10.2.3.0/24");
        let requested = net("10.2.3.8/30");

        let result = StaticSubnetSelector(requested).select_subnet(dynamic, &[]);

        assert_eq!(result, Err(SubnetsError::NotAllowed(requested)));
    }

    #[test]
    fn static_subnet_selection_refuses_an_overlapping_allocation() {
        let dynamic = net("10.2.3.0/24");
        let taken = net("10.9.9.0/29");

        let result =
            StaticSubnetSelector(net("10.9.9.4/30")).select_subnet(dynamic, &[taken]);

        assert_eq!(
            result,
            Err(SubnetsError::AlreadyAllocated(net("10.9.9.4/30")))
        );
    }

    #[test]
    fn static_subnet_selection_joins_an_identical_allocation() {
        let dynamic = net("10.2.3.0/24");
        let taken = net("10.9.9.0/29");

        let selected = StaticSubnetSelector(taken).select_subnet(dynamic, &[taken]).unwrap();

        assert_eq!(selected, taken);
    }

    #[test]
    fn static_subnet_selection_masks_host_bits_off_the_request() {
        let dynamic = net("10.2.3.0/24");

        let selected = StaticSubnetSelector(net("10.9.9.5/30"))
            .select_subnet(dynamic, &[])
            .unwrap();

        assert_eq!(selected, net("10.9.9.4/30"));
    }

    #[test]
    fn dynamic_ip_selection_returns_the_lowest_free_address() {
        let subnet = net("10.2.3.0/30");
        let reserved = [ip("10.2.3.0"), ip("10.2.3.2"), ip("10.2.3.3")];

        let selected = DynamicIpSelector.select_ip(subnet, &reserved).unwrap();

        assert_eq!(selected, ip("10.2.3.1"));
    }

    #[test]
    fn dynamic_ip_selection_fails_once_every_address_is_taken() {
        let subnet = net("10.2.3.0/30");
        let reserved = [
            ip("10.2.3.0"),
            ip("10.2.3.1"),
            ip("10.2.3.2"),
            ip("10.2.3.3"),
        ];

        let result = DynamicIpSelector.select_ip(subnet, &reserved);

        assert_eq!(result, Err(SubnetsError::InsufficientIps(subnet)));
    }

    #[test]
    fn static_ip_selection_refuses_an_address_outside_the_subnet() {
        let subnet = net("10.2.3.0/30");

        let result = StaticIpSelector(ip("10.2.3.5")).select_ip(subnet, &[]);

        assert_eq!(result, Err(SubnetsError::InvalidIp(subnet, ip("10.2.3.5"))));
    }

    #[test]
    fn static_ip_selection_refuses_the_reserved_addresses() {
        let subnet = net("10.2.3.0/24");

        assert_eq!(
            StaticIpSelector(ip("10.2.3.254")).select_ip(subnet, &[]),
            Err(SubnetsError::IpEqualsGateway(ip("10.2.3.254")))
        );
        assert_eq!(
            StaticIpSelector(ip("10.2.3.255")).select_ip(subnet, &[]),
            Err(SubnetsError::IpEqualsBroadcast(ip("10.2.3.255")))
        );
    }

    #[test]
    fn static_ip_selection_refuses_a_taken_address() {
        let subnet = net("10.2.3.0/24");
        let reserved = [ip("10.2.3.1")];

        let result = StaticIpSelector(ip("10.2.3.1")).select_ip(subnet, &reserved);

        assert_eq!(result, Err(SubnetsError::IpAlreadyAllocated(ip("10.2.3.1"))));
    }

    #[test]
    fn static_ip_selection_accepts_a_free_address() {
        let subnet = net("10.2.3.0/24");
        let reserved = [ip("10.2.3.0"), ip("10.2.3.254"), ip("10.2.3.255")];

        let selected = StaticIpSelector(ip("10.2.3.7"))
            .select_ip(subnet, &reserved)
            .unwrap();

        assert_eq!(selected, ip("10.2.3.7"));
    }
}
