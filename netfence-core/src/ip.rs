//! Address arithmetic on subnets and addresses. Pure functions, no state.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;

/// Returns the network address of a subnet, its lowest address.
pub fn network_ip(subnet: IpNet) -> IpAddr {
    subnet.network()
}

/// Returns the broadcast address of a subnet, its highest address.
pub fn broadcast_ip(subnet: IpNet) -> IpAddr {
    subnet.broadcast()
}

/// Returns the gateway address of a subnet, the address directly below
/// the broadcast address. Containers use it as their default route.
pub fn gateway_ip(subnet: IpNet) -> IpAddr {
    prev_ip(subnet.broadcast())
}

/// Returns the address directly after the given one.
///
/// Panics when the address space overflows. Pools are constructed within
/// representable ranges, so hitting the overflow is a programming fault.
pub fn next_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(ipv4) => match u32::from(ipv4).checked_add(1) {
            Some(raw) => IpAddr::V4(Ipv4Addr::from(raw)),
            None => panic!("overflowed the maximum IP address"),
        },
        IpAddr::V6(ipv6) => match u128::from(ipv6).checked_add(1) {
            Some(raw) => IpAddr::V6(Ipv6Addr::from(raw)),
            None => panic!("overflowed the maximum IP address"),
        },
    }
}

fn prev_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(ipv4) => match u32::from(ipv4).checked_sub(1) {
            Some(raw) => IpAddr::V4(Ipv4Addr::from(raw)),
            None => panic!("underflowed the minimum IP address"),
        },
        IpAddr::V6(ipv6) => match u128::from(ipv6).checked_sub(1) {
            Some(raw) => IpAddr::V6(Ipv6Addr::from(raw)),
            None => panic!("underflowed the minimum IP address"),
        },
    }
}

/// Returns true when the address lies inside the subnet.
pub fn contains(subnet: IpNet, ip: IpAddr) -> bool {
    subnet.contains(&ip)
}

/// Two subnets overlap when either network address lies inside the other
/// subnet. Subnets of different address families never overlap.
pub fn overlaps(a: IpNet, b: IpNet) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
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
    fn network_gateway_and_broadcast_of_a_slash_30() {
        let subnet = net("10.2.3.0/30");

        assert_eq!(network_ip(subnet), ip("10.2.3.0"));
        assert_eq!(gateway_ip(subnet), ip("10.2.3.2"));
        assert_eq!(broadcast_ip(subnet), ip("10.2.3.3"));
    }

    #[test]
    fn gateway_is_below_broadcast_in_a_wider_subnet() {
        let subnet = net("192.168.4.0/24");

        assert_eq!(gateway_ip(subnet), ip("192.168.4.254"));
        assert_eq!(broadcast_ip(subnet), ip("192.168.4.255"));
    }

    #[test]
    fn next_ip_increments_across_octet_boundaries() {
        assert_eq!(next_ip(ip("10.2.3.4")), ip("10.2.3.5"));
        assert_eq!(next_ip(ip("10.2.3.255")), ip("10.2.4.0"));
        assert_eq!(next_ip(ip("10.255.255.255")), ip("11.0.0.0"));
    }

    #[test]
    #[should_panic(expected = "overflowed the maximum IP address")]
    fn next_ip_panics_at_the_end_of_the_address_space() {
        next_ip(ip("255.255.255.255"));
    }

    #[test]
    fn contains_is_bounded_by_the_subnet() {
        let subnet = net("10.2.3.0/30");

        assert!(contains(subnet, ip("10.2.3.0")));
        assert!(contains(subnet, ip("10.2.3.3")));
        assert!(!contains(subnet, ip("10.2.3.4")));
        assert!(!contains(subnet, ip("10.2.2.255")));
    }

    #[test]
    fn subnets_overlap_when_either_contains_the_other() {
        assert!(overlaps(net("10.2.3.0/24"), net("10.2.3.4/30")));
        assert!(overlaps(net("10.2.3.4/30"), net("10.2.3.0/24")));
        assert!(overlaps(net("10.2.3.0/30"), net("10.2.3.0/30")));
        assert!(!overlaps(net("10.2.3.0/30"), net("10.2.3.4/30")));
        assert!(!overlaps(net("10.2.3.0/24"), net("10.2.4.0/24")));
    }

    #[test]
    fn subnets_of_different_families_never_overlap() {
        assert!(!overlaps(net("10.0.0.0/8"), net("::/0")));
    }
}
