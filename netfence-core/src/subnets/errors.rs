use std::net::IpAddr;

use ipnet::IpNet;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubnetsError {
    /// Returned by allocation when the dynamic range has no unallocated
    /// subnets left.
    #[error("insufficient subnets remaining in the dynamic range {0}!")]
    InsufficientSubnets(IpNet),

    /// Returned by allocation when the chosen subnet has no usable
    /// addresses left.
    #[error("insufficient IPs remaining in subnet {0}!")]
    InsufficientIps(IpNet),

    /// Returned by release when the subnet and address pair is not on
    /// record.
    #[error("address {1} in subnet {0} is not allocated!")]
    ReleasedUnallocatedSubnet(IpNet, IpAddr),

    /// Returned when a requested subnet overlaps an already allocated
    /// subnet.
    #[error("subnet {0} is already allocated!")]
    AlreadyAllocated(IpNet),

    /// Returned by recovery when the subnet and address pair is already
    /// on record.
    #[error("address {1} overlaps an existing allocation in subnet {0}!")]
    OverlapsExistingSubnet(IpNet, IpAddr),

    /// Returned when a statically requested subnet overlaps the dynamic
    /// allocation range, and by recovery when the recovered subnet
    /// contains the dynamic allocation range.
    #[error("subnet {0} cannot be allocated statically!")]
    NotAllowed(IpNet),

    /// Returned when a dynamic range cannot hold a single subnet.
    #[error("dynamic range {0} is too small to allocate from!")]
    InvalidRange(IpNet),

    /// Returned when a statically requested address lies outside its
    /// requested subnet.
    #[error("address {1} is not within subnet {0}!")]
    InvalidIp(IpNet, IpAddr),

    /// Returned when a statically requested address is already claimed.
    #[error("address {0} is already allocated!")]
    IpAlreadyAllocated(IpAddr),

    /// Returned by recovery when the persisted record carries no
    /// container address.
    #[error("a container address is required!")]
    IpCannotBeNil,

    #[error("address {0} must not equal the gateway address of its subnet!")]
    IpEqualsGateway(IpAddr),

    #[error("address {0} must not equal the broadcast address of its subnet!")]
    IpEqualsBroadcast(IpAddr),
}
