//! Per-container network fencing on top of the subnet allocation pool:
//! spec parsing, interface and bridge naming, durable records and the
//! host configuration boundary.

pub mod configurer;
pub mod fence;

/// Dynamic allocation range used when the operator does not configure
/// one.
pub const DEFAULT_NETWORK_POOL: &str = "10.254.0.0/22";

/// MTU applied to container interfaces unless configured otherwise.
pub const DEFAULT_MTU: u32 = 1500;
