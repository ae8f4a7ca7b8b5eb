//! Local network helpers.

pub mod ports;

pub use ports::{LEASE_ROTATION, PortAllocator, PortRequest, local_hosts};
