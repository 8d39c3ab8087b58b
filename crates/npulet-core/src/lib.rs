//! npulet-core: Device model and topology types for npulet
//!
//! This crate provides the fundamental types used throughout the npulet
//! system:
//! - Device handles and the closed set of allocatable device shapes
//! - Deduplicated device sets and their algebra
//! - Core-range partitions
//! - Link classification and the topology oracle trait
//! - Node configuration and declarative snapshots
//! - Error handling

pub mod config;
pub mod device;
pub mod device_set;
pub mod error;
pub mod partition;
pub mod snapshot;
pub mod topology;

pub use config::*;
pub use device::*;
pub use device_set::*;
pub use error::*;
pub use partition::*;
pub use snapshot::*;
pub use topology::*;
