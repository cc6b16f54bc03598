//! CapGrid data model — the types shared by the allocation engine, the
//! constraint evaluator, the shape generators, and the CLI.
//!
//! The model has three sides:
//!
//! - **Supply** (`capacity`) — nodes publishing device pools, devices,
//!   and topology-tagged capacities in one of four numeric variants
//!   (counter, quantity, block, access mode).
//! - **Demand** (`claim`) — pod-shaped capacity claims decomposing into
//!   per-device resource requests.
//! - **Results** (`result`) — the allocation result tree mirroring the
//!   claim, carrying accepted amounts, topology assignments, scores, and
//!   failure reasons.
//!
//! `quantity` provides the exact-decimal arithmetic the variants are
//! built on; `attribute` the typed attribute values used by constraints.

pub mod attribute;
pub mod capacity;
pub mod claim;
pub mod quantity;
pub mod result;

pub use attribute::{merge_attributes, Attribute, AttributeValue};
pub use capacity::{
    topology_key, AccessModeCapacity, AccessModeCounts, BlockCapacity, Capacity, CapacityKind,
    CounterCapacity, Device, DevicePool, Node, QuantityCapacity, Topology,
};
pub use claim::{
    AccessMode, AccessModeRequest, CapacityClaim, CapacityRequest, CounterRequest, DeviceClaim,
    PodCapacityClaim, QuantityRequest, RequestKind,
};
pub use quantity::{Format, Quantity, QuantityError};
pub use result::{
    CapacityClaimResult, CapacityResult, DeviceClaimResult, DeviceResult, NodeAllocationResult,
    PoolResult, TopologyAssignment,
};
