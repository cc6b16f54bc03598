//! CapGrid allocation engine — decides whether a node can host a
//! pod-shaped workload claim and produces the concrete assignment of
//! every requested resource to a (pool, device, capacity) tuple,
//! including topology placement.
//!
//! The engine is layered bottom-up, each level driving the one below:
//!
//! - **`capacity`** — one request against one capacity instance
//!   (counter / quantity / block / access-mode algebra), plus reduction
//! - **`device`** — a device claim against one device, splitting
//!   requests across topology-keyed capacity instances
//! - **`pool`** — constraint filtering, per-device allocation, best
//!   device selection
//! - **`node`** — the claim walk with cumulative commits, so later
//!   claims see earlier reductions
//! - **`scheduler`** — per-node snapshots and best-node selection
//!
//! Everything is synchronous and pure with respect to the caller's
//! inputs: `scheduler` clones each node before mutating it. Failures are
//! diagnostic values in the result tree; `Err` is reserved for
//! structural misuse (see [`error`]).

pub mod capacity;
pub mod device;
pub mod error;
pub mod node;
pub mod pool;
pub mod scheduler;

pub use capacity::{allocate_request, reduce, CapacityAllocation};
pub use device::{allocate_device, reduce_device};
pub use error::{CapacityError, CommitError, DeviceAllocError};
pub use node::allocate_pod_claim;
pub use pool::{allocate_pool, reduce_pool};
pub use scheduler::{evaluate_nodes, schedule_pod};
