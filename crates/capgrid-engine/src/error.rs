//! Engine error types.
//!
//! Only structural misuse is a Rust error: a request variant that cannot
//! draw from a capacity variant, or a commit applied to the wrong pool.
//! Ordinary allocation failures (not enough capacity, constraints not
//! met) travel as `failure_reason` strings in the result tree instead.

use thiserror::Error;

/// Errors from allocating against or reducing a single capacity.
#[derive(Debug, Error, PartialEq)]
pub enum CapacityError {
    #[error("request/capacity type mismatch for {resource:?}")]
    TypeMismatch { resource: String },

    #[error("cannot reduce capacity {capacity:?} using request for {resource:?}")]
    ResourceMismatch { capacity: String, resource: String },

    #[error("reducing capacity {capacity:?} would leave it negative")]
    Underflow { capacity: String },

    #[error("capacity {capacity:?} has an invalid block size")]
    InvalidBlockSize { capacity: String },
}

/// Why a device could not satisfy a claim. Rendered into the device's
/// `failure_reason` by the pool allocator.
#[derive(Debug, Error, PartialEq)]
pub enum DeviceAllocError {
    #[error("no capacity {resource:?} present in device {device:?}")]
    MissingCapacity { resource: String, device: String },

    #[error("insufficient capacity {resource:?} in device {device:?}")]
    InsufficientCapacity { resource: String, device: String },

    #[error("error evaluating capacity {resource:?} in device {device:?}: {source}")]
    Capacity {
        resource: String,
        device: String,
        source: CapacityError,
    },
}

/// Errors from committing an accepted pool result back into the node
/// snapshot.
#[derive(Debug, Error, PartialEq)]
pub enum CommitError {
    #[error("cannot reduce pool {pool:?} capacity using allocation from pool {result_pool:?}")]
    PoolMismatch { pool: String, result_pool: String },

    #[error("cannot reduce pool {pool:?} capacity from an unsatisfied result")]
    Unsatisfied { pool: String },

    #[error("pool {pool:?} devices and device result list differ in length")]
    DeviceCountMismatch { pool: String },

    #[error("allocated capacity {key:?} not found in device capacities")]
    UnknownCapacity { key: String },

    #[error(transparent)]
    Capacity(#[from] CapacityError),
}
