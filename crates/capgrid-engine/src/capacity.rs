//! The capacity allocator: one request against one capacity.
//!
//! [`allocate_request`] decides how much of a single request one
//! capacity instance can absorb, returning the accepted part (tagged
//! with the capacity's topology assignments) and the remainder left for
//! sibling topology instances. [`reduce`] applies an accepted request
//! back onto a capacity, which is how both the device allocator's
//! scratch bookkeeping and the final commit update remaining amounts.

use capgrid_core::capacity::{Capacity, CapacityKind};
use capgrid_core::claim::{
    AccessMode, AccessModeRequest, CapacityRequest, CounterRequest, QuantityRequest, RequestKind,
};
use capgrid_core::result::CapacityResult;

use crate::error::CapacityError;

/// The outcome of allocating one request against one capacity: the part
/// that was accepted (if any) and the part still unsatisfied (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityAllocation {
    pub allocated: Option<CapacityResult>,
    pub remainder: Option<CapacityRequest>,
}

fn accepted(capacity: &Capacity, resource: &str, kind: RequestKind) -> CapacityResult {
    CapacityResult {
        request: CapacityRequest {
            resource: resource.to_string(),
            kind,
        },
        topologies: capacity.topology_assignments(),
    }
}

fn counter_request(request: i64) -> RequestKind {
    RequestKind::Counter(CounterRequest { request })
}

/// Allocate `request` from `capacity`.
///
/// A request matches a capacity iff both are counters, both are access
/// modes, or the request is a quantity and the capacity is a quantity or
/// a block; any other pairing is a structural error.
pub fn allocate_request(
    capacity: &Capacity,
    request: &CapacityRequest,
) -> Result<CapacityAllocation, CapacityError> {
    match (&capacity.kind, &request.kind) {
        (CapacityKind::Counter(c), RequestKind::Counter(r)) => {
            if r.request <= c.capacity {
                return Ok(CapacityAllocation {
                    allocated: Some(accepted(
                        capacity,
                        &request.resource,
                        counter_request(r.request),
                    )),
                    remainder: None,
                });
            }
            if c.capacity == 0 {
                return Ok(CapacityAllocation {
                    allocated: None,
                    remainder: Some(request.clone()),
                });
            }
            Ok(CapacityAllocation {
                allocated: Some(accepted(
                    capacity,
                    &request.resource,
                    counter_request(c.capacity),
                )),
                remainder: Some(CapacityRequest {
                    resource: request.resource.clone(),
                    kind: counter_request(r.request - c.capacity),
                }),
            })
        }

        (CapacityKind::Quantity(c), RequestKind::Quantity(r)) => {
            if r.request <= c.capacity {
                return Ok(CapacityAllocation {
                    allocated: Some(accepted(
                        capacity,
                        &request.resource,
                        RequestKind::Quantity(QuantityRequest { request: r.request }),
                    )),
                    remainder: None,
                });
            }
            if c.capacity.is_zero() {
                return Ok(CapacityAllocation {
                    allocated: None,
                    remainder: Some(request.clone()),
                });
            }
            let leftover = r.request.checked_sub(&c.capacity).map_err(|_| {
                CapacityError::Underflow {
                    capacity: capacity.name.clone(),
                }
            })?;
            Ok(CapacityAllocation {
                allocated: Some(accepted(
                    capacity,
                    &request.resource,
                    RequestKind::Quantity(QuantityRequest {
                        request: c.capacity,
                    }),
                )),
                remainder: Some(CapacityRequest {
                    resource: request.resource.clone(),
                    kind: RequestKind::Quantity(QuantityRequest { request: leftover }),
                }),
            })
        }

        (CapacityKind::Block(b), RequestKind::Quantity(r)) => {
            let bad_size = |_| CapacityError::InvalidBlockSize {
                capacity: capacity.name.clone(),
            };
            let real_request = r.request.round_up_to_block(&b.size).map_err(bad_size)?;
            let real_capacity = b.capacity.round_down_to_block(&b.size).map_err(bad_size)?;

            if real_request <= real_capacity {
                return Ok(CapacityAllocation {
                    allocated: Some(accepted(
                        capacity,
                        &request.resource,
                        RequestKind::Quantity(QuantityRequest {
                            request: real_request,
                        }),
                    )),
                    remainder: None,
                });
            }
            // Less than one whole block left: nothing to grant here, the
            // full original request carries over.
            if b.capacity < b.size {
                return Ok(CapacityAllocation {
                    allocated: None,
                    remainder: Some(request.clone()),
                });
            }
            let leftover = real_request.checked_sub(&real_capacity).map_err(|_| {
                CapacityError::Underflow {
                    capacity: capacity.name.clone(),
                }
            })?;
            Ok(CapacityAllocation {
                allocated: Some(accepted(
                    capacity,
                    &request.resource,
                    RequestKind::Quantity(QuantityRequest {
                        request: real_capacity,
                    }),
                )),
                remainder: Some(CapacityRequest {
                    resource: request.resource.clone(),
                    kind: RequestKind::Quantity(QuantityRequest { request: leftover }),
                }),
            })
        }

        (CapacityKind::AccessMode(c), RequestKind::AccessMode(r)) => {
            // Upgrade a disallowed mode to the next most exclusive
            // allowed one; ReadWriteExclusive is always permitted.
            let mut mode = r.request;
            if mode == AccessMode::ReadOnlyShared && !c.allow_read_only_shared {
                mode = AccessMode::ReadWriteShared;
            }
            if mode == AccessMode::ReadWriteShared && !c.allow_read_write_shared {
                mode = AccessMode::WriteExclusive;
            }
            if mode == AccessMode::WriteExclusive && !c.allow_write_exclusive {
                mode = AccessMode::ReadWriteExclusive;
            }

            let counts = &c.counts;
            let blockers = match mode {
                AccessMode::ReadWriteExclusive => {
                    counts.read_only_shared
                        + counts.read_write_shared
                        + counts.write_exclusive
                        + counts.read_write_exclusive
                }
                AccessMode::WriteExclusive => {
                    counts.read_write_shared
                        + counts.write_exclusive
                        + counts.read_write_exclusive
                }
                AccessMode::ReadWriteShared => {
                    counts.write_exclusive + counts.read_write_exclusive
                }
                AccessMode::ReadOnlyShared => counts.read_write_exclusive,
            };

            if blockers > 0 {
                return Ok(CapacityAllocation {
                    allocated: None,
                    remainder: Some(request.clone()),
                });
            }

            Ok(CapacityAllocation {
                allocated: Some(accepted(
                    capacity,
                    &request.resource,
                    RequestKind::AccessMode(AccessModeRequest { request: mode }),
                )),
                remainder: None,
            })
        }

        _ => Err(CapacityError::TypeMismatch {
            resource: request.resource.clone(),
        }),
    }
}

/// Apply an accepted request to a capacity, returning the reduced
/// capacity. The request must be one this engine returned: block
/// alignment is not re-validated, but a result that would go negative is
/// rejected as a structural error.
pub fn reduce(capacity: &Capacity, request: &CapacityRequest) -> Result<Capacity, CapacityError> {
    if request.resource != capacity.name {
        return Err(CapacityError::ResourceMismatch {
            capacity: capacity.name.clone(),
            resource: request.resource.clone(),
        });
    }

    let underflow = || CapacityError::Underflow {
        capacity: capacity.name.clone(),
    };

    let mut reduced = capacity.clone();
    match (&mut reduced.kind, &request.kind) {
        (CapacityKind::Counter(c), RequestKind::Counter(r)) => {
            if r.request > c.capacity {
                return Err(underflow());
            }
            c.capacity -= r.request;
        }
        (CapacityKind::Quantity(c), RequestKind::Quantity(r)) => {
            c.capacity = c.capacity.checked_sub(&r.request).map_err(|_| underflow())?;
        }
        (CapacityKind::Block(b), RequestKind::Quantity(r)) => {
            b.capacity = b.capacity.checked_sub(&r.request).map_err(|_| underflow())?;
        }
        (CapacityKind::AccessMode(c), RequestKind::AccessMode(r)) => {
            let counts = &mut c.counts;
            match r.request {
                AccessMode::ReadOnlyShared => counts.read_only_shared += 1,
                AccessMode::ReadWriteShared => counts.read_write_shared += 1,
                AccessMode::WriteExclusive => counts.write_exclusive += 1,
                AccessMode::ReadWriteExclusive => counts.read_write_exclusive += 1,
            }
        }
        _ => {
            return Err(CapacityError::TypeMismatch {
                resource: request.resource.clone(),
            });
        }
    }

    Ok(reduced)
}
