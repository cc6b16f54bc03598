//! The device allocator: a full device claim against one device.
//!
//! Capacities are grouped by name, one entry per topology instance, and
//! each request walks its group in declaration order. When one instance
//! cannot absorb the whole request the remainder spills onto the next
//! instance of the same name, so a single logical request may come back
//! as several `CapacityResult`s on distinct topologies. The walk runs on
//! scratch copies; nothing touches the real device until the node
//! allocator commits the winning result via [`reduce_device`].

use std::collections::HashMap;

use capgrid_core::capacity::{Capacity, Device};
use capgrid_core::claim::DeviceClaim;
use capgrid_core::result::CapacityResult;
use tracing::trace;

use crate::capacity::{allocate_request, reduce};
use crate::error::{CommitError, DeviceAllocError};

/// Try to satisfy every request in `claim` from `device`.
///
/// Returns the accumulated allocations on success. The error carries the
/// reason the device cannot host the claim; the pool allocator records
/// it as the device's `failure_reason`.
pub fn allocate_device(
    device: &Device,
    claim: &DeviceClaim,
) -> Result<Vec<CapacityResult>, DeviceAllocError> {
    // Scratch copies grouped by capacity name, preserving the order the
    // per-topology instances were declared in.
    let mut groups: HashMap<&str, Vec<Capacity>> = HashMap::new();
    for capacity in &device.capacities {
        groups
            .entry(capacity.name.as_str())
            .or_default()
            .push(capacity.clone());
    }

    let mut results = Vec::new();
    for request in &claim.requests {
        let group = groups.get_mut(request.resource.as_str()).ok_or_else(|| {
            DeviceAllocError::MissingCapacity {
                resource: request.resource.clone(),
                device: device.name.clone(),
            }
        })?;

        let capacity_error = |source| DeviceAllocError::Capacity {
            resource: request.resource.clone(),
            device: device.name.clone(),
            source,
        };

        let mut unsatisfied = request.clone();
        let mut satisfied = false;
        for entry in group.iter_mut() {
            let outcome = allocate_request(entry, &unsatisfied).map_err(capacity_error)?;
            if let Some(accepted) = outcome.allocated {
                *entry = reduce(entry, &accepted.request).map_err(capacity_error)?;
                trace!(
                    device = %device.name,
                    resource = %request.resource,
                    key = %accepted.key(),
                    "accepted partial allocation"
                );
                results.push(accepted);
            }
            match outcome.remainder {
                None => {
                    satisfied = true;
                    break;
                }
                Some(remainder) => unsatisfied = remainder,
            }
        }

        if !satisfied {
            return Err(DeviceAllocError::InsufficientCapacity {
                resource: request.resource.clone(),
                device: device.name.clone(),
            });
        }
    }

    Ok(results)
}

/// Commit accepted allocations into the device so subsequent claims see
/// the reduced capacities. Allocations are matched to capacity entries
/// by their canonical (name, topology) key.
pub fn reduce_device(
    device: &mut Device,
    allocations: &[CapacityResult],
) -> Result<(), CommitError> {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    for (i, capacity) in device.capacities.iter().enumerate() {
        by_key.insert(capacity.key(), i);
    }

    for allocation in allocations {
        let key = allocation.key();
        let idx = *by_key
            .get(&key)
            .ok_or(CommitError::UnknownCapacity { key })?;
        device.capacities[idx] = reduce(&device.capacities[idx], &allocation.request)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use capgrid_core::capacity::{BlockCapacity, CapacityKind, CounterCapacity, Topology};
    use capgrid_core::claim::{
        CapacityRequest, CounterRequest, QuantityRequest, RequestKind,
    };
    use capgrid_core::quantity::Quantity;

    fn q(s: &str) -> Quantity {
        s.parse().unwrap()
    }

    fn numa(n: usize) -> Topology {
        Topology {
            name: format!("numa-{n}"),
            ty: "numa".to_string(),
            group_in_device: true,
        }
    }

    fn counter(name: &str, capacity: i64) -> Capacity {
        Capacity {
            name: name.to_string(),
            topologies: vec![],
            kind: CapacityKind::Counter(CounterCapacity { capacity }),
        }
    }

    fn block_on_numa(name: &str, n: usize, size: &str, capacity: &str) -> Capacity {
        Capacity {
            name: name.to_string(),
            topologies: vec![numa(n)],
            kind: CapacityKind::Block(BlockCapacity {
                size: q(size),
                capacity: q(capacity),
            }),
        }
    }

    /// A shape-zero style primary device: pod and container slots plus
    /// cpu/memory split across two NUMA nodes.
    fn primary_device() -> Device {
        Device {
            name: "primary".to_string(),
            attributes: vec![],
            capacities: vec![
                counter("pods", 100),
                counter("containers", 1000),
                block_on_numa("cpu", 0, "10m", "8"),
                block_on_numa("memory", 0, "1Mi", "64Gi"),
                block_on_numa("cpu", 1, "10m", "8"),
                block_on_numa("memory", 1, "1Mi", "64Gi"),
            ],
        }
    }

    fn counter_req(resource: &str, request: i64) -> CapacityRequest {
        CapacityRequest {
            resource: resource.to_string(),
            kind: RequestKind::Counter(CounterRequest { request }),
        }
    }

    fn quantity_req(resource: &str, request: &str) -> CapacityRequest {
        CapacityRequest {
            resource: resource.to_string(),
            kind: RequestKind::Quantity(QuantityRequest { request: q(request) }),
        }
    }

    fn claim(requests: Vec<CapacityRequest>) -> DeviceClaim {
        DeviceClaim {
            name: "test".to_string(),
            driver: None,
            constraints: None,
            requests,
        }
    }

    fn quantity_of(result: &CapacityResult) -> Quantity {
        match &result.request.kind {
            RequestKind::Quantity(r) => r.request,
            other => panic!("not a quantity: {other:?}"),
        }
    }

    #[test]
    fn allocates_counters_without_topology() {
        let device = primary_device();
        let results =
            allocate_device(&device, &claim(vec![counter_req("pods", 1), counter_req("containers", 1)]))
                .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].request, counter_req("pods", 1));
        assert!(results[0].topologies.is_empty());
    }

    #[test]
    fn cpu_fitting_one_numa_is_not_split() {
        let device = primary_device();
        let results =
            allocate_device(&device, &claim(vec![quantity_req("cpu", "7127m")])).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(quantity_of(&results[0]).to_string(), "7130m");
        assert_eq!(results[0].topologies[0].name, "numa-0");
    }

    #[test]
    fn oversized_cpu_splits_across_numa_nodes() {
        let device = primary_device();
        let results = allocate_device(&device, &claim(vec![quantity_req("cpu", "12")])).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(quantity_of(&results[0]).to_string(), "8");
        assert_eq!(results[0].topologies[0].name, "numa-0");
        assert_eq!(quantity_of(&results[1]).to_string(), "4");
        assert_eq!(results[1].topologies[0].name, "numa-1");
    }

    #[test]
    fn split_requests_see_reduced_scratch_state() {
        // Two cpu requests in one claim: the second walk must observe
        // what the first one consumed.
        let device = primary_device();
        let results = allocate_device(
            &device,
            &claim(vec![quantity_req("cpu", "6"), quantity_req("cpu", "6")]),
        )
        .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(quantity_of(&results[0]).to_string(), "6"); // numa-0
        assert_eq!(quantity_of(&results[1]).to_string(), "2"); // numa-0 leftover
        assert_eq!(results[1].topologies[0].name, "numa-0");
        assert_eq!(quantity_of(&results[2]).to_string(), "4"); // numa-1
        assert_eq!(results[2].topologies[0].name, "numa-1");
    }

    #[test]
    fn unknown_resource_fails() {
        let device = primary_device();
        let err = allocate_device(&device, &claim(vec![counter_req("gpus", 1)])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no capacity \"gpus\" present in device \"primary\""
        );
    }

    #[test]
    fn exhausted_resource_fails_as_insufficient() {
        let device = primary_device();
        let err =
            allocate_device(&device, &claim(vec![quantity_req("memory", "256Gi")])).unwrap_err();
        assert_eq!(
            err,
            DeviceAllocError::InsufficientCapacity {
                resource: "memory".to_string(),
                device: "primary".to_string(),
            }
        );
        assert_eq!(
            err.to_string(),
            "insufficient capacity \"memory\" in device \"primary\""
        );
    }

    #[test]
    fn variant_mismatch_surfaces_as_capacity_error() {
        let device = primary_device();
        let err = allocate_device(&device, &claim(vec![counter_req("cpu", 1)])).unwrap_err();
        assert!(matches!(err, DeviceAllocError::Capacity { .. }));
    }

    #[test]
    fn scratch_walk_leaves_device_untouched() {
        let device = primary_device();
        let before = device.clone();
        allocate_device(&device, &claim(vec![quantity_req("cpu", "12")])).unwrap();
        assert_eq!(device, before);
    }

    #[test]
    fn reduce_device_applies_allocations_by_key() {
        let mut device = primary_device();
        let results = allocate_device(&device, &claim(vec![quantity_req("cpu", "12")])).unwrap();
        reduce_device(&mut device, &results).unwrap();

        // 8 taken from numa-0 (index 2), 4 from numa-1 (index 4).
        match &device.capacities[2].kind {
            CapacityKind::Block(b) => assert!(b.capacity.is_zero()),
            other => panic!("wrong kind: {other:?}"),
        }
        match &device.capacities[4].kind {
            CapacityKind::Block(b) => assert_eq!(b.capacity, q("4")),
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn conservation_across_allocate_and_reduce() {
        let mut device = primary_device();
        let results = allocate_device(
            &device,
            &claim(vec![quantity_req("cpu", "7127m"), quantity_req("memory", "8Gi")]),
        )
        .unwrap();
        reduce_device(&mut device, &results).unwrap();

        // remaining + allocated == original on each touched key
        match &device.capacities[2].kind {
            CapacityKind::Block(b) => {
                assert_eq!(b.capacity.to_string(), "870m"); // 8 - 7130m
            }
            other => panic!("wrong kind: {other:?}"),
        }
        match &device.capacities[3].kind {
            CapacityKind::Block(b) => assert_eq!(b.capacity, q("56Gi")),
            other => panic!("wrong kind: {other:?}"),
        }
    }

    #[test]
    fn reduce_device_rejects_unknown_keys() {
        let mut device = primary_device();
        let rogue = CapacityResult {
            request: counter_req("gpus", 1),
            topologies: vec![],
        };
        let err = reduce_device(&mut device, &[rogue]).unwrap_err();
        assert_eq!(
            err,
            CommitError::UnknownCapacity {
                key: "gpus".to_string()
            }
        );
    }

    #[test]
    fn reduce_device_rejects_mismatched_topology() {
        let mut device = primary_device();
        let rogue = CapacityResult {
            request: counter_req("pods", 1),
            topologies: vec![capgrid_core::result::TopologyAssignment {
                ty: "numa".to_string(),
                name: "numa-0".to_string(),
            }],
        };
        let err = reduce_device(&mut device, &[rogue]).unwrap_err();
        assert_eq!(
            err,
            CommitError::UnknownCapacity {
                key: "pods;numa=numa-0".to_string()
            }
        );
    }
}
