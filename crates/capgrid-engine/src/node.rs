//! The node allocator: a pod capacity claim against one node snapshot.
//!
//! Device claims are processed in order — the pod claim first, then each
//! container claim — and each winning pool result is committed into the
//! node before the next device claim runs, so later claims see the
//! reduced state. A failing device claim does not stop the walk; every
//! claim is attempted and reported, and the node result succeeds only if
//! all of them did.

use capgrid_core::capacity::Node;
use capgrid_core::claim::{CapacityClaim, PodCapacityClaim};
use capgrid_core::result::{CapacityClaimResult, DeviceClaimResult, NodeAllocationResult};
use tracing::debug;

use crate::pool::{allocate_pool, reduce_pool};

/// Evaluate the full pod claim against `node`, mutating the node's
/// capacities as each device claim commits.
pub fn allocate_pod_claim(node: &mut Node, claim: &PodCapacityClaim) -> NodeAllocationResult {
    let mut result = NodeAllocationResult {
        node_name: node.name.clone(),
        capacity_claim_results: Vec::with_capacity(1 + claim.container_claims.len()),
    };

    result
        .capacity_claim_results
        .push(allocate_capacity_claim(node, &claim.pod_claim));

    for container_claim in &claim.container_claims {
        result
            .capacity_claim_results
            .push(allocate_capacity_claim(node, container_claim));
    }

    result
}

fn allocate_capacity_claim(node: &mut Node, claim: &CapacityClaim) -> CapacityClaimResult {
    let mut claim_result = CapacityClaimResult {
        claim_name: claim.name.clone(),
        device_claim_results: Vec::with_capacity(claim.device_claims.len()),
    };

    for device_claim in &claim.device_claims {
        let mut dc_result = DeviceClaimResult {
            claim_name: device_claim.name.clone(),
            pool_results: Vec::with_capacity(node.pools.len()),
            best: None,
            failure_reason: None,
        };

        let mut best: Option<usize> = None;
        for pool in &node.pools {
            let pool_result = allocate_pool(pool, device_claim);
            dc_result.pool_results.push(pool_result);
            let idx = dc_result.pool_results.len() - 1;
            let candidate = &dc_result.pool_results[idx];
            let improves = match best {
                None => candidate.success(),
                Some(b) => {
                    candidate.success() && dc_result.pool_results[b].score() < candidate.score()
                }
            };
            if improves {
                best = Some(idx);
            }
        }

        dc_result.best = best;
        match best {
            None => {
                dc_result.failure_reason =
                    Some("no pool found that can satisfy the claim".to_string());
            }
            Some(idx) => {
                // Commit so the next device claim sees the reduced pool.
                if let Err(err) = reduce_pool(&mut node.pools[idx], &dc_result.pool_results[idx]) {
                    dc_result.best = None;
                    dc_result.failure_reason =
                        Some(format!("error trying to reduce pool capacity: {err}"));
                }
            }
        }

        debug!(
            node = %node.name,
            claim = %device_claim.name,
            best = ?dc_result.best,
            "device claim evaluated"
        );

        claim_result.device_claim_results.push(dc_result);
    }

    claim_result
}
