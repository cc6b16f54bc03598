//! Node selection: run the node allocator over every candidate and keep
//! the best-scoring success.

use capgrid_core::capacity::Node;
use capgrid_core::claim::PodCapacityClaim;
use capgrid_core::result::NodeAllocationResult;
use tracing::{debug, info, warn};

use crate::node::allocate_pod_claim;

/// Evaluate `claim` against every candidate node and return all per-node
/// results plus the index of the best successful one.
///
/// Each node is evaluated on its own cloned snapshot, so the caller's
/// inputs are never mutated and the nodes do not observe each other's
/// reductions. Nodes are visited in input order; on a score tie the
/// first wins.
pub fn evaluate_nodes(
    nodes: &[Node],
    claim: &PodCapacityClaim,
) -> (Vec<NodeAllocationResult>, Option<usize>) {
    let mut results = Vec::with_capacity(nodes.len());
    let mut best: Option<usize> = None;

    for node in nodes {
        let mut snapshot = node.clone();
        let result = allocate_pod_claim(&mut snapshot, claim);
        debug!(
            node = %result.node_name,
            success = result.success(),
            score = result.score(),
            "node evaluated"
        );

        results.push(result);
        let idx = results.len() - 1;
        if results[idx].success() {
            let improves = match best {
                None => true,
                Some(b) => results[b].score() < results[idx].score(),
            };
            if improves {
                best = Some(idx);
            }
        }
    }

    (results, best)
}

/// Find the best node for the pod claim, or `None` when nothing fits.
pub fn schedule_pod(nodes: &[Node], claim: &PodCapacityClaim) -> Option<NodeAllocationResult> {
    let (mut results, best) = evaluate_nodes(nodes, claim);
    match best {
        Some(idx) => {
            let winner = results.swap_remove(idx);
            info!(node = %winner.node_name, score = winner.score(), "pod placed");
            Some(winner)
        }
        None => {
            warn!(
                claim = %claim.pod_claim.name,
                nodes = nodes.len(),
                "no node can satisfy the claim"
            );
            None
        }
    }
}
