//! The allocation result tree, mirroring the claim structure, plus the
//! success predicates and score aggregation used to pick winners.
//!
//! Results are pure data: failures are carried as `failure_reason`
//! strings so a returned tree is a complete diagnostic even when nothing
//! could be placed. Non-leaf nodes reference their winning child by
//! index (`best`) rather than by ownership, keeping the tree
//! serialization-friendly.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::capacity::topology_key;
use crate::claim::CapacityRequest;

/// The outcome of one pod claim against one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAllocationResult {
    pub node_name: String,
    pub capacity_claim_results: Vec<CapacityClaimResult>,
}

/// The outcome of one capacity claim against a node's pools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityClaimResult {
    pub claim_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_claim_results: Vec<DeviceClaimResult>,
}

/// The outcome of one device claim: one `PoolResult` per pool tried,
/// with `best` pointing at the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceClaimResult {
    pub claim_name: String,
    pub pool_results: Vec<PoolResult>,
    pub best: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// The outcome of one device claim against one pool: one `DeviceResult`
/// per device, with `best` pointing at the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolResult {
    pub pool_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_results: Vec<DeviceResult>,
    pub best: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// The outcome of one device claim against one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResult {
    pub device_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capacity_results: Vec<CapacityResult>,

    /// 0 means the device could not satisfy the claim; 100 means it was
    /// satisfied optimally. Intermediate values are reserved for richer
    /// scoring (topology-split penalties, tight-fit preference).
    pub score: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// One accepted allocation: the amount actually granted (which may be
/// rounded or split relative to the original request) and the topology
/// instances it is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityResult {
    #[serde(flatten)]
    pub request: CapacityRequest,

    /// Exactly one assignment per topology type of the source capacity.
    /// A single logical request may produce several `CapacityResult`s on
    /// distinct topology instances when it was split.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topologies: Vec<TopologyAssignment>,
}

/// The specific topology instance a capacity is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyAssignment {
    #[serde(rename = "type")]
    pub ty: String,
    pub name: String,
}

impl CapacityResult {
    /// Canonical key matching [`crate::capacity::Capacity::key`], used to
    /// locate the source capacity when committing a reduction.
    pub fn key(&self) -> String {
        topology_key(
            &self.request.resource,
            self.topologies
                .iter()
                .map(|t| (t.ty.as_str(), t.name.as_str())),
        )
    }
}

impl DeviceResult {
    pub fn success(&self) -> bool {
        self.score > 0
    }
}

impl PoolResult {
    pub fn success(&self) -> bool {
        self.best.is_some()
    }

    /// The score of the winning device, or 0 on failure.
    pub fn score(&self) -> u8 {
        self.best.map_or(0, |i| self.device_results[i].score)
    }
}

impl DeviceClaimResult {
    pub fn success(&self) -> bool {
        self.best.is_some()
    }

    /// The score of the winning pool, or 0 on failure.
    pub fn score(&self) -> u8 {
        self.best.map_or(0, |i| self.pool_results[i].score())
    }
}

impl CapacityClaimResult {
    pub fn success(&self) -> bool {
        self.device_claim_results.iter().all(|r| r.success())
    }

    /// Arithmetic mean of the device claim scores, or 0 if any failed.
    pub fn score(&self) -> u8 {
        if !self.success() || self.device_claim_results.is_empty() {
            return 0;
        }
        let total: u32 = self
            .device_claim_results
            .iter()
            .map(|r| u32::from(r.score()))
            .sum();
        (total / self.device_claim_results.len() as u32) as u8
    }
}

impl NodeAllocationResult {
    pub fn success(&self) -> bool {
        self.capacity_claim_results.iter().all(|r| r.success())
    }

    /// Arithmetic mean of the capacity claim scores, or 0 on failure.
    pub fn score(&self) -> u8 {
        if !self.success() || self.capacity_claim_results.is_empty() {
            return 0;
        }
        let total: u32 = self
            .capacity_claim_results
            .iter()
            .map(|r| u32::from(r.score()))
            .sum();
        (total / self.capacity_claim_results.len() as u32) as u8
    }

    /// A human-readable, indented rendering of the whole result tree:
    /// claim → device claim → pool → device, with failure reasons and the
    /// `best` marker on winning children.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let verdict = if self.success() { "succeeded" } else { "failed" };
        let _ = writeln!(out, "node {:?} ({}): {}", self.node_name, self.score(), verdict);

        for ccr in &self.capacity_claim_results {
            let verdict = if ccr.success() { "succeeded" } else { "failed" };
            let _ = writeln!(
                out,
                "- capacity claim {:?} ({}): {}",
                ccr.claim_name,
                ccr.score(),
                verdict
            );

            for dcr in &ccr.device_claim_results {
                let verdict = if dcr.success() {
                    "succeeded"
                } else {
                    dcr.failure_reason.as_deref().unwrap_or("failed")
                };
                let _ = writeln!(
                    out,
                    "  - device claim {:?} ({}): {}",
                    dcr.claim_name,
                    dcr.score(),
                    verdict
                );

                for (pi, pr) in dcr.pool_results.iter().enumerate() {
                    let verdict = if dcr.best == Some(pi) {
                        "best"
                    } else if pr.success() {
                        "succeeded"
                    } else {
                        pr.failure_reason.as_deref().unwrap_or("failed")
                    };
                    let _ = writeln!(
                        out,
                        "    - pool {:?} ({}): {}",
                        pr.pool_name,
                        pr.score(),
                        verdict
                    );

                    for (di, dr) in pr.device_results.iter().enumerate() {
                        let verdict = if pr.best == Some(di) {
                            "best"
                        } else if dr.success() {
                            "succeeded"
                        } else {
                            dr.failure_reason.as_deref().unwrap_or("failed")
                        };
                        let _ = writeln!(
                            out,
                            "      - device {:?} ({}): {}",
                            dr.device_name, dr.score, verdict
                        );
                    }
                }
            }
        }

        out
    }
}
