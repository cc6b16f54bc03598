//! The demand side: pod-shaped capacity claims and the per-resource
//! requests they decompose into.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// The full set of claims needed to place one pod: one pod-level claim
/// (pod and container slots, pod-attached devices) plus one claim per
/// container (CPU, memory, container-attached devices).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodCapacityClaim {
    pub pod_claim: CapacityClaim,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_claims: Vec<CapacityClaim>,
}

/// A named group of device claims, all of which must be satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityClaim {
    /// Identifies the claim in diagnostics for unschedulable pods.
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_claims: Vec<DeviceClaim>,
}

/// A request for capacity from a single device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceClaim {
    pub name: String,

    /// Limits the pools considered to those published by this driver.
    /// Absent or empty matches any pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Constraint expression over pool and device attributes; a device is
    /// only considered if it evaluates to true. Absent means no filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<CapacityRequest>,
}

/// A single resource request against a named capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityRequest {
    /// The capacity name this request draws from.
    pub resource: String,

    #[serde(flatten)]
    pub kind: RequestKind,
}

/// The request's numeric model; exactly one variant on the wire. There
/// is no block request: block capacities are drawn down via quantity
/// requests, with the engine doing the rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestKind {
    Counter(CounterRequest),
    Quantity(QuantityRequest),
    AccessMode(AccessModeRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterRequest {
    pub request: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityRequest {
    pub request: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessModeRequest {
    pub request: AccessMode,
}

/// Access modes, least to most exclusive. The ordering is load-bearing:
/// a disallowed mode is upgraded to the next greater allowed mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnlyShared,
    ReadWriteShared,
    WriteExclusive,
    ReadWriteExclusive,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessMode::ReadOnlyShared => "ReadOnlyShared",
            AccessMode::ReadWriteShared => "ReadWriteShared",
            AccessMode::WriteExclusive => "WriteExclusive",
            AccessMode::ReadWriteExclusive => "ReadWriteExclusive",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_modes_order_by_exclusivity() {
        assert!(AccessMode::ReadOnlyShared < AccessMode::ReadWriteShared);
        assert!(AccessMode::ReadWriteShared < AccessMode::WriteExclusive);
        assert!(AccessMode::WriteExclusive < AccessMode::ReadWriteExclusive);
    }

    #[test]
    fn request_wire_format() {
        let req = CapacityRequest {
            resource: "cpu".to_string(),
            kind: RequestKind::Quantity(QuantityRequest {
                request: "7127m".parse().unwrap(),
            }),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["resource"], "cpu");
        assert_eq!(json["quantity"]["request"], "7127m");
    }

    #[test]
    fn access_mode_request_round_trips() {
        let req: CapacityRequest = serde_yaml::from_str(
            "resource: scratch\naccessMode:\n  request: ReadOnlyShared\n",
        )
        .unwrap();
        assert_eq!(
            req.kind,
            RequestKind::AccessMode(AccessModeRequest {
                request: AccessMode::ReadOnlyShared
            })
        );
        let yaml = serde_yaml::to_string(&req).unwrap();
        assert!(yaml.contains("ReadOnlyShared"));
    }

    #[test]
    fn claim_document_parses() {
        let yaml = r#"
podClaim:
  name: my-pod
  deviceClaims:
    - name: pod
      requests:
        - resource: pods
          counter:
            request: 1
containerClaims:
  - name: my-container
    deviceClaims:
      - name: cpu-mem
        driver: kubelet
        requests:
          - resource: cpu
            quantity:
              request: 7127m
"#;
        let claim: PodCapacityClaim = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(claim.pod_claim.name, "my-pod");
        assert_eq!(claim.container_claims.len(), 1);
        let dc = &claim.container_claims[0].device_claims[0];
        assert_eq!(dc.driver.as_deref(), Some("kubelet"));
        assert_eq!(dc.requests[0].resource, "cpu");
    }
}
