//! The supply side: nodes publishing device pools, devices, and
//! topology-tagged capacities.

use serde::{Deserialize, Serialize};

use crate::attribute::Attribute;
use crate::quantity::Quantity;
use crate::result::TopologyAssignment;

/// A candidate node: a name plus the device pools it publishes.
///
/// The allocation engine takes ownership of a cloned `Node` snapshot for
/// the duration of one scheduling attempt and mutates capacities in place
/// as claims are committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    pub pools: Vec<DevicePool>,
}

/// A collection of devices managed by one driver on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePool {
    pub name: String,

    /// Free-form driver key, matched against a claim's driver filter.
    pub driver: String,

    /// Attributes inherited by every device in the pool.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<Device>,
}

/// A single allocatable entity exposing typed capacities and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub name: String,

    /// Device attributes shadow same-named pool attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capacities: Vec<Capacity>,
}

/// A named, typed, topology-tagged amount of a resource offered by a
/// device. The same capacity name may appear once per topology instance
/// (for example `cpu` on `numa-0` and `cpu` on `numa-1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capacity {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topologies: Vec<Topology>,

    #[serde(flatten)]
    pub kind: CapacityKind,
}

/// The numeric model of a capacity; exactly one variant on the wire
/// (`counter`, `quantity`, `block`, or `accessMode`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapacityKind {
    /// Integer capacity decremented by integers.
    Counter(CounterCapacity),
    /// Exact decimal capacity decremented by quantities.
    Quantity(QuantityCapacity),
    /// Decimal capacity allocated in integral multiples of a block size.
    Block(BlockCapacity),
    /// Shared/exclusive access arbitration with per-mode holder counts.
    AccessMode(AccessModeCapacity),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterCapacity {
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityCapacity {
    pub capacity: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCapacity {
    pub size: Quantity,
    pub capacity: Quantity,
}

/// Which access modes the capacity permits, plus reference counts for the
/// holders already admitted. A request for a disallowed mode is upgraded
/// to the next most exclusive allowed mode; `ReadWriteExclusive` is
/// always permitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccessModeCapacity {
    #[serde(default)]
    pub allow_read_only_shared: bool,
    #[serde(default)]
    pub allow_read_write_shared: bool,
    #[serde(default)]
    pub allow_write_exclusive: bool,

    #[serde(default)]
    pub counts: AccessModeCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccessModeCounts {
    #[serde(default)]
    pub read_only_shared: u32,
    #[serde(default)]
    pub read_write_shared: u32,
    #[serde(default)]
    pub write_exclusive: u32,
    #[serde(default)]
    pub read_write_exclusive: u32,
}

/// One placement dimension instance: `type` is the category (`numa`,
/// `pci`, `foo-net`), `name` the instance within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: String,

    /// Whether the capacity may be aggregated with sibling instances of
    /// the same topology type within one device.
    #[serde(default)]
    pub group_in_device: bool,
}

impl Capacity {
    /// One assignment per topology entry, in declaration order.
    pub fn topology_assignments(&self) -> Vec<TopologyAssignment> {
        self.topologies
            .iter()
            .map(|t| TopologyAssignment {
                ty: t.ty.clone(),
                name: t.name.clone(),
            })
            .collect()
    }

    /// Canonical key identifying this capacity by name and topology
    /// placement. Duplicate topology types collapse to the last instance.
    pub fn key(&self) -> String {
        let mut by_type = std::collections::BTreeMap::new();
        for t in &self.topologies {
            by_type.insert(t.ty.as_str(), t.name.as_str());
        }
        topology_key(&self.name, by_type.into_iter())
    }
}

/// Join a resource name and sorted `type=name` pairs with `;`. The same
/// derivation is used on both the supply side and the result side so a
/// committed allocation can find the exact capacity entry it came from.
pub fn topology_key<'a>(
    resource: &str,
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut parts: Vec<String> = pairs.map(|(ty, name)| format!("{ty}={name}")).collect();
    parts.sort();
    parts.insert(0, resource.to_string());
    parts.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topo(ty: &str, name: &str) -> Topology {
        Topology {
            name: name.to_string(),
            ty: ty.to_string(),
            group_in_device: true,
        }
    }

    #[test]
    fn key_sorts_topologies() {
        let cap = Capacity {
            name: "vfs".to_string(),
            topologies: vec![topo("pci", "pci-1"), topo("numa", "numa-0")],
            kind: CapacityKind::Counter(CounterCapacity { capacity: 16 }),
        };
        assert_eq!(cap.key(), "vfs;numa=numa-0;pci=pci-1");
    }

    #[test]
    fn key_without_topologies_is_the_name() {
        let cap = Capacity {
            name: "pods".to_string(),
            topologies: vec![],
            kind: CapacityKind::Counter(CounterCapacity { capacity: 100 }),
        };
        assert_eq!(cap.key(), "pods");
    }

    #[test]
    fn duplicate_topology_types_collapse() {
        let cap = Capacity {
            name: "cpu".to_string(),
            topologies: vec![topo("numa", "numa-0"), topo("numa", "numa-1")],
            kind: CapacityKind::Counter(CounterCapacity { capacity: 8 }),
        };
        assert_eq!(cap.key(), "cpu;numa=numa-1");
    }

    #[test]
    fn capacity_wire_format_uses_variant_selector() {
        let cap = Capacity {
            name: "memory".to_string(),
            topologies: vec![topo("numa", "numa-0")],
            kind: CapacityKind::Block(BlockCapacity {
                size: "1Mi".parse().unwrap(),
                capacity: "64Gi".parse().unwrap(),
            }),
        };
        let json = serde_json::to_value(&cap).unwrap();
        assert_eq!(json["name"], "memory");
        assert_eq!(json["block"]["size"], "1Mi");
        assert_eq!(json["block"]["capacity"], "64Gi");
        assert_eq!(json["topologies"][0]["type"], "numa");

        let back: Capacity = serde_json::from_value(json).unwrap();
        assert_eq!(back, cap);
    }

    #[test]
    fn access_mode_counts_default_to_zero() {
        let yaml = "name: scratch\naccessMode:\n  allowReadOnlyShared: true\n";
        let cap: Capacity = serde_yaml::from_str(yaml).unwrap();
        match cap.kind {
            CapacityKind::AccessMode(am) => {
                assert!(am.allow_read_only_shared);
                assert!(!am.allow_write_exclusive);
                assert_eq!(am.counts.read_write_exclusive, 0);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
