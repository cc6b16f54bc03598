//! Node shape generators.

use capgrid_core::attribute::{Attribute, AttributeValue};
use capgrid_core::capacity::{
    BlockCapacity, Capacity, CapacityKind, CounterCapacity, Device, DevicePool, Node,
    QuantityCapacity, Topology,
};
use capgrid_core::quantity::Quantity;

fn q(s: &str) -> Quantity {
    s.parse().expect("static quantity literal")
}

fn string_attr(name: &str, value: &str) -> Attribute {
    Attribute {
        name: name.to_string(),
        value: AttributeValue::StringValue(value.to_string()),
    }
}

fn semver_attr(name: &str, value: &str) -> Attribute {
    Attribute {
        name: name.to_string(),
        value: AttributeValue::SemVerValue(value.parse().expect("static version literal")),
    }
}

fn quantity_attr(name: &str, value: &str) -> Attribute {
    Attribute {
        name: name.to_string(),
        value: AttributeValue::QuantityValue(q(value)),
    }
}

fn topology(ty: &str, name: String) -> Topology {
    Topology {
        name,
        ty: ty.to_string(),
        group_in_device: true,
    }
}

fn numa_capacities(num: usize, cpu: &str, mem: &str) -> Vec<Capacity> {
    vec![
        Capacity {
            name: "cpu".to_string(),
            topologies: vec![topology("numa", format!("numa-{num}"))],
            kind: CapacityKind::Block(BlockCapacity {
                size: q("10m"),
                capacity: q(cpu),
            }),
        },
        Capacity {
            name: "memory".to_string(),
            topologies: vec![topology("numa", format!("numa-{num}"))],
            kind: CapacityKind::Block(BlockCapacity {
                size: q("1Mi"),
                capacity: q(mem),
            }),
        },
    ]
}

/// The `kubelet`-driven pool every node carries: pod and container
/// slots, plus cpu/memory blocks per NUMA node.
fn primary_pool(os: &str, kernel: &str, hardware: &str, numa: &[(&str, &str)]) -> DevicePool {
    let mut capacities = vec![
        Capacity {
            name: "pods".to_string(),
            topologies: vec![],
            kind: CapacityKind::Counter(CounterCapacity { capacity: 100 }),
        },
        Capacity {
            name: "containers".to_string(),
            topologies: vec![],
            kind: CapacityKind::Counter(CounterCapacity { capacity: 1000 }),
        },
    ];
    for (i, (cpu, mem)) in numa.iter().enumerate() {
        capacities.extend(numa_capacities(i, cpu, mem));
    }

    DevicePool {
        name: "primary".to_string(),
        driver: "kubelet".to_string(),
        attributes: vec![
            string_attr("os", os),
            semver_attr("kernel-release", kernel),
            string_attr("hardware-platform", hardware),
        ],
        devices: vec![Device {
            name: "primary".to_string(),
            attributes: vec![],
            capacities,
        }],
    }
}

fn default_primary_pool(numa: &[(&str, &str)]) -> DevicePool {
    primary_pool("linux", "5.15.0-1046", "x86_64", numa)
}

#[allow(clippy::too_many_arguments)]
fn foozer_devices(
    start: usize,
    count: usize,
    model: &str,
    firmware: &str,
    net_speed: &str,
    net: &str,
    memory: &str,
    cores: &str,
    interfaces: i64,
) -> Vec<Device> {
    (start..start + count)
        .map(|i| {
            let topologies = vec![
                topology("numa", format!("numa-{}", i / 2)),
                topology("pci", format!("pci-{}", i % 2)),
            ];
            let mut net_topologies = topologies.clone();
            net_topologies.push(topology("foo-net", net.to_string()));

            Device {
                name: format!("dev-foo-{i}"),
                attributes: vec![
                    string_attr("model", model),
                    semver_attr("firmware-version", firmware),
                    quantity_attr("net-speed", net_speed),
                ],
                capacities: vec![
                    Capacity {
                        name: "example.com/foozer/cores".to_string(),
                        topologies: topologies.clone(),
                        kind: CapacityKind::Quantity(QuantityCapacity { capacity: q(cores) }),
                    },
                    Capacity {
                        name: "example.com/foozer/memory".to_string(),
                        topologies,
                        kind: CapacityKind::Block(BlockCapacity {
                            size: q("256Mi"),
                            capacity: q(memory),
                        }),
                    },
                    Capacity {
                        name: "example.com/foozer/interfaces".to_string(),
                        topologies: net_topologies,
                        kind: CapacityKind::Counter(CounterCapacity {
                            capacity: interfaces,
                        }),
                    },
                ],
            }
        })
        .collect()
}

/// Compute-only nodes: 16 CPUs and 128Gi divided equally over two NUMA
/// nodes.
pub fn shape_zero(count: usize) -> Vec<Node> {
    (0..count)
        .map(|i| Node {
            name: format!("shape-zero-{i:03}"),
            pools: vec![default_primary_pool(&[("8", "64Gi"), ("8", "64Gi")])],
        })
        .collect()
}

/// Nodes with 4 foozer-1000 cards. Foozer 1000s only support node-local
/// foo-nets, so each node gets its own foo-net instance.
pub fn shape_one(count: usize) -> Vec<Node> {
    (0..count)
        .map(|i| Node {
            name: format!("shape-one-{i:03}"),
            pools: vec![
                default_primary_pool(&[("4", "32Gi"), ("4", "32Gi")]),
                DevicePool {
                    name: "foozer-1000-01".to_string(),
                    driver: "example.com/foozer".to_string(),
                    attributes: vec![semver_attr("driver-version", "7.8.1-gen6")],
                    devices: foozer_devices(
                        0,
                        4,
                        "foozer-1000",
                        "1.3.8",
                        "10G",
                        &format!("foonet-one-{i:03}"),
                        "64Gi",
                        "8",
                        16,
                    ),
                },
            ],
        })
        .collect()
}

/// Nodes with 8 foozer-4000 cards. Foozer 4000s support inter-node
/// foo-nets, so `nets` controls how many nodes share each one; their
/// links run at 40G rather than 10G.
pub fn shape_two(count: usize, nets: usize) -> Vec<Node> {
    (0..count)
        .map(|i| Node {
            name: format!("shape-two-{i:03}"),
            pools: vec![
                default_primary_pool(&[("4", "32Gi"), ("4", "32Gi")]),
                DevicePool {
                    name: "foozer-4000-01".to_string(),
                    driver: "example.com/foozer".to_string(),
                    attributes: vec![semver_attr("driver-version", "7.8.2-gen8")],
                    devices: foozer_devices(
                        0,
                        8,
                        "foozer-4000",
                        "1.8.8",
                        "40G",
                        &format!("foonet-two-{:02}", i % nets.max(1)),
                        "256Gi",
                        "16",
                        64,
                    ),
                },
            ],
        })
        .collect()
}

/// Nodes mixing 4 foozer-1000s and 4 foozer-4000s.
pub fn shape_three(count: usize, nets: usize) -> Vec<Node> {
    (0..count)
        .map(|i| Node {
            name: format!("shape-three-{i:03}"),
            pools: vec![
                default_primary_pool(&[("4", "32Gi"), ("4", "32Gi")]),
                DevicePool {
                    name: "foozer-1000-01".to_string(),
                    driver: "example.com/foozer".to_string(),
                    attributes: vec![semver_attr("driver-version", "7.8.2-gen8")],
                    devices: foozer_devices(
                        0,
                        4,
                        "foozer-1000",
                        "1.3.8",
                        "10G",
                        &format!("foonet-three-{i:03}"),
                        "64Gi",
                        "8",
                        16,
                    ),
                },
                DevicePool {
                    name: "foozer-4000-01".to_string(),
                    driver: "example.com/foozer".to_string(),
                    attributes: vec![semver_attr("driver-version", "7.8.2-gen8")],
                    devices: foozer_devices(
                        4,
                        4,
                        "foozer-4000",
                        "1.8.8",
                        "40G",
                        &format!("foonet-three-{:02}", i % nets.max(1)),
                        "256Gi",
                        "16",
                        64,
                    ),
                },
            ],
        })
        .collect()
}
