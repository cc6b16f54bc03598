//! Synthetic cluster shapes and claim builders.
//!
//! Four node shapes cover the scenarios the engine is exercised with:
//!
//! - **shape zero** — plain compute nodes: 16 CPUs and 128Gi split
//!   evenly across two NUMA nodes, no specialized devices
//! - **shape one** — compute plus 4 foozer-1000 cards with node-local
//!   foo-nets
//! - **shape two** — compute plus 8 foozer-4000 cards on shared
//!   foo-nets with 40G links
//! - **shape three** — a mix of 4 foozer-1000s and 4 foozer-4000s
//!
//! The claim builders produce the matching pod, container, and foozer
//! device claims.

mod claims;
mod shapes;

pub use claims::{claim_container, claim_foozer, claim_pod};
pub use shapes::{shape_one, shape_three, shape_two, shape_zero};
