use std::path::Path;

use anyhow::Context;
use capgrid_core::capacity::Node;
use capgrid_core::claim::PodCapacityClaim;
use capgrid_engine::evaluate_nodes;

use crate::OutputFormat;

/// Load a YAML or JSON document, picking the parser by file extension
/// (`.json` is JSON, everything else YAML).
fn load<T: serde::de::DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let value = if Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    {
        serde_json::from_str(&content).with_context(|| format!("parsing {path}"))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("parsing {path}"))?
    };
    Ok(value)
}

pub fn run(
    nodes_path: &str,
    claim_path: &str,
    output: OutputFormat,
    verbose: bool,
) -> anyhow::Result<()> {
    let nodes: Vec<Node> = load(nodes_path)?;
    let claim: PodCapacityClaim = load(claim_path)?;

    let (results, best) = evaluate_nodes(&nodes, &claim);

    match best {
        None => {
            println!("failed to satisfy the claim");
            for result in &results {
                println!("-------------------------------");
                print!("{}", result.summary());
            }
        }
        Some(idx) => {
            let winner = &results[idx];
            if verbose {
                for result in &results {
                    println!("-------------------------------");
                    print!("{}", result.summary());
                }
                println!("-------------------------------");
            }
            match output {
                OutputFormat::Yaml => print!("{}", serde_yaml::to_string(winner)?),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(winner)?),
            }
        }
    }

    Ok(())
}
