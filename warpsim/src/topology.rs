use std::collections::BTreeMap;
use std::fs;

use anyhow::{ensure, Context};
use serde::Deserialize;

use crate::sim::Simulation;

#[derive(Deserialize)]
pub struct TopologyFile {
    pub nodes: BTreeMap<String, NodePosition>,
    #[serde(default)]
    pub links: Vec<TopologyLink>,
}

/// Renderer coordinates; parsed for file compatibility, unused here.
#[allow(dead_code)]
#[derive(Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyLink {
    pub vertices: (String, String),
    pub bandwidth: f64,
    #[serde(default = "default_full_duplex")]
    pub full_duplex: bool,
}

fn default_full_duplex() -> bool {
    true
}

pub fn load(path: &str) -> anyhow::Result<Simulation> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading topology {path}"))?;
    let file: TopologyFile =
        serde_json::from_str(&raw).with_context(|| format!("parsing topology {path}"))?;

    let mut sim = Simulation::new();
    for name in file.nodes.keys() {
        sim.add_node(name);
    }
    for link in &file.links {
        let (a, b) = &link.vertices;
        ensure!(
            file.nodes.contains_key(a) && file.nodes.contains_key(b),
            "link references unknown node: {a} - {b}"
        );
        sim.add_link(a, b, link.bandwidth, link.full_duplex);
    }
    Ok(sim)
}
