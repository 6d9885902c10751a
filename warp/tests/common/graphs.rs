use std::collections::{BTreeMap, HashMap};

use warp::concepts::link::{Link, LinkRecord};
use warp::concepts::record::NodeRecord;
use warp::database::Database;
use warp::graph::{EdgeId, Graph};

use crate::common::virtual_network::VirtualSystem;

/// Graph with explicit edge weights, plus the weight table to feed the
/// pathfinding functions.
pub fn weighted_graph(
    edges: &[(&str, &str, f64)],
) -> (Graph<VirtualSystem>, HashMap<EdgeId, f64>) {
    let mut graph = Graph::new();
    let mut weights = HashMap::new();
    for (a, b, w) in edges {
        let id = graph.add_edge(&a.to_string(), &b.to_string(), Link::new(1.0 / w, true));
        weights.insert(id, *w);
    }
    (graph, weights)
}

pub fn grid_graph() -> (Graph<VirtualSystem>, HashMap<EdgeId, f64>) {
    weighted_graph(&[
        ("1", "2", 5.0),
        ("1", "3", 7.0),
        ("2", "4", 3.0),
        ("3", "5", 2.0),
        ("3", "6", 9.0),
        ("4", "5", 5.0),
        ("4", "7", 9.0),
        ("4", "8", 2.0),
        ("5", "6", 10.0),
        ("5", "8", 1.0),
        ("5", "9", 8.0),
        ("6", "9", 5.0),
        ("7", "8", 5.0),
    ])
}

/// Database populated through record upserts, with every link full duplex
/// and lossless so the advertised bandwidth equals the raw one.
pub fn seeded_database(owner: &str, links: &[(&str, &str, f64)]) -> Database<VirtualSystem> {
    let mut db = Database::new(owner.to_string());
    let mut by_node: BTreeMap<String, Vec<LinkRecord<VirtualSystem>>> = BTreeMap::new();
    for (a, b, bandwidth) in links {
        by_node.entry(a.to_string()).or_default().push(LinkRecord {
            link: Link::new(*bandwidth, true),
            connected: b.to_string(),
            effective_bandwidth: *bandwidth,
        });
        by_node.entry(b.to_string()).or_default().push(LinkRecord {
            link: Link::new(*bandwidth, true),
            connected: a.to_string(),
            effective_bandwidth: *bandwidth,
        });
    }
    for (node, links) in by_node {
        db.upsert_node_record(NodeRecord {
            node,
            links,
            highest_observed_queue_ratio: None,
        });
    }
    db
}
