use std::collections::{BTreeMap, HashMap, HashSet};

use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::concepts::link::LinkRecord;
use crate::concepts::packet::Lsa;
use crate::concepts::record::NodeRecord;
use crate::concepts::route::RouteInformation;
use crate::framework::{RoutingSystem, TopologyOracle};
use crate::graph::{EdgeId, Graph};

/// Per-node mirror of the known topology: the local graph, the latest
/// accepted record and sequence number for every origin, liveness timers for
/// direct neighbours, and the candidate-route cache.
///
/// The database is mutated only by its owning node's handlers; two nodes
/// never share one.
#[serde_as]
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct Database<T: RoutingSystem + ?Sized> {
    pub owner: T::NodeAddress,
    pub local_graph: Graph<T>,
    pub node_records: BTreeMap<T::NodeAddress, NodeRecord<T>>,
    #[serde_as(as = "Vec<(_, _)>")]
    pub link_records: HashMap<EdgeId, LinkRecord<T>>,
    /// highest accepted sequence number per origin
    pub sequence_numbers: BTreeMap<T::NodeAddress, u64>,
    /// the forwarder that delivered the accepted sequence number, per origin
    pub sequence_number_origin: BTreeMap<T::NodeAddress, T::NodeAddress>,
    /// running maximum across all origins; the owner's next emission uses
    /// `max + 1` so its advertisements outrank everything it has seen
    pub max_sequence_number: u64,
    /// seconds since the last LSA heard from each direct neighbour
    pub direct_neighbours: BTreeMap<T::NodeAddress, f64>,
    pub routes: BTreeMap<T::NodeAddress, Vec<RouteInformation<T>>>,
    pub top_k: usize,
    pub lsa_neighbour_timeout: f64,
}

impl<T: RoutingSystem + ?Sized> Database<T> {
    pub fn new(owner: T::NodeAddress) -> Self {
        let params = T::params();
        let mut local_graph = Graph::new();
        local_graph.add_vertex(owner.clone());
        Self {
            owner,
            local_graph,
            node_records: BTreeMap::new(),
            link_records: HashMap::new(),
            sequence_numbers: BTreeMap::new(),
            sequence_number_origin: BTreeMap::new(),
            max_sequence_number: 0,
            direct_neighbours: BTreeMap::new(),
            routes: BTreeMap::new(),
            top_k: params.top_k,
            lsa_neighbour_timeout: params.lsa_neighbour_timeout,
        }
    }

    /// Maps a physical link of the owner into the local graph and starts its
    /// liveness timer. Used to seed a node with its wired neighbours.
    pub fn insert_direct_link(&mut self, record: LinkRecord<T>) {
        let peer = record.connected.clone();
        let edge = match self.local_graph.get_edge(&self.owner, &peer) {
            Some(edge) => edge,
            None => self
                .local_graph
                .add_edge(&self.owner, &peer, record.link.detached()),
        };
        self.link_records.insert(edge, record);
        self.direct_neighbours.insert(peer, 0.0);
        self.routes.clear();
    }

    /// Sequence number for the owner's next advertisement.
    pub fn next_sequence_number(&mut self) -> u64 {
        self.max_sequence_number += 1;
        self.sequence_numbers
            .insert(self.owner.clone(), self.max_sequence_number);
        self.max_sequence_number
    }

    /// Routing weight of an edge in the local graph.
    pub fn edge_weight(&self, edge: EdgeId) -> f64 {
        self.link_records
            .get(&edge)
            .map(LinkRecord::weight)
            .unwrap_or(f64::INFINITY)
    }

    /// Ingest one LSA. Returns whether it was accepted.
    ///
    /// A stale LSA is rejected without touching the topology, but still
    /// proves that its forwarder is alive, so the forwarder's liveness timer
    /// resets either way.
    pub fn process_lsa(&mut self, lsa: &Lsa<T>, oracle: &dyn TopologyOracle<T>) -> bool {
        let origin = &lsa.record.node;
        let stored = self.sequence_numbers.get(origin).copied().unwrap_or(0);
        if *origin == self.owner || lsa.sequence_number <= stored {
            if let Some(timer) = self.direct_neighbours.get_mut(&lsa.forwarding_node) {
                *timer = 0.0;
            }
            return false;
        }

        self.sequence_numbers
            .insert(origin.clone(), lsa.sequence_number);
        self.max_sequence_number = self.max_sequence_number.max(lsa.sequence_number);
        self.sequence_number_origin
            .insert(origin.clone(), lsa.forwarding_node.clone());
        self.upsert_node_record(lsa.record.clone());

        let forwarder = &lsa.forwarding_node;
        if *forwarder != self.owner {
            if self.local_graph.get_edge(&self.owner, forwarder).is_some() {
                self.direct_neighbours.insert(forwarder.clone(), 0.0);
            } else if let Some(record) = oracle.adjacent_link(&self.owner, forwarder) {
                // the forwarder reached us over a physical link we have not
                // mapped yet; advertise it as our own from now on
                let mut own = self.create_node_record(oracle);
                own.links.push(record);
                self.upsert_node_record(own);
                self.direct_neighbours.insert(forwarder.clone(), 0.0);
            }
        }
        true
    }

    /// Write `record` into the graph. Links present in the record are
    /// inserted or refreshed; links the record no longer mentions are
    /// withdrawn, except on the owner's own record, whose neighbours are also
    /// discovered through direct adjacency.
    pub fn upsert_node_record(&mut self, record: NodeRecord<T>) {
        self.local_graph.add_vertex(record.node.clone());
        for entry in &record.links {
            let effective = self.advertised_bandwidth(&record, entry);
            self.local_graph.add_vertex(entry.connected.clone());
            let edge = match self.local_graph.get_edge(&record.node, &entry.connected) {
                Some(edge) => {
                    if let Some(link) = self.local_graph.link_mut(edge) {
                        link.bandwidth = entry.link.bandwidth;
                        link.full_duplex = entry.link.full_duplex;
                    }
                    edge
                }
                None => {
                    self.local_graph
                        .add_edge(&record.node, &entry.connected, entry.link.detached())
                }
            };
            self.link_records.insert(
                edge,
                LinkRecord {
                    link: entry.link.detached(),
                    connected: entry.connected.clone(),
                    effective_bandwidth: effective,
                },
            );
        }

        if record.node != self.owner {
            let advertised: HashSet<&T::NodeAddress> =
                record.links.iter().map(|l| &l.connected).collect();
            let withdrawn: Vec<(T::NodeAddress, EdgeId)> = self
                .local_graph
                .neighbours(&record.node)
                .filter(|(peer, _)| !advertised.contains(peer))
                .cloned()
                .collect();
            for (peer, edge) in withdrawn {
                self.local_graph.remove_edge(&record.node, &peer);
                self.link_records.remove(&edge);
            }
        }

        self.node_records.insert(record.node.clone(), record);
        self.routes.clear();
    }

    /// Advertised effective bandwidth of one record entry. With multipath
    /// enabled the value is derated by the queue-fill hints of both
    /// endpoints (load-aware mode); with `top_k == 1` the raw advertised
    /// value is used.
    fn advertised_bandwidth(&self, record: &NodeRecord<T>, entry: &LinkRecord<T>) -> f64 {
        if self.top_k <= 1 {
            return entry.effective_bandwidth;
        }
        let hint = |node: &T::NodeAddress| -> f64 {
            let ratio = if *node == record.node {
                record.highest_observed_queue_ratio
            } else {
                self.node_records
                    .get(node)
                    .and_then(|r| r.highest_observed_queue_ratio)
            };
            ratio.unwrap_or(0.0).clamp(0.0, 1.0)
        };
        entry.effective_bandwidth * (1.0 - hint(&record.node)) * (1.0 - hint(&entry.connected))
    }

    /// Snapshot the owner's current links for advertisement. Effective
    /// bandwidths are read fresh from the physical network where possible and
    /// fall back to the stored records.
    pub fn create_node_record(&self, oracle: &dyn TopologyOracle<T>) -> NodeRecord<T> {
        let mut links = Vec::new();
        let mut highest_ratio: Option<f64> = None;
        for (peer, edge) in self.local_graph.neighbours(&self.owner) {
            let entry = match oracle.adjacent_link(&self.owner, peer) {
                Some(real) => real,
                None => match self.link_records.get(edge) {
                    Some(stored) => LinkRecord {
                        link: stored.link.detached(),
                        connected: peer.clone(),
                        effective_bandwidth: stored.effective_bandwidth,
                    },
                    None => continue,
                },
            };
            let ratio = oracle.outbound_queue_ratio(&self.owner, peer);
            highest_ratio = Some(highest_ratio.unwrap_or(0.0).max(ratio));
            links.push(LinkRecord {
                link: entry.link.detached(),
                connected: peer.clone(),
                effective_bandwidth: entry.effective_bandwidth,
            });
        }
        NodeRecord {
            node: self.owner.clone(),
            links,
            highest_observed_queue_ratio: highest_ratio,
        }
    }

    /// Advance every direct neighbour's liveness timer, returning the ones
    /// that crossed the timeout together with their elapsed silence.
    pub fn advance_liveness(&mut self, delta: f64) -> Vec<(T::NodeAddress, f64)> {
        let mut expired = Vec::new();
        for (neighbour, timer) in self.direct_neighbours.iter_mut() {
            *timer += delta;
            if *timer >= self.lsa_neighbour_timeout {
                expired.push((neighbour.clone(), *timer));
            }
        }
        expired
    }

    /// Withdraw a dead neighbour: its record is no longer trusted and the
    /// owner's side of the link comes down. Returns the dead node's other
    /// neighbours still present in the graph, which should be told that the
    /// owner's link to it is gone.
    pub fn declare_dead(&mut self, neighbour: &T::NodeAddress) -> Vec<T::NodeAddress> {
        self.direct_neighbours.remove(neighbour);
        self.node_records.remove(neighbour);
        if let Some(edge) = self.local_graph.get_edge(&self.owner, neighbour) {
            self.local_graph.remove_edge(&self.owner, neighbour);
            self.link_records.remove(&edge);
        }
        self.routes.clear();
        self.local_graph
            .neighbours(neighbour)
            .map(|(peer, _)| peer.clone())
            .filter(|peer| *peer != self.owner)
            .collect()
    }

    /// Changing the candidate count invalidates every cached route set.
    pub fn set_top_k(&mut self, top_k: usize) {
        if top_k != self.top_k {
            self.top_k = top_k;
            self.routes.clear();
        }
    }

    /// Weight of the best-known single path to `destination`, if any.
    pub fn shortest_weight_to(&self, destination: &T::NodeAddress) -> Option<f64> {
        let weight = |edge: EdgeId| self.edge_weight(edge);
        crate::pathfinding::dijkstra(
            &self.local_graph,
            &weight,
            &self.owner,
            destination,
            &HashSet::new(),
        )
        .map(|p| p.total_weight)
    }
}
