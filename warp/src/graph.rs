use std::collections::HashMap;

use educe::Educe;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::concepts::link::Link;
use crate::framework::RoutingSystem;

/// Opaque handle to an edge inside one graph instance. Handles are never
/// reused and are meaningless outside the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(u64);

/// Undirected weighted graph keyed by node addresses.
///
/// Every edge is represented symmetrically: once in each endpoint's
/// adjacency list, both entries carrying the same `EdgeId`. The link itself
/// lives in an arena so the two sides can never diverge.
#[serde_as]
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct Graph<T: RoutingSystem + ?Sized> {
    #[serde_as(as = "Vec<(_, _)>")]
    adj: HashMap<T::NodeAddress, Vec<(T::NodeAddress, EdgeId)>>,
    #[serde_as(as = "Vec<(_, _)>")]
    links: HashMap<EdgeId, Link<T>>,
    next_edge: u64,
}

impl<T: RoutingSystem + ?Sized> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: RoutingSystem + ?Sized> Graph<T> {
    pub fn new() -> Self {
        Self {
            adj: HashMap::new(),
            links: HashMap::new(),
            next_edge: 0,
        }
    }

    /// Inserting a vertex that already exists is a no-op.
    pub fn add_vertex(&mut self, v: T::NodeAddress) {
        self.adj.entry(v).or_default();
    }

    pub fn contains_vertex(&self, v: &T::NodeAddress) -> bool {
        self.adj.contains_key(v)
    }

    /// Removes `v` and every edge incident to it, from both adjacency sides.
    pub fn remove_vertex(&mut self, v: &T::NodeAddress) {
        let Some(entries) = self.adj.remove(v) else {
            return;
        };
        for (peer, edge) in entries {
            self.links.remove(&edge);
            if let Some(peer_adj) = self.adj.get_mut(&peer) {
                peer_adj.retain(|(_, e)| *e != edge);
            }
        }
    }

    /// Inserts `link` between `u` and `v`, creating the vertices as needed
    /// and replacing any existing edge between them. The link's endpoint
    /// slots are rewritten to `(u, v)`.
    pub fn add_edge(&mut self, u: &T::NodeAddress, v: &T::NodeAddress, mut link: Link<T>) -> EdgeId {
        self.add_vertex(u.clone());
        self.add_vertex(v.clone());
        self.remove_edge(u, v);
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        link.endpoints = Some((u.clone(), v.clone()));
        self.links.insert(id, link);
        self.adj.entry(u.clone()).or_default().push((v.clone(), id));
        self.adj.entry(v.clone()).or_default().push((u.clone(), id));
        id
    }

    /// Idempotent; unknown vertices and missing edges are ignored.
    pub fn remove_edge(&mut self, u: &T::NodeAddress, v: &T::NodeAddress) -> Option<Link<T>> {
        let id = self.get_edge(u, v)?;
        for side in [u, v] {
            if let Some(entries) = self.adj.get_mut(side) {
                entries.retain(|(_, e)| *e != id);
            }
        }
        self.links.remove(&id)
    }

    pub fn get_edge(&self, u: &T::NodeAddress, v: &T::NodeAddress) -> Option<EdgeId> {
        self.adj
            .get(u)?
            .iter()
            .find(|(peer, _)| peer == v)
            .map(|(_, e)| *e)
    }

    pub fn link(&self, edge: EdgeId) -> Option<&Link<T>> {
        self.links.get(&edge)
    }

    pub fn link_mut(&mut self, edge: EdgeId) -> Option<&mut Link<T>> {
        self.links.get_mut(&edge)
    }

    /// `(neighbour, edge)` pairs of `v` in insertion order; empty for an
    /// unknown vertex.
    pub fn neighbours<'a>(
        &'a self,
        v: &T::NodeAddress,
    ) -> impl Iterator<Item = &'a (T::NodeAddress, EdgeId)> {
        self.adj.get(v).into_iter().flatten()
    }

    /// Edges between consecutive vertices of `hops`, stopping at the first
    /// pair that is not adjacent.
    pub fn edges_along<'a>(
        &'a self,
        hops: &'a [T::NodeAddress],
    ) -> impl Iterator<Item = EdgeId> + 'a {
        hops.windows(2)
            .map_while(|pair| self.get_edge(&pair[0], &pair[1]))
    }

    pub fn vertices(&self) -> impl Iterator<Item = &T::NodeAddress> {
        self.adj.keys()
    }

    pub fn vertex_count(&self) -> usize {
        self.adj.len()
    }

    pub fn edge_count(&self) -> usize {
        self.links.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Link<T>)> {
        self.links.iter().map(|(id, link)| (*id, link))
    }

    pub fn clear(&mut self) {
        self.adj.clear();
        self.links.clear();
    }
}
