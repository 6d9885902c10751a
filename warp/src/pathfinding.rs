use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::concepts::route::Path;
use crate::framework::RoutingSystem;
use crate::graph::{EdgeId, Graph};

/// Entry in the dijkstra pending set. Ordered by `(distance, vertex)` so
/// equal-distance vertices pop in a fixed order.
struct Pending<A> {
    distance: f64,
    vertex: A,
}

impl<A: Ord> Ord for Pending<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.vertex.cmp(&other.vertex))
    }
}

impl<A: Ord> PartialOrd for Pending<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A: Ord> PartialEq for Pending<A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<A: Ord> Eq for Pending<A> {}

/// Single-source shortest path with non-negative weights. Vertices in
/// `forbidden` are never expanded. Returns `None` when `target` is
/// unreachable; edges with infinite weight are treated as absent.
pub fn dijkstra<T, W>(
    graph: &Graph<T>,
    weight: &W,
    source: &T::NodeAddress,
    target: &T::NodeAddress,
    forbidden: &HashSet<T::NodeAddress>,
) -> Option<Path<T>>
where
    T: RoutingSystem + ?Sized,
    W: Fn(EdgeId) -> f64,
{
    dijkstra_filtered(graph, weight, source, target, forbidden, &HashSet::new())
}

fn dijkstra_filtered<T, W>(
    graph: &Graph<T>,
    weight: &W,
    source: &T::NodeAddress,
    target: &T::NodeAddress,
    forbidden: &HashSet<T::NodeAddress>,
    banned_edges: &HashSet<EdgeId>,
) -> Option<Path<T>>
where
    T: RoutingSystem + ?Sized,
    W: Fn(EdgeId) -> f64,
{
    if forbidden.contains(source) || forbidden.contains(target) {
        return None;
    }
    if !graph.contains_vertex(source) || !graph.contains_vertex(target) {
        return None;
    }

    let mut distance: HashMap<T::NodeAddress, f64> = HashMap::new();
    let mut previous: HashMap<T::NodeAddress, T::NodeAddress> = HashMap::new();
    let mut pending = BinaryHeap::new();
    distance.insert(source.clone(), 0.0);
    pending.push(Reverse(Pending {
        distance: 0.0,
        vertex: source.clone(),
    }));

    while let Some(Reverse(entry)) = pending.pop() {
        let known = distance.get(&entry.vertex).copied().unwrap_or(f64::INFINITY);
        if entry.distance > known {
            continue; // superseded entry
        }
        if entry.vertex == *target {
            let mut hops = vec![target.clone()];
            let mut cursor = target;
            while let Some(prev) = previous.get(cursor) {
                hops.push(prev.clone());
                cursor = prev;
            }
            hops.reverse();
            return Some(Path {
                hops,
                total_weight: entry.distance,
            });
        }
        for (peer, edge) in graph.neighbours(&entry.vertex) {
            if forbidden.contains(peer) || banned_edges.contains(edge) {
                continue;
            }
            let w = weight(*edge);
            if !w.is_finite() {
                continue;
            }
            let tentative = entry.distance + w;
            if tentative < *distance.get(peer).unwrap_or(&f64::INFINITY) {
                distance.insert(peer.clone(), tentative);
                previous.insert(peer.clone(), entry.vertex.clone());
                pending.push(Reverse(Pending {
                    distance: tentative,
                    vertex: peer.clone(),
                }));
            }
        }
    }
    None
}

/// Sum of edge weights along `hops`; infinite when consecutive vertices are
/// not adjacent.
pub fn path_weight<T, W>(graph: &Graph<T>, weight: &W, hops: &[T::NodeAddress]) -> f64
where
    T: RoutingSystem + ?Sized,
    W: Fn(EdgeId) -> f64,
{
    if hops.len() <= 1 {
        return 0.0;
    }
    let edges: Vec<EdgeId> = graph.edges_along(hops).collect();
    if edges.len() != hops.len() - 1 {
        return f64::INFINITY;
    }
    edges.into_iter().map(weight).sum()
}

struct Candidate<T: RoutingSystem + ?Sized> {
    total_weight: f64,
    hops: Vec<T::NodeAddress>,
}

impl<T: RoutingSystem + ?Sized> Ord for Candidate<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_weight
            .total_cmp(&other.total_weight)
            .then_with(|| self.hops.cmp(&other.hops))
    }
}

impl<T: RoutingSystem + ?Sized> PartialOrd for Candidate<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: RoutingSystem + ?Sized> PartialEq for Candidate<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: RoutingSystem + ?Sized> Eq for Candidate<T> {}

/// Lazy enumeration of loopless paths from `source` to `target` in
/// non-decreasing total weight, Yen-style.
///
/// Spur computations ban edges and vertices through side sets instead of
/// mutating the graph, so an in-progress enumeration never leaves any state
/// behind.
pub fn yens<T, W>(
    graph: &Graph<T>,
    weight: W,
    source: T::NodeAddress,
    target: T::NodeAddress,
) -> Yens<'_, T, W>
where
    T: RoutingSystem + ?Sized,
    W: Fn(EdgeId) -> f64,
{
    Yens {
        graph,
        weight,
        source,
        target,
        yielded: Vec::new(),
        candidates: BinaryHeap::new(),
        done: false,
    }
}

pub struct Yens<'g, T: RoutingSystem + ?Sized, W> {
    graph: &'g Graph<T>,
    weight: W,
    source: T::NodeAddress,
    target: T::NodeAddress,
    yielded: Vec<Path<T>>,
    candidates: BinaryHeap<Reverse<Candidate<T>>>,
    done: bool,
}

impl<T, W> Yens<'_, T, W>
where
    T: RoutingSystem + ?Sized,
    W: Fn(EdgeId) -> f64,
{
    /// Derive spur candidates from the most recently yielded path.
    fn push_spur_candidates(&mut self, prev: &Path<T>) {
        for i in 0..prev.hops.len().saturating_sub(1) {
            let spur_node = &prev.hops[i];
            let root = &prev.hops[..=i];

            // ban the next edge of every emitted path that shares this root,
            // so the spur is forced to deviate here
            let mut banned_edges = HashSet::new();
            for q in &self.yielded {
                if q.hops.len() > i + 1 && q.hops[..=i] == *root {
                    if let Some(edge) = self.graph.get_edge(&q.hops[i], &q.hops[i + 1]) {
                        banned_edges.insert(edge);
                    }
                }
            }
            let forbidden: HashSet<T::NodeAddress> = root[..i].iter().cloned().collect();

            let Some(spur) = dijkstra_filtered(
                self.graph,
                &self.weight,
                spur_node,
                &self.target,
                &forbidden,
                &banned_edges,
            ) else {
                continue;
            };

            let mut hops = root[..i].to_vec();
            hops.extend(spur.hops);
            let total_weight = path_weight(self.graph, &self.weight, &hops);
            if total_weight.is_finite() {
                self.candidates.push(Reverse(Candidate { total_weight, hops }));
            }
        }
    }
}

impl<T, W> Iterator for Yens<'_, T, W>
where
    T: RoutingSystem + ?Sized,
    W: Fn(EdgeId) -> f64,
{
    type Item = Path<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = match self.yielded.last().cloned() {
            None => dijkstra(
                self.graph,
                &self.weight,
                &self.source,
                &self.target,
                &HashSet::new(),
            ),
            Some(prev) => {
                self.push_spur_candidates(&prev);
                loop {
                    let Some(Reverse(candidate)) = self.candidates.pop() else {
                        break None;
                    };
                    if self.yielded.iter().any(|p| p.hops == candidate.hops) {
                        continue; // duplicate of an emitted path
                    }
                    break Some(Path {
                        hops: candidate.hops,
                        total_weight: candidate.total_weight,
                    });
                }
            }
        };
        match next {
            Some(path) => {
                self.yielded.push(path.clone());
                Some(path)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
