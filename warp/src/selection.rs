use std::collections::HashMap;

use rand::Rng;

use crate::concepts::route::{Path, RouteInformation};
use crate::database::Database;
use crate::feedback::RoutingError;
use crate::framework::{EventSink, RoutingSystem};
use crate::graph::EdgeId;
use crate::pathfinding::yens;

/// Filtered multipath generation: up to `k` diverse paths from `source` to
/// `destination` over the database's graph snapshot.
///
/// Candidates come from the first `k` Yen paths. The absolute shortest is
/// always taken and claims its bottleneck capacity along the way; each later
/// candidate is pruned when it is more than `stretch` times the hop count of
/// the shortest, when its residual bottleneck is gone, or when some of its
/// edges cannot spare that bottleneck.
pub fn k_path_selection<T: RoutingSystem + ?Sized>(
    db: &Database<T>,
    source: &T::NodeAddress,
    destination: &T::NodeAddress,
    k: usize,
    events: &mut dyn EventSink<T>,
) -> Result<Vec<Path<T>>, RoutingError<T>> {
    if !db.local_graph.contains_vertex(source) {
        return Err(RoutingError::CorruptDatabase {
            owner: source.clone(),
        });
    }

    let mut usage: HashMap<EdgeId, f64> = HashMap::new();
    let mut capacity: HashMap<EdgeId, f64> = HashMap::new();
    for (edge, record) in &db.link_records {
        usage.insert(*edge, 0.0);
        capacity.insert(*edge, record.effective_bandwidth);
    }

    let stretch = T::params().stretch;
    let weight = |edge: EdgeId| db.edge_weight(edge);
    let mut accepted: Vec<Path<T>> = Vec::new();
    let mut shortest_hops = 0usize;

    for candidate in yens(
        &db.local_graph,
        weight,
        source.clone(),
        destination.clone(),
    )
    .take(k)
    {
        let edges: Vec<EdgeId> = db.local_graph.edges_along(&candidate.hops).collect();
        let available = |edge: &EdgeId| -> f64 {
            capacity.get(edge).copied().unwrap_or(0.0) - usage.get(edge).copied().unwrap_or(0.0)
        };
        let bottleneck = edges
            .iter()
            .map(available)
            .fold(f64::INFINITY, f64::min);

        if accepted.is_empty() {
            for edge in &edges {
                *usage.entry(*edge).or_insert(0.0) += bottleneck;
            }
            shortest_hops = candidate.hop_count();
            events.on_path_accepted(source, &candidate);
            accepted.push(candidate);
            continue;
        }

        if candidate.hop_count() as f64 > stretch * shortest_hops as f64 {
            events.on_path_pruned(source, &candidate);
            continue;
        }
        if bottleneck <= 0.0 {
            events.on_path_pruned(source, &candidate);
            continue;
        }
        if edges.iter().any(|edge| available(edge) < bottleneck) {
            events.on_path_pruned(source, &candidate);
            continue;
        }

        for edge in &edges {
            *usage.entry(*edge).or_insert(0.0) += bottleneck;
        }
        events.on_path_accepted(source, &candidate);
        accepted.push(candidate);
    }

    Ok(accepted)
}

/// Deficit-weighted random choice among the cached routes to `destination`,
/// populating the cache through `k_path_selection` on a miss.
///
/// Every call charges the chosen route with the packet and rebalances all
/// deficits so that they sum to zero: each route's deficit is the byte share
/// implied by its weight minus what it actually carried.
pub fn pick_path<T, R>(
    db: &mut Database<T>,
    rng: &mut R,
    destination: &T::NodeAddress,
    packet_size_bytes: u64,
    events: &mut dyn EventSink<T>,
) -> Result<Option<Path<T>>, RoutingError<T>>
where
    T: RoutingSystem + ?Sized,
    R: Rng,
{
    if !db.routes.contains_key(destination) {
        let owner = db.owner.clone();
        let paths = k_path_selection(db, &owner, destination, db.top_k, events)?;
        db.routes.insert(
            destination.clone(),
            paths.into_iter().map(RouteInformation::new).collect(),
        );
    }
    let Some(routes) = db.routes.get_mut(destination) else {
        return Ok(None);
    };
    if routes.is_empty() {
        return Ok(None);
    }

    let size = packet_size_bytes as f64;
    let alpha = 1.0 + size / (size + 512.0);
    let mut total = 0.0;
    for route in routes.iter_mut() {
        route.adjusted_weight =
            (route.path.total_weight.powf(alpha) + route.deficit_bytes / alpha).max(0.0);
        total += route.adjusted_weight;
    }

    let draw = if total > 0.0 {
        rng.gen_range(0.0..total)
    } else {
        0.0
    };
    let mut selected = routes.len() - 1;
    let mut cumulative = 0.0;
    for (index, route) in routes.iter().enumerate() {
        cumulative += route.adjusted_weight;
        if cumulative >= draw {
            selected = index;
            break;
        }
    }

    routes[selected].total_bytes_sent += packet_size_bytes;

    let total_bytes: f64 = routes.iter().map(|r| r.total_bytes_sent as f64).sum();
    let total_weight: f64 = routes.iter().map(|r| r.path.total_weight).sum();
    for route in routes.iter_mut() {
        route.deficit_bytes =
            total_bytes * route.path.total_weight / total_weight - route.total_bytes_sent as f64;
    }

    Ok(Some(routes[selected].path.clone()))
}
