use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::concepts::link::LinkRecord;
use crate::concepts::packet::Datagram;
use crate::concepts::route::Path;

pub trait RoutingSystem {
    /// Identity of a node on the mesh, MUST be globally unique.
    /// The `Ord` on this type doubles as the deterministic tie-break wherever
    /// the protocol needs one (equal-distance vertices, equal-weight paths).
    type NodeAddress: Ord + PartialOrd + Debug + Display + RootData + RootKey;
    fn params() -> ProtocolParams {
        Default::default()
    }
}

pub trait RootData: Clone + Serialize + DeserializeOwned + Sized {}
pub trait RootKey: Eq + PartialEq + Hash {}
impl<T: Eq + PartialEq + Hash> RootKey for T {}
impl<T: Clone + Serialize + DeserializeOwned + Sized> RootData for T {}

/// Read-only view of the real network, injected into each node.
///
/// The routing engine consults it in exactly two places: to corroborate that
/// an LSA forwarder really is physically adjacent before mapping the link,
/// and to read the outbound queue fill when snapshotting its own record.
pub trait TopologyOracle<T: RoutingSystem + ?Sized> {
    /// Current attributes of the physical link between `a` and `b`, with the
    /// record's `connected` side set to `b`. `None` if not adjacent.
    fn adjacent_link(&self, a: &T::NodeAddress, b: &T::NodeAddress) -> Option<LinkRecord<T>>;

    /// Fill ratio in [0, 1] of the outbound transmission queue from `node`
    /// towards `peer`.
    fn outbound_queue_ratio(&self, _node: &T::NodeAddress, _peer: &T::NodeAddress) -> f64 {
        0.0
    }
}

/// Per-node observer for telemetry. A single sink per node suffices.
pub trait EventSink<T: RoutingSystem + ?Sized> {
    fn on_datagram_received(&mut self, _node: &T::NodeAddress, _datagram: &Datagram<T>) {}
    fn on_path_accepted(&mut self, _node: &T::NodeAddress, _path: &Path<T>) {}
    fn on_path_pruned(&mut self, _node: &T::NodeAddress, _path: &Path<T>) {}
}

/// Sink that discards every event.
#[derive(Default)]
pub struct NoopSink;
impl<T: RoutingSystem + ?Sized> EventSink<T> for NoopSink {}

pub struct ProtocolParams {
    /// seconds between hello emissions, jittered per node at init
    pub hello_interval: f64,
    /// every Nth hello is a broadcast instead of per-neighbour unicasts
    pub hello_broadcast_interval: u32,
    /// seconds without any LSA from a direct neighbour before declaring it dead
    pub lsa_neighbour_timeout: f64,
    /// maximum number of candidate paths kept per destination
    pub top_k: usize,
    /// candidates longer than `stretch` times the hop count of the shortest
    /// accepted path are pruned
    pub stretch: f64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            hello_interval: 2.0,
            hello_broadcast_interval: 4,
            lsa_neighbour_timeout: 10.0,
            top_k: 4,
            stretch: 2.0,
        }
    }
}
