use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::concepts::link::LinkRecord;
use crate::framework::RoutingSystem;

/// Snapshot of a node's view of itself: its identity, every link it
/// currently has, and a load hint for load-aware path weighting.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct NodeRecord<T: RoutingSystem + ?Sized> {
    pub node: T::NodeAddress,
    pub links: Vec<LinkRecord<T>>,
    /// highest fill ratio across the node's outbound queues at snapshot time
    pub highest_observed_queue_ratio: Option<f64>,
}

impl<T: RoutingSystem + ?Sized> NodeRecord<T> {
    pub fn advertises(&self, peer: &T::NodeAddress) -> bool {
        self.links.iter().any(|l| l.connected == *peer)
    }
}
