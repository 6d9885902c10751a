use educe::Educe;
use thiserror::Error;

use crate::framework::RoutingSystem;

/// These indicate corrupted state or caller bugs; expected outcomes such as a
/// stale LSA or an unroutable datagram are plain return values instead.
#[derive(Error)]
#[derive(Educe)]
#[educe(Debug)]
pub enum RoutingError<T: RoutingSystem + ?Sized> {
    /// `next_hop` was asked to forward a datagram without a destination.
    #[error("datagram has no destination, only unicast datagrams can be forwarded")]
    BroadcastNextHop,
    /// A link was asked about a node that is not one of its endpoints.
    #[error("node {node} is not an endpoint of this link")]
    NotAdjacent { node: T::NodeAddress },
    /// The owner is missing from its own local graph. The database is corrupt
    /// and the simulation should not continue.
    #[error("node {owner} is missing from its own local graph")]
    CorruptDatabase { owner: T::NodeAddress },
}

/// Although this is an error enum, these should be treated as warnings.
/// Drain `Router::warnings` regularly to observe them.
#[derive(Error)]
#[derive(Educe)]
#[educe(Debug)]
pub enum RoutingWarning<T: RoutingSystem + ?Sized> {
    /// A direct neighbour went silent past the liveness timeout and has been
    /// declared dead. The link to it was withdrawn.
    #[error("neighbour {neighbour} silent for {elapsed}s, declared dead")]
    NeighbourTimedOut {
        neighbour: T::NodeAddress,
        elapsed: f64,
    },
    /// An LSA advertised a link with zero effective bandwidth. Its weight
    /// saturates to infinity and no path will cross it.
    #[error("{origin} advertised a dead link towards {connected}")]
    ZeroBandwidthLink {
        origin: T::NodeAddress,
        connected: T::NodeAddress,
    },
}
