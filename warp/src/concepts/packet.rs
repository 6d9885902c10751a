use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::concepts::record::NodeRecord;
use crate::framework::RoutingSystem;
use crate::util::lsa_payload_bytes;

/// source + destination identifiers
pub const DATAGRAM_HEADER_BYTES: u64 = 4 + 4;

/// A link state advertisement: one node record, sequenced by its origin.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct Lsa<T: RoutingSystem + ?Sized> {
    pub record: NodeRecord<T>,
    /// strictly monotonic per origin; receivers reject anything not newer
    pub sequence_number: u64,
    /// the neighbour that relayed this copy, equal to the origin on first
    /// emission
    pub forwarding_node: T::NodeAddress,
}

#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub enum Payload<T: RoutingSystem + ?Sized> {
    Lsa(Lsa<T>),
    Data { size_bytes: u64 },
}

/// Forward path pinned by the first router on the way; intermediate nodes
/// follow it instead of running their own path selection.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct SourceRoute<T: RoutingSystem + ?Sized> {
    pub hops: Vec<T::NodeAddress>,
    /// index of the hop this datagram currently sits at
    pub current_hop: usize,
}

#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct Datagram<T: RoutingSystem + ?Sized> {
    pub source: T::NodeAddress,
    /// `None` is a broadcast; only unicast datagrams are ever forwarded
    pub destination: Option<T::NodeAddress>,
    pub route: Option<SourceRoute<T>>,
    pub payload: Payload<T>,
}

impl<T: RoutingSystem + ?Sized> Datagram<T> {
    /// Wire size used by the transmission model.
    pub fn size_bytes(&self) -> u64 {
        DATAGRAM_HEADER_BYTES
            + match &self.payload {
                Payload::Lsa(lsa) => lsa_payload_bytes(lsa.record.links.len()),
                Payload::Data { size_bytes } => *size_bytes,
            }
    }

    pub fn is_lsa(&self) -> bool {
        matches!(self.payload, Payload::Lsa(_))
    }
}

/// A datagram queued for transmission towards a neighbouring node. Hosts
/// drain `Router::outbound` and deliver each entry to `to`.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct OutboundDatagram<T: RoutingSystem + ?Sized> {
    pub to: T::NodeAddress,
    pub datagram: Datagram<T>,
}
