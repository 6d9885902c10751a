use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::feedback::RoutingError;
use crate::framework::RoutingSystem;
use crate::util::weight_from_bandwidth;

/// An undirected physical connection between exactly two nodes.
///
/// The endpoint slots are owned by the adjacency the link is stored under;
/// detached copies (as carried inside LSAs) have them cleared.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct Link<T: RoutingSystem + ?Sized> {
    /// raw transmission rate in bits per second
    pub bandwidth: f64,
    /// half-duplex links run at half the raw rate
    pub full_duplex: bool,
    pub endpoints: Option<(T::NodeAddress, T::NodeAddress)>,
}

impl<T: RoutingSystem + ?Sized> Link<T> {
    pub fn new(bandwidth: f64, full_duplex: bool) -> Self {
        Self {
            bandwidth,
            full_duplex,
            endpoints: None,
        }
    }

    /// Usable rate once duplex mode and the byte-loss rates of the two
    /// endpoints are accounted for.
    pub fn effective_bandwidth(&self, loss_a: f64, loss_b: f64) -> f64 {
        let duplex = if self.full_duplex { 1.0 } else { 0.5 };
        self.bandwidth * duplex * (1.0 - loss_a) * (1.0 - loss_b)
    }

    /// Effective bandwidth assuming lossless endpoints.
    pub fn nominal_bandwidth(&self) -> f64 {
        self.effective_bandwidth(0.0, 0.0)
    }

    /// Copy of the transmission attributes with the endpoint slots cleared.
    pub fn detached(&self) -> Link<T> {
        Link {
            bandwidth: self.bandwidth,
            full_duplex: self.full_duplex,
            endpoints: None,
        }
    }

    pub fn connects(&self, u: &T::NodeAddress, v: &T::NodeAddress) -> bool {
        match &self.endpoints {
            Some((a, b)) => (a == u && b == v) || (a == v && b == u),
            None => false,
        }
    }

    /// The endpoint on the far side of `node`.
    pub fn opposite(&self, node: &T::NodeAddress) -> Result<&T::NodeAddress, RoutingError<T>> {
        match &self.endpoints {
            Some((a, b)) if a == node => Ok(b),
            Some((a, b)) if b == node => Ok(a),
            _ => Err(RoutingError::NotAdjacent { node: node.clone() }),
        }
    }
}

/// One entry of a node record: a link, the node it leads to, and the
/// effective bandwidth observed when the record was snapshotted.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct LinkRecord<T: RoutingSystem + ?Sized> {
    pub link: Link<T>,
    pub connected: T::NodeAddress,
    pub effective_bandwidth: f64,
}

impl<T: RoutingSystem + ?Sized> LinkRecord<T> {
    pub fn weight(&self) -> f64 {
        weight_from_bandwidth(self.effective_bandwidth)
    }
}
