use educe::Educe;
use serde::{Deserialize, Serialize};

use crate::framework::RoutingSystem;

/// A loopless vertex sequence together with its summed edge weight.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct Path<T: RoutingSystem + ?Sized> {
    pub hops: Vec<T::NodeAddress>,
    pub total_weight: f64,
}

impl<T: RoutingSystem + ?Sized> Path<T> {
    pub fn hop_count(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }

    pub fn destination(&self) -> Option<&T::NodeAddress> {
        self.hops.last()
    }
}

/// A cached candidate route plus the byte accounting that drives the
/// deficit-weighted picker. Lives until the destination's cache entry is
/// invalidated.
#[derive(Serialize, Deserialize, Educe)]
#[serde(bound = "")]
#[educe(Clone(bound()))]
pub struct RouteInformation<T: RoutingSystem + ?Sized> {
    pub path: Path<T>,
    pub total_bytes_sent: u64,
    /// bytes by which actual traffic trails the share implied by the route's
    /// weight; positive means under-used
    pub deficit_bytes: f64,
    /// selection weight computed on the most recent pick
    pub adjusted_weight: f64,
}

impl<T: RoutingSystem + ?Sized> RouteInformation<T> {
    pub fn new(path: Path<T>) -> Self {
        Self {
            path,
            total_bytes_sent: 0,
            deficit_bytes: 0.0,
            adjusted_weight: 0.0,
        }
    }
}
