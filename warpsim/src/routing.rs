use log::{debug, info};

use warp::concepts::packet::Datagram;
use warp::concepts::route::Path;
use warp::framework::{EventSink, ProtocolParams, RoutingSystem};

pub struct SimSystem {}

impl RoutingSystem for SimSystem {
    type NodeAddress = String;

    fn params() -> ProtocolParams {
        ProtocolParams {
            hello_interval: 2.0,
            hello_broadcast_interval: 4,
            lsa_neighbour_timeout: 10.0,
            top_k: 4,
            stretch: 2.0,
        }
    }
}

/// Routes protocol events into the terminal log.
#[derive(Default)]
pub struct LogSink {
    /// data datagrams delivered to their destination so far
    pub delivered_data: u64,
}

impl EventSink<SimSystem> for LogSink {
    fn on_datagram_received(&mut self, node: &String, datagram: &Datagram<SimSystem>) {
        if !datagram.is_lsa() {
            self.delivered_data += 1;
            info!(
                "{node} received {} bytes from {}",
                datagram.size_bytes(),
                datagram.source
            );
        }
    }

    fn on_path_accepted(&mut self, node: &String, path: &Path<SimSystem>) {
        debug!(
            "{node} accepted path {} (weight {:.9})",
            path.hops.join(" -> "),
            path.total_weight
        );
    }

    fn on_path_pruned(&mut self, node: &String, path: &Path<SimSystem>) {
        debug!("{node} pruned path {}", path.hops.join(" -> "));
    }
}
