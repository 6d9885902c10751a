use std::collections::{BTreeMap, BTreeSet};

use warp::concepts::link::{Link, LinkRecord};
use warp::concepts::packet::Datagram;
use warp::concepts::route::Path;
use warp::framework::{EventSink, ProtocolParams, RoutingSystem, TopologyOracle};
use warp::router::Router;

pub struct VirtualSystem;

impl RoutingSystem for VirtualSystem {
    type NodeAddress = String;
    fn params() -> ProtocolParams {
        ProtocolParams {
            hello_interval: 1.0,
            hello_broadcast_interval: 4,
            lsa_neighbour_timeout: 5.0,
            top_k: 4,
            stretch: 2.0,
        }
    }
}

/// The real network the harness simulates: full-duplex lossy links keyed by
/// their normalized endpoint pair.
#[derive(Default)]
pub struct PhysicalNet {
    links: BTreeMap<(String, String), Link<VirtualSystem>>,
    loss: BTreeMap<String, f64>,
}

impl PhysicalNet {
    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn add_link(&mut self, a: &str, b: &str, bandwidth: f64) {
        self.links.insert(Self::key(a, b), Link::new(bandwidth, true));
    }

    pub fn set_loss(&mut self, node: &str, rate: f64) {
        self.loss.insert(node.to_string(), rate);
    }

    fn loss_of(&self, node: &str) -> f64 {
        self.loss.get(node).copied().unwrap_or(0.0)
    }

    pub fn effective(&self, a: &str, b: &str) -> Option<f64> {
        let link = self.links.get(&Self::key(a, b))?;
        Some(link.effective_bandwidth(self.loss_of(a), self.loss_of(b)))
    }
}

impl TopologyOracle<VirtualSystem> for PhysicalNet {
    fn adjacent_link(&self, a: &String, b: &String) -> Option<LinkRecord<VirtualSystem>> {
        let link = self.links.get(&Self::key(a, b))?;
        Some(LinkRecord {
            link: link.detached(),
            connected: b.clone(),
            effective_bandwidth: self.effective(a, b)?,
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    /// (node, wire size) per delivered datagram
    pub delivered: Vec<(String, u64)>,
    pub accepted: Vec<Vec<String>>,
    pub pruned: Vec<Vec<String>>,
}

impl EventSink<VirtualSystem> for RecordingSink {
    fn on_datagram_received(&mut self, node: &String, datagram: &Datagram<VirtualSystem>) {
        self.delivered.push((node.clone(), datagram.size_bytes()));
    }

    fn on_path_accepted(&mut self, _node: &String, path: &Path<VirtualSystem>) {
        self.accepted.push(path.hops.clone());
    }

    fn on_path_pruned(&mut self, _node: &String, path: &Path<VirtualSystem>) {
        self.pruned.push(path.hops.clone());
    }
}

struct InFlight {
    deliver_at: f64,
    seq: u64,
    to: String,
    datagram: Datagram<VirtualSystem>,
}

/// Tick-driven harness wiring a set of routers to a shared physical network.
/// Datagrams between adjacent nodes take their transmission time to arrive;
/// entries addressed past a missing link are delivered directly, playing the
/// simulator's global `send_datagram` primitive.
pub struct VirtualNetwork {
    pub routers: Vec<Router<VirtualSystem>>,
    pub phys: PhysicalNet,
    pub sink: RecordingSink,
    pub time: f64,
    in_flight: Vec<InFlight>,
    blocked_lsa: BTreeSet<(String, String)>,
    next_seq: u64,
}

impl VirtualNetwork {
    pub fn create(nodes: &[&str], links: &[(&str, &str, f64)]) -> VirtualNetwork {
        let mut phys = PhysicalNet::default();
        for (a, b, bandwidth) in links {
            phys.add_link(a, b, *bandwidth);
        }
        let routers = nodes
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let mut router = Router::with_seed(id.to_string(), index as u64 + 1);
                for (a, b, _) in links {
                    let peer = if a == id {
                        Some(b)
                    } else if b == id {
                        Some(a)
                    } else {
                        None
                    };
                    if let Some(peer) = peer {
                        let record = phys
                            .adjacent_link(&id.to_string(), &peer.to_string())
                            .unwrap();
                        router.add_direct_link(record);
                    }
                }
                router
            })
            .collect();
        VirtualNetwork {
            routers,
            phys,
            sink: RecordingSink::default(),
            time: 0.0,
            in_flight: Vec::new(),
            blocked_lsa: BTreeSet::new(),
            next_seq: 0,
        }
    }

    pub fn get_node(&mut self, node: &str) -> &mut Router<VirtualSystem> {
        self.routers
            .iter_mut()
            .find(|r| r.address == node)
            .unwrap_or_else(|| panic!("No node {node} found"))
    }

    pub fn node(&self, node: &str) -> &Router<VirtualSystem> {
        self.routers
            .iter()
            .find(|r| r.address == node)
            .unwrap_or_else(|| panic!("No node {node} found"))
    }

    /// Drop every LSA carried over the `from -> to` hop, both originated and
    /// re-flooded ones. Data datagrams still flow.
    pub fn block_lsa(&mut self, from: &str, to: &str) {
        self.blocked_lsa
            .insert((from.to_string(), to.to_string()));
    }

    /// Originate traffic at `src`. Returns whether a route was found.
    pub fn send(&mut self, src: &str, dst: &str, size_bytes: u64) -> bool {
        let VirtualNetwork { routers, sink, .. } = self;
        let router = routers
            .iter_mut()
            .find(|r| r.address == src)
            .unwrap_or_else(|| panic!("No node {src} found"));
        router.originate(dst.to_string(), size_bytes, sink).unwrap()
    }

    pub fn tick(&mut self, delta: f64) {
        self.time += delta;

        let mut due = Vec::new();
        let mut later = Vec::new();
        for flight in self.in_flight.drain(..) {
            if flight.deliver_at <= self.time {
                due.push(flight);
            } else {
                later.push(flight);
            }
        }
        self.in_flight = later;
        due.sort_by(|x, y| {
            x.deliver_at
                .total_cmp(&y.deliver_at)
                .then(x.seq.cmp(&y.seq))
        });

        // timers and emissions run before this tick's arrivals are ingested
        let VirtualNetwork {
            routers,
            phys,
            sink,
            ..
        } = self;
        for router in routers.iter_mut() {
            router.update(delta, phys);
        }
        for flight in due {
            if let Some(router) = routers.iter_mut().find(|r| r.address == flight.to) {
                router.receive_datagram(flight.datagram, phys, sink).unwrap();
            }
        }
        self.flush_outbound();
    }

    pub fn tick_n(&mut self, times: usize, delta: f64) {
        for _ in 0..times {
            self.tick(delta);
        }
    }

    fn flush_outbound(&mut self) {
        for index in 0..self.routers.len() {
            let from = self.routers[index].address.clone();
            let drained: Vec<_> = self.routers[index].outbound.drain(..).collect();
            for out in drained {
                if out.datagram.is_lsa()
                    && self.blocked_lsa.contains(&(from.clone(), out.to.clone()))
                {
                    continue;
                }
                let delay = match self.phys.effective(&from, &out.to) {
                    Some(eff) if eff > 0.0 => out.datagram.size_bytes() as f64 * 8.0 / eff,
                    _ => 0.05,
                };
                self.next_seq += 1;
                self.in_flight.push(InFlight {
                    deliver_at: self.time + delay,
                    seq: self.next_seq,
                    to: out.to,
                    datagram: out.datagram,
                });
            }
        }
    }
}
