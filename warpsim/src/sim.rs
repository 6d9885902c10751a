use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use log::{debug, info, warn};

use warp::concepts::link::{Link, LinkRecord};
use warp::concepts::packet::{Datagram, OutboundDatagram};
use warp::framework::TopologyOracle;
use warp::router::Router;

use crate::routing::{LogSink, SimSystem};

/// bytes at which a per-link outbound queue counts as full
const QUEUE_CAPACITY_BYTES: f64 = 65536.0;
/// latency for datagrams addressed past a missing link; stands in for the
/// global delivery primitive a real deployment does not have
const OFFLINK_DELAY: f64 = 0.05;
/// simulation step size in seconds
const TICK: f64 = 0.05;

/// The real network underneath the routers: links keyed by their normalized
/// endpoint pair, per-node byte-loss rates, and per-direction transmission
/// backlogs.
pub struct PhysicalNetwork {
    links: BTreeMap<(String, String), Link<SimSystem>>,
    loss: BTreeMap<String, f64>,
    busy_until: BTreeMap<(String, String), f64>,
    now: f64,
}

impl PhysicalNetwork {
    pub fn new() -> Self {
        Self {
            links: BTreeMap::new(),
            loss: BTreeMap::new(),
            busy_until: BTreeMap::new(),
            now: 0.0,
        }
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn add_link(&mut self, a: &str, b: &str, bandwidth: f64, full_duplex: bool) {
        self.links
            .insert(Self::key(a, b), Link::new(bandwidth, full_duplex));
    }

    fn loss_of(&self, node: &str) -> f64 {
        self.loss.get(node).copied().unwrap_or(0.0)
    }

    pub fn effective(&self, a: &str, b: &str) -> Option<f64> {
        let link = self.links.get(&Self::key(a, b))?;
        Some(link.effective_bandwidth(self.loss_of(a), self.loss_of(b)))
    }
}

impl TopologyOracle<SimSystem> for PhysicalNetwork {
    fn adjacent_link(&self, a: &String, b: &String) -> Option<LinkRecord<SimSystem>> {
        let link = self.links.get(&Self::key(a, b))?;
        Some(LinkRecord {
            link: link.detached(),
            connected: b.clone(),
            effective_bandwidth: self.effective(a, b)?,
        })
    }

    fn outbound_queue_ratio(&self, node: &String, peer: &String) -> f64 {
        let Some(effective) = self.effective(node, peer) else {
            return 0.0;
        };
        let busy = self
            .busy_until
            .get(&(node.clone(), peer.clone()))
            .copied()
            .unwrap_or(0.0);
        let backlog_seconds = (busy - self.now).max(0.0);
        (backlog_seconds * effective / 8.0 / QUEUE_CAPACITY_BYTES).clamp(0.0, 1.0)
    }
}

struct ScheduledDelivery {
    time: f64,
    /// tie-break so same-instant deliveries stay in send order
    seq: u64,
    to: String,
    datagram: Datagram<SimSystem>,
}

// BinaryHeap is a max-heap, so the ordering is reversed.
impl Ord for ScheduledDelivery {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledDelivery {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledDelivery {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledDelivery {}

/// Discrete-event driver: routers attached to a shared physical network,
/// with in-flight datagrams on a time-ordered queue.
pub struct Simulation {
    pub time: f64,
    pub nodes: BTreeMap<String, Router<SimSystem>>,
    pub net: PhysicalNetwork,
    pub sink: LogSink,
    queue: BinaryHeap<ScheduledDelivery>,
    next_seq: u64,
}

impl Simulation {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            nodes: BTreeMap::new(),
            net: PhysicalNetwork::new(),
            sink: LogSink::default(),
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn add_node(&mut self, name: &str) {
        self.nodes
            .insert(name.to_string(), Router::new(name.to_string()));
    }

    pub fn add_link(&mut self, a: &str, b: &str, bandwidth: f64, full_duplex: bool) {
        self.net.add_link(a, b, bandwidth, full_duplex);
        for (near, far) in [(a, b), (b, a)] {
            if let Some(router) = self.nodes.get_mut(near) {
                let record = self
                    .net
                    .adjacent_link(&near.to_string(), &far.to_string())
                    .expect("link was just added");
                router.add_direct_link(record);
            }
        }
    }

    /// Advance by one tick. Returns how many data datagrams reached their
    /// destination during it.
    pub fn step(&mut self, delta: f64) -> u64 {
        self.time += delta;
        self.net.now = self.time;

        let mut due = Vec::new();
        while let Some(head) = self.queue.peek() {
            if head.time > self.time {
                break;
            }
            due.push(self.queue.pop().expect("peeked entry"));
        }

        // timers and emissions run before this tick's arrivals are ingested
        let delivered_before = self.sink.delivered_data;
        let Simulation {
            nodes, net, sink, ..
        } = self;
        for router in nodes.values_mut() {
            router.update(delta, net);
        }
        for delivery in due {
            if let Some(router) = nodes.get_mut(&delivery.to) {
                if let Err(err) = router.receive_datagram(delivery.datagram, net, sink) {
                    warn!("{}: {err}", delivery.to);
                }
            }
        }
        self.flush_outbound();
        self.sink.delivered_data - delivered_before
    }

    /// Run the clock forward. Returns the number of data deliveries.
    pub fn run(&mut self, seconds: f64) -> u64 {
        let mut delivered = 0;
        let steps = (seconds / TICK).ceil() as u64;
        for _ in 0..steps {
            delivered += self.step(TICK);
        }
        delivered
    }

    fn flush_outbound(&mut self) {
        let names: Vec<String> = self.nodes.keys().cloned().collect();
        for name in names {
            let outgoing: Vec<OutboundDatagram<SimSystem>> = {
                let router = self.nodes.get_mut(&name).expect("known node");
                router.outbound.drain(..).collect()
            };
            for out in outgoing {
                self.schedule(&name, out);
            }
        }
    }

    /// Transmission model: a datagram occupies its directed link for
    /// `bits / effective_bandwidth` seconds behind whatever is already
    /// queued there.
    fn schedule(&mut self, from: &str, out: OutboundDatagram<SimSystem>) {
        let deliver_at = match self.net.effective(from, &out.to) {
            Some(effective) if effective > 0.0 => {
                let key = (from.to_string(), out.to.clone());
                let start = self
                    .net
                    .busy_until
                    .get(&key)
                    .copied()
                    .unwrap_or(0.0)
                    .max(self.time);
                let finish = start + out.datagram.size_bytes() as f64 * 8.0 / effective;
                self.net.busy_until.insert(key, finish);
                finish
            }
            _ => {
                debug!("{from} -> {}: no physical link, delivering directly", out.to);
                self.time + OFFLINK_DELAY
            }
        };
        self.next_seq += 1;
        self.queue.push(ScheduledDelivery {
            time: deliver_at,
            seq: self.next_seq,
            to: out.to,
            datagram: out.datagram,
        });
    }

    /// Originate traffic. Returns whether a route was found.
    pub fn send(&mut self, src: &str, dst: &str, size_bytes: u64) -> bool {
        let Simulation { nodes, sink, .. } = self;
        let Some(router) = nodes.get_mut(src) else {
            warn!("unknown node {src}");
            return false;
        };
        match router.originate(dst.to_string(), size_bytes, sink) {
            Ok(true) => {
                info!("{src}: queued {size_bytes} bytes towards {dst}");
                true
            }
            Ok(false) => {
                warn!("{src}: no route towards {dst}");
                false
            }
            Err(err) => {
                log::error!("{src}: {err}");
                false
            }
        }
    }

    pub fn set_top_k(&mut self, node: &str, top_k: usize) {
        match self.nodes.get_mut(node) {
            Some(router) => {
                router.database.set_top_k(top_k);
                info!("{node}: keeping up to {top_k} paths per destination");
            }
            None => warn!("unknown node {node}"),
        }
    }

    /// Administrative up/down. Returns the new state.
    pub fn toggle(&mut self, node: &str) -> Option<bool> {
        let router = self.nodes.get_mut(node)?;
        router.active = !router.active;
        info!(
            "{node} is now {}",
            if router.active { "up" } else { "down" }
        );
        Some(router.active)
    }

    pub fn view(&self, node: Option<&str>) {
        match node {
            Some(name) => match self.nodes.get(name) {
                Some(router) => self.view_node(router),
                None => warn!("unknown node {name}"),
            },
            None => {
                for router in self.nodes.values() {
                    info!(
                        "{}: {} | {} direct neighbours, {} known nodes, {} dropped",
                        router.address,
                        if router.active { "up" } else { "down" },
                        router.database.direct_neighbours.len(),
                        router.database.local_graph.vertex_count(),
                        router.dropped_datagrams,
                    );
                }
            }
        }
    }

    fn view_node(&self, router: &Router<SimSystem>) {
        let db = &router.database;
        info!(
            "{}: {} | seq max {} | {} dropped",
            router.address,
            if router.active { "up" } else { "down" },
            db.max_sequence_number,
            router.dropped_datagrams,
        );
        for (neighbour, silence) in &db.direct_neighbours {
            info!("  neighbour {neighbour}, silent for {silence:.2}s");
        }
        for (destination, seq) in &db.sequence_numbers {
            if *destination == router.address {
                continue;
            }
            match db.shortest_weight_to(destination) {
                Some(weight) => {
                    info!("  {destination}: seq {seq}, best weight {weight:.9}")
                }
                None => info!("  {destination}: seq {seq}, unreachable"),
            }
        }
        for (destination, routes) in &db.routes {
            info!("  cached routes to {destination}:");
            for route in routes {
                info!(
                    "    {} | {} bytes sent, deficit {:.1}",
                    route.path.hops.join(" -> "),
                    route.total_bytes_sent,
                    route.deficit_bytes,
                );
            }
        }
    }
}
