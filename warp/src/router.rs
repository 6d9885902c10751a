use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::concepts::link::LinkRecord;
use crate::concepts::packet::{Datagram, Lsa, OutboundDatagram, Payload, SourceRoute};
use crate::database::Database;
use crate::feedback::{RoutingError, RoutingWarning};
use crate::framework::{EventSink, RoutingSystem, TopologyOracle};
use crate::selection::pick_path;

pub const MAX_WARN_LENGTH: usize = 64;

/// The per-node WARP engine: owns the local database, runs the hello/LSA
/// schedule, floods advertisements, and makes the per-datagram next-hop
/// decision.
///
/// Everything is driven by the host: `update` once per tick, then
/// `receive_datagram` for each arrival, then drain `outbound`. Within one
/// tick the order is neighbour timeouts first, then hello emissions, with
/// ingestion following in the host's receive calls.
pub struct Router<T: RoutingSystem + ?Sized> {
    pub address: T::NodeAddress,
    pub database: Database<T>,
    pub outbound: Vec<OutboundDatagram<T>>,
    /// administratively down nodes drop everything and emit nothing
    pub active: bool,
    pub dropped_datagrams: u64,
    /// drain this regularly for warnings
    pub warnings: VecDeque<RoutingWarning<T>>,
    hello_timer: f64,
    hellos_since_broadcast: u32,
    rng: StdRng,
}

impl<T: RoutingSystem + ?Sized> Router<T> {
    pub fn new(address: T::NodeAddress) -> Self {
        Self::with_rng(address, StdRng::from_entropy())
    }

    /// Deterministic router for tests and reproducible simulations.
    pub fn with_seed(address: T::NodeAddress, seed: u64) -> Self {
        Self::with_rng(address, StdRng::seed_from_u64(seed))
    }

    fn with_rng(address: T::NodeAddress, mut rng: StdRng) -> Self {
        // jitter the first hello so a fleet booted together does not
        // synchronize its emissions
        let hello_timer = rng.gen_range(0.0..T::params().hello_interval);
        Self {
            database: Database::new(address.clone()),
            address,
            outbound: Vec::new(),
            active: true,
            dropped_datagrams: 0,
            warnings: VecDeque::new(),
            hello_timer,
            hellos_since_broadcast: 0,
            rng,
        }
    }

    fn warn(&mut self, warning: RoutingWarning<T>) {
        if self.warnings.len() > MAX_WARN_LENGTH {
            self.warnings.pop_front();
        }
        self.warnings.push_back(warning);
    }

    /// Seed the router with one of its wired links.
    pub fn add_direct_link(&mut self, record: LinkRecord<T>) {
        self.database.insert_direct_link(record);
    }

    /// Advance the node by `delta` seconds: expire silent neighbours, then
    /// run the hello schedule.
    pub fn update(&mut self, delta: f64, oracle: &dyn TopologyOracle<T>) {
        if !self.active {
            return;
        }

        for (neighbour, elapsed) in self.database.advance_liveness(delta) {
            self.warn(RoutingWarning::NeighbourTimedOut {
                neighbour: neighbour.clone(),
                elapsed,
            });
            let notify = self.database.declare_dead(&neighbour);
            if notify.is_empty() {
                continue;
            }
            // tell the dead node's other neighbours that our side of the
            // link is down, without asserting anything about its other links
            let record = self.database.create_node_record(oracle);
            let sequence_number = self.database.next_sequence_number();
            for target in notify {
                self.outbound.push(OutboundDatagram {
                    to: target.clone(),
                    datagram: Datagram {
                        source: self.address.clone(),
                        destination: Some(target),
                        route: None,
                        payload: Payload::Lsa(Lsa {
                            record: record.clone(),
                            sequence_number,
                            forwarding_node: self.address.clone(),
                        }),
                    },
                });
            }
        }

        let hello_interval = T::params().hello_interval;
        self.hello_timer += delta;
        while self.hello_timer >= hello_interval {
            self.hello_timer -= hello_interval;
            self.emit_hello(oracle);
        }
    }

    /// Build a fresh record and send one LSA copy to each direct neighbour.
    /// Every Nth emission is a broadcast; the rest are per-neighbour
    /// unicasts.
    fn emit_hello(&mut self, oracle: &dyn TopologyOracle<T>) {
        let record = self.database.create_node_record(oracle);
        let sequence_number = self.database.next_sequence_number();
        self.hellos_since_broadcast += 1;
        let broadcast = self.hellos_since_broadcast >= T::params().hello_broadcast_interval;
        if broadcast {
            self.hellos_since_broadcast = 0;
        }
        let lsa = Lsa {
            record,
            sequence_number,
            forwarding_node: self.address.clone(),
        };
        for neighbour in self.database.direct_neighbours.keys() {
            let destination = if broadcast {
                None
            } else {
                Some(neighbour.clone())
            };
            self.outbound.push(OutboundDatagram {
                to: neighbour.clone(),
                datagram: Datagram {
                    source: self.address.clone(),
                    destination,
                    route: None,
                    payload: Payload::Lsa(lsa.clone()),
                },
            });
        }
    }

    /// Entry point for every datagram arriving at this node.
    pub fn receive_datagram(
        &mut self,
        datagram: Datagram<T>,
        oracle: &dyn TopologyOracle<T>,
        events: &mut dyn EventSink<T>,
    ) -> Result<(), RoutingError<T>> {
        if !self.active {
            return Ok(());
        }
        let addressed_here = match &datagram.destination {
            None => true,
            Some(destination) => *destination == self.address,
        };
        if datagram.is_lsa() && addressed_here {
            return self.handle_lsa(datagram, oracle);
        }
        if addressed_here {
            events.on_datagram_received(&self.address, &datagram);
            return Ok(());
        }
        // in transit; this also carries unicast LSAs addressed to a third
        // node across the mesh
        self.forward(datagram, events)
    }

    /// Flooding rule: ingest, then re-broadcast to every direct neighbour
    /// except the origin and the upstream forwarder. A unicast LSA is
    /// terminal at its destination and is never re-broadcast.
    fn handle_lsa(
        &mut self,
        datagram: Datagram<T>,
        oracle: &dyn TopologyOracle<T>,
    ) -> Result<(), RoutingError<T>> {
        let Payload::Lsa(lsa) = &datagram.payload else {
            return Ok(());
        };
        let dead_links: Vec<RoutingWarning<T>> = lsa
            .record
            .links
            .iter()
            .filter(|entry| entry.effective_bandwidth <= 0.0)
            .map(|entry| RoutingWarning::ZeroBandwidthLink {
                origin: lsa.record.node.clone(),
                connected: entry.connected.clone(),
            })
            .collect();
        for warning in dead_links {
            self.warn(warning);
        }
        if !self.database.process_lsa(lsa, oracle) {
            return Ok(());
        }
        if datagram.destination.is_some() {
            return Ok(());
        }

        let origin = lsa.record.node.clone();
        let upstream = lsa.forwarding_node.clone();
        let mut relayed = lsa.clone();
        relayed.forwarding_node = self.address.clone();
        for neighbour in self.database.direct_neighbours.keys() {
            if *neighbour == origin || *neighbour == upstream {
                continue;
            }
            self.outbound.push(OutboundDatagram {
                to: neighbour.clone(),
                datagram: Datagram {
                    source: datagram.source.clone(),
                    destination: None,
                    route: None,
                    payload: Payload::Lsa(relayed.clone()),
                },
            });
        }
        Ok(())
    }

    /// Per-datagram next-hop decision.
    ///
    /// Source-routed datagrams advance along their pinned path; anything
    /// else gets a route picked and pinned here. `None` as the hop means
    /// local delivery when the datagram is addressed to this node, and an
    /// unroutable drop otherwise.
    pub fn next_hop(
        &mut self,
        mut datagram: Datagram<T>,
        events: &mut dyn EventSink<T>,
    ) -> Result<(Datagram<T>, Option<T::NodeAddress>), RoutingError<T>> {
        let Some(destination) = datagram.destination.clone() else {
            return Err(RoutingError::BroadcastNextHop);
        };
        if destination == self.address {
            return Ok((datagram, None));
        }
        if let Some(route) = datagram.route.as_mut() {
            route.current_hop += 1;
            if route.current_hop < route.hops.len() {
                let hop = route.hops[route.current_hop].clone();
                return Ok((datagram, Some(hop)));
            }
            return Ok((datagram, None)); // path exhausted
        }
        let picked = pick_path(
            &mut self.database,
            &mut self.rng,
            &destination,
            datagram.size_bytes(),
            events,
        )?;
        match picked {
            Some(path) => {
                let hop = path.hops.get(1).cloned();
                datagram.route = Some(SourceRoute {
                    hops: path.hops,
                    current_hop: 1,
                });
                Ok((datagram, hop))
            }
            None => Ok((datagram, None)),
        }
    }

    fn forward(
        &mut self,
        datagram: Datagram<T>,
        events: &mut dyn EventSink<T>,
    ) -> Result<(), RoutingError<T>> {
        let (datagram, hop) = self.next_hop(datagram, events)?;
        match hop {
            Some(to) => self.outbound.push(OutboundDatagram { to, datagram }),
            None => self.dropped_datagrams += 1,
        }
        Ok(())
    }

    /// Inject locally generated traffic. Returns whether a route was found
    /// and the datagram queued.
    pub fn originate(
        &mut self,
        destination: T::NodeAddress,
        size_bytes: u64,
        events: &mut dyn EventSink<T>,
    ) -> Result<bool, RoutingError<T>> {
        let datagram = Datagram {
            source: self.address.clone(),
            destination: Some(destination.clone()),
            route: None,
            payload: Payload::Data { size_bytes },
        };
        if destination == self.address {
            events.on_datagram_received(&self.address, &datagram);
            return Ok(true);
        }
        let queued_before = self.outbound.len();
        self.forward(datagram, events)?;
        Ok(self.outbound.len() > queued_before)
    }
}
