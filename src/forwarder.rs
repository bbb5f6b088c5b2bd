// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Forwarding node
//!
//! The forwarder is responsible for:
//! - Classifying arriving packets by marking
//! - Asking the route provider for an egress route
//! - Handing unplaceable packets to the default-route provider
//! - Queueing onto the egress interface's priority scheduler
//! - Releasing queued packets to the transmission side

use crate::error::{InterfaceError, SchedulerError};
use crate::interface::{InterfaceEvent, InterfaceId, InterfaceRegistry};
use crate::packet::Packet;
use crate::policies::qos::TrafficClassifier;
use crate::policies::routing::{RouteDecision, RouteProvider};
use crate::policies::scheduling::PriorityScheduler;
use crate::routing::RouteEntry;
use crate::stats::{ForwarderStats, StatsSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// What happened to a packet handed to [`Forwarder::forward`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ForwardOutcome {
    /// Queued for transmission to `next_hop` over `interface`
    Queued {
        interface: InterfaceId,
        next_hop: Ipv4Addr,
        band: usize,
    },
    /// Tail-dropped: the egress scheduler was full
    Dropped { interface: InterfaceId, band: usize },
    /// Neither the route provider nor the default provider had a path
    Unroutable,
}

impl ForwardOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, ForwardOutcome::Queued { .. })
    }

    /// Egress interface, when a route was found
    pub fn interface(&self) -> Option<InterfaceId> {
        match self {
            ForwardOutcome::Queued { interface, .. }
            | ForwardOutcome::Dropped { interface, .. } => Some(*interface),
            ForwardOutcome::Unroutable => None,
        }
    }
}

/// One forwarding node
pub struct Forwarder {
    registry: Arc<InterfaceRegistry>,
    classifier: Arc<TrafficClassifier>,
    provider: Box<dyn RouteProvider>,
    default_provider: Option<Box<dyn RouteProvider>>,
    /// One scheduler per egress interface
    schedulers: BTreeMap<InterfaceId, PriorityScheduler>,
    stats: Arc<ForwarderStats>,
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("provider", &self.provider.name())
            .field(
                "default_provider",
                &self.default_provider.as_ref().map(|p| p.name()),
            )
            .field("interfaces", &self.schedulers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Forwarder {
    /// Creates a forwarder with a scheduler for every registered interface
    pub fn new(
        registry: Arc<InterfaceRegistry>,
        classifier: Arc<TrafficClassifier>,
        provider: Box<dyn RouteProvider>,
        bands: usize,
        capacity: usize,
    ) -> Result<Self, SchedulerError> {
        let mut schedulers = BTreeMap::new();
        for interface in registry.interfaces() {
            let scheduler = PriorityScheduler::new(Arc::clone(&classifier), bands, capacity)?;
            schedulers.insert(interface, scheduler);
        }

        tracing::info!(
            "Forwarder ready: provider {}, {} interfaces, {} bands x {} packets",
            provider.name(),
            schedulers.len(),
            bands,
            capacity
        );

        Ok(Self {
            registry,
            classifier,
            provider,
            default_provider: None,
            schedulers,
            stats: Arc::new(ForwarderStats::default()),
        })
    }

    /// Installs the provider consulted when the primary provider falls back
    pub fn with_default_provider(mut self, provider: Box<dyn RouteProvider>) -> Self {
        self.default_provider = Some(provider);
        self
    }

    pub fn registry(&self) -> Arc<InterfaceRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn classifier(&self) -> &TrafficClassifier {
        &self.classifier
    }

    pub fn stats(&self) -> Arc<ForwarderStats> {
        Arc::clone(&self.stats)
    }

    /// Applies a link failure or recovery event
    pub fn apply_event(&self, event: InterfaceEvent) -> Result<bool, InterfaceError> {
        self.registry.apply(event)
    }

    fn resolve(&self, packet: &Packet) -> Option<RouteEntry> {
        let class = self.classifier.traffic_class(packet.marking);

        match self.provider.select(packet.destination, class, &self.registry) {
            RouteDecision::Forward(entry) => Some(entry),
            RouteDecision::Fallback => {
                let provider = self.default_provider.as_ref()?;
                match provider.select(packet.destination, class, &self.registry) {
                    RouteDecision::Forward(entry) => {
                        self.stats.increment_default_routed();
                        Some(entry)
                    }
                    RouteDecision::Fallback => None,
                }
            }
        }
    }

    /// Routes and queues one packet
    pub fn forward(&mut self, packet: Packet) -> ForwardOutcome {
        let Some(route) = self.resolve(&packet) else {
            self.stats.increment_unroutable();
            return ForwardOutcome::Unroutable;
        };

        let interface = route.out_interface;
        let Some(scheduler) = self.schedulers.get_mut(&interface) else {
            self.stats.increment_unroutable();
            return ForwardOutcome::Unroutable;
        };

        let band = self.classifier.classify(packet.marking);
        match scheduler.enqueue(packet) {
            Ok(band) => {
                self.stats.increment_forwarded();
                ForwardOutcome::Queued {
                    interface,
                    next_hop: route.next_hop,
                    band,
                }
            }
            Err(_) => ForwardOutcome::Dropped { interface, band },
        }
    }

    /// Releases the next packet for an interface in priority order
    pub fn dequeue(&mut self, interface: InterfaceId) -> Option<Packet> {
        self.schedulers.get_mut(&interface)?.dequeue()
    }

    /// Releases up to `budget` packets for an interface
    pub fn drain(&mut self, interface: InterfaceId, budget: usize) -> Vec<Packet> {
        let Some(scheduler) = self.schedulers.get_mut(&interface) else {
            return Vec::new();
        };
        std::iter::from_fn(|| scheduler.dequeue())
            .take(budget)
            .collect()
    }

    pub fn scheduler(&self, interface: InterfaceId) -> Option<&PriorityScheduler> {
        self.schedulers.get(&interface)
    }

    /// Packets queued across all interfaces
    pub fn total_queued(&self) -> usize {
        self.schedulers.values().map(PriorityScheduler::len).sum()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            forwarded: self.stats.forwarded(),
            default_routed: self.stats.default_routed(),
            unroutable: self.stats.unroutable(),
            selector: self.provider.snapshot(),
            schedulers: self
                .schedulers
                .iter()
                .map(|(interface, scheduler)| (interface.to_string(), scheduler.snapshot()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::InterfaceStatus;
    use crate::packet::{DSCP_BE, DSCP_EF};
    use crate::policies::routing::{DefaultRouteProvider, RouteSelector};
    use crate::routing::{RouteEntry, RoutingTable};

    const IF1: InterfaceId = InterfaceId(1);
    const IF2: InterfaceId = InterfaceId(2);

    fn addr(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn create_test_packet(seq: u64, dst: &str, marking: u8) -> Packet {
        Packet::new(seq, addr(dst), marking, 1000)
    }

    fn forwarder(capacity: usize) -> Forwarder {
        let mut registry = InterfaceRegistry::new();
        registry.register(IF1, "net1", InterfaceStatus::Up).unwrap();
        registry.register(IF2, "net3", InterfaceStatus::Up).unwrap();
        let registry = Arc::new(registry);

        let prefix = "10.1.2.0/24".parse().unwrap();
        let table = RoutingTable::from_entries(vec![
            RouteEntry::new(prefix, addr("10.1.1.2"), IF1, 1),
            RouteEntry::new(prefix, addr("10.1.3.2"), IF2, 0),
        ])
        .unwrap();

        Forwarder::new(
            registry,
            Arc::new(TrafficClassifier::pfifo_fast()),
            Box::new(RouteSelector::new(table)),
            3,
            capacity,
        )
        .unwrap()
    }

    #[test]
    fn test_forward_queues_on_primary() {
        let mut fwd = forwarder(10);
        let outcome = fwd.forward(create_test_packet(0, "10.1.2.2", DSCP_EF));
        assert_eq!(
            outcome,
            ForwardOutcome::Queued {
                interface: IF2,
                next_hop: addr("10.1.3.2"),
                band: 0,
            }
        );
        assert_eq!(fwd.scheduler(IF2).unwrap().len(), 1);
        assert_eq!(fwd.total_queued(), 1);
    }

    #[test]
    fn test_forward_fails_over() {
        let mut fwd = forwarder(10);
        fwd.apply_event(InterfaceEvent::down(IF2)).unwrap();

        let outcome = fwd.forward(create_test_packet(0, "10.1.2.2", DSCP_BE));
        assert_eq!(outcome.interface(), Some(IF1));
    }

    #[test]
    fn test_unroutable_without_default_provider() {
        let mut fwd = forwarder(10);
        assert_eq!(
            fwd.forward(create_test_packet(0, "192.168.9.9", DSCP_BE)),
            ForwardOutcome::Unroutable
        );
        assert_eq!(fwd.stats().unroutable(), 1);
    }

    #[test]
    fn test_default_provider_catches_fallback() {
        let mut fwd = forwarder(10).with_default_provider(Box::new(
            DefaultRouteProvider::with_gateway(addr("10.1.1.2"), IF1),
        ));

        let outcome = fwd.forward(create_test_packet(0, "192.168.9.9", DSCP_BE));
        assert_eq!(
            outcome,
            ForwardOutcome::Queued {
                interface: IF1,
                next_hop: addr("10.1.1.2"),
                band: 2,
            }
        );
        assert_eq!(fwd.stats().default_routed(), 1);

        // Gateway down too: nothing left
        fwd.apply_event(InterfaceEvent::down(IF1)).unwrap();
        assert_eq!(
            fwd.forward(create_test_packet(1, "192.168.9.9", DSCP_BE)),
            ForwardOutcome::Unroutable
        );
    }

    #[test]
    fn test_drop_when_full() {
        let mut fwd = forwarder(2);
        assert!(fwd.forward(create_test_packet(0, "10.1.2.2", DSCP_BE)).is_queued());
        assert!(fwd.forward(create_test_packet(1, "10.1.2.2", DSCP_BE)).is_queued());
        assert_eq!(
            fwd.forward(create_test_packet(2, "10.1.2.2", DSCP_EF)),
            ForwardOutcome::Dropped {
                interface: IF2,
                band: 0
            }
        );

        let snapshot = fwd.snapshot();
        assert_eq!(snapshot.forwarded, 2);
        assert_eq!(snapshot.total_dropped(), 1);
        assert_eq!(snapshot.schedulers["if2"].dropped, 1);
    }

    #[test]
    fn test_drain_in_priority_order() {
        let mut fwd = forwarder(10);
        fwd.forward(create_test_packet(0, "10.1.2.2", DSCP_BE));
        fwd.forward(create_test_packet(1, "10.1.2.2", 20));
        fwd.forward(create_test_packet(2, "10.1.2.2", DSCP_EF));

        let drained: Vec<u64> = fwd.drain(IF2, 2).iter().map(|p| p.sequence).collect();
        assert_eq!(drained, vec![2, 1]);
        assert_eq!(fwd.dequeue(IF2).unwrap().sequence, 0);
        assert_eq!(fwd.dequeue(IF2), None);
        assert!(fwd.drain(InterfaceId(9), 5).is_empty());
    }

    #[test]
    fn test_snapshot_includes_selector_counters() {
        let mut fwd = forwarder(10);
        fwd.forward(create_test_packet(0, "10.1.2.2", DSCP_BE));
        fwd.forward(create_test_packet(1, "172.16.0.1", DSCP_BE));

        let selector = fwd.snapshot().selector.unwrap();
        assert_eq!(selector.failover_hits, 1);
        assert_eq!(selector.fallbacks, 1);
    }
}
