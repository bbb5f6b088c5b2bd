// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Integration test: metric failover and class policy routing

use std::net::Ipv4Addr;
use std::sync::Arc;
use steer::{
    DSCP_BE, DSCP_EF, DefaultRouteProvider, ForwardOutcome, Forwarder, ForwarderActor,
    InterfaceEvent, InterfaceId, InterfaceRegistry, InterfaceStatus, Packet, RouteEntry,
    RouteProvider, RouteSelector, RoutingTable, TrafficClass, TrafficClassifier,
};

const IF1: InterfaceId = InterfaceId(1);
const IF2: InterfaceId = InterfaceId(2);

fn addr(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

fn registry() -> Arc<InterfaceRegistry> {
    let mut registry = InterfaceRegistry::new();
    registry.register(IF1, "net1", InterfaceStatus::Up).unwrap();
    registry.register(IF2, "net3", InterfaceStatus::Up).unwrap();
    Arc::new(registry)
}

/// Entry A: via 10.1.1.2 on if1 metric 1. Entry B: via 10.1.3.2 on if2 metric 0.
fn table() -> RoutingTable {
    let prefix = "10.1.2.0/24".parse().unwrap();
    RoutingTable::from_entries(vec![
        RouteEntry::new(prefix, addr("10.1.1.2"), IF1, 1),
        RouteEntry::new(prefix, addr("10.1.3.2"), IF2, 0),
    ])
    .unwrap()
}

#[test]
fn test_link_failure_and_recovery() {
    println!("\n=== Failover: 10.1.2.0/24 with primary and backup ===\n");

    let registry = registry();
    let selector = RouteSelector::new(table());
    let dst = addr("10.1.2.2");
    let next_hop = || {
        selector
            .select(dst, None, &registry)
            .route()
            .map(|entry| entry.next_hop)
    };

    println!("1. Both links up");
    assert_eq!(next_hop(), Some(addr("10.1.3.2")));

    println!("2. if2 down -> backup");
    registry.apply(InterfaceEvent::down(IF2)).unwrap();
    assert_eq!(next_hop(), Some(addr("10.1.1.2")));

    println!("3. if1 down too -> fallback");
    registry.apply(InterfaceEvent::down(IF1)).unwrap();
    assert!(selector.select(dst, None, &registry).is_fallback());

    println!("4. if2 back up -> primary on the very next call");
    registry.apply(InterfaceEvent::up(IF2)).unwrap();
    assert_eq!(next_hop(), Some(addr("10.1.3.2")));

    println!("\n✓ Failover and recovery verified\n");
}

#[test]
fn test_policy_route_wins_under_any_link_state() {
    let prefix = "10.1.2.0/24".parse().unwrap();
    let mut table = table();
    table
        .add_route(RouteEntry::new(prefix, addr("10.1.2.1"), IF1, 7).with_class("video"))
        .unwrap();
    let selector = RouteSelector::new(table);
    let video = TrafficClass::from("video");
    let registry = registry();

    let states = [
        (InterfaceStatus::Up, InterfaceStatus::Up),
        (InterfaceStatus::Up, InterfaceStatus::Down),
        (InterfaceStatus::Down, InterfaceStatus::Up),
        (InterfaceStatus::Down, InterfaceStatus::Down),
    ];
    for (if1, if2) in states {
        registry.set_status(IF1, if1).unwrap();
        registry.set_status(IF2, if2).unwrap();
        let decision = selector.select(addr("10.1.2.2"), Some(&video), &registry);
        assert_eq!(
            decision.route().map(|entry| entry.next_hop),
            Some(addr("10.1.2.1")),
            "if1 {}, if2 {}",
            if1,
            if2
        );
    }
}

#[test]
fn test_forwarder_hands_fallback_to_default_gateway() {
    let registry = registry();
    let mut forwarder = Forwarder::new(
        Arc::clone(&registry),
        Arc::new(TrafficClassifier::pfifo_fast()),
        Box::new(RouteSelector::new(table())),
        3,
        100,
    )
    .unwrap()
    .with_default_provider(Box::new(DefaultRouteProvider::with_gateway(
        addr("10.1.1.2"),
        IF1,
    )));

    // Off-table destination
    let outcome = forwarder.forward(Packet::new(0, addr("192.0.2.1"), DSCP_BE, 64));
    assert_eq!(
        outcome,
        ForwardOutcome::Queued {
            interface: IF1,
            next_hop: addr("10.1.1.2"),
            band: 2,
        }
    );

    // Everything down: nothing is left
    registry.apply(InterfaceEvent::down(IF1)).unwrap();
    registry.apply(InterfaceEvent::down(IF2)).unwrap();
    assert_eq!(
        forwarder.forward(Packet::new(1, addr("10.1.2.2"), DSCP_EF, 64)),
        ForwardOutcome::Unroutable
    );

    let snapshot = forwarder.snapshot();
    assert_eq!(snapshot.default_routed, 1);
    assert_eq!(snapshot.unroutable, 1);
    assert_eq!(snapshot.selector.unwrap().fallbacks, 2);
}

#[tokio::test]
async fn test_actor_keeps_events_and_packets_in_order() {
    println!("\n=== Failover through the forwarder actor ===\n");

    let forwarder = Forwarder::new(
        registry(),
        Arc::new(TrafficClassifier::pfifo_fast()),
        Box::new(RouteSelector::new(table())),
        3,
        100,
    )
    .unwrap();
    let handle = ForwarderActor::spawn(forwarder, 32);

    let mut paths = Vec::new();
    for seq in 0..6u64 {
        if seq == 2 {
            handle.apply_event(InterfaceEvent::down(IF2)).await.unwrap();
        }
        if seq == 4 {
            handle.apply_event(InterfaceEvent::up(IF2)).await.unwrap();
        }
        let outcome = handle
            .forward(Packet::new(seq, addr("10.1.2.2"), DSCP_BE, 1024))
            .await
            .unwrap();
        println!("  packet {} -> {:?}", seq, outcome.interface());
        paths.push(outcome.interface());
    }

    assert_eq!(
        paths,
        vec![Some(IF2), Some(IF2), Some(IF1), Some(IF1), Some(IF2), Some(IF2)]
    );

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.schedulers["if1"].queued, 2);
    assert_eq!(snapshot.schedulers["if2"].queued, 4);

    println!("\n✓ Actor ordering verified\n");
}
