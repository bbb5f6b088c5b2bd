// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Route Selection Policies
//!
//! Pluggable route providers. [`RouteSelector`] implements the two-tier
//! decision: class policy routes first, then the lowest-metric general
//! route whose interface is up. [`DefaultRouteProvider`] is the
//! last-resort gateway consulted when the selector falls back.

use crate::interface::{InterfaceId, InterfaceRegistry};
use crate::packet::TrafficClass;
use crate::routing::{RouteEntry, RoutingTable};
use crate::stats::{SelectorSnapshot, SelectorStats};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Outcome of a route selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Use this route
    Forward(RouteEntry),
    /// Nothing usable here; hand the packet to the default-routing path
    Fallback,
}

impl RouteDecision {
    pub fn route(&self) -> Option<&RouteEntry> {
        match self {
            RouteDecision::Forward(entry) => Some(entry),
            RouteDecision::Fallback => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RouteDecision::Fallback)
    }
}

/// Trait for route providers
pub trait RouteProvider: Send + Sync {
    /// Picks a route for a destination and optional traffic class
    fn select(
        &self,
        destination: Ipv4Addr,
        traffic_class: Option<&TrafficClass>,
        registry: &InterfaceRegistry,
    ) -> RouteDecision;

    /// Returns the provider name
    fn name(&self) -> &str;

    /// Selection counters, for providers that keep them
    fn snapshot(&self) -> Option<SelectorSnapshot> {
        None
    }
}

/// Selector behaviour switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Also discard policy routes whose interface is down
    #[serde(default)]
    pub health_check_policy_routes: bool,
}

/// Policy-then-failover route selector over a static table
#[derive(Debug)]
pub struct RouteSelector {
    table: RoutingTable,
    config: SelectorConfig,
    stats: Arc<SelectorStats>,
}

impl RouteSelector {
    pub fn new(table: RoutingTable) -> Self {
        Self::with_config(table, SelectorConfig::default())
    }

    pub fn with_config(table: RoutingTable, config: SelectorConfig) -> Self {
        Self {
            table,
            config,
            stats: Arc::new(SelectorStats::default()),
        }
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<SelectorStats> {
        Arc::clone(&self.stats)
    }

    /// Policy tier: longest match among entries restricted to this class
    fn select_policy(
        &self,
        destination: Ipv4Addr,
        class: &TrafficClass,
        registry: &InterfaceRegistry,
    ) -> Option<&RouteEntry> {
        self.table
            .candidates_where(destination, |entry| entry.class_filter.as_ref() == Some(class))
            .into_iter()
            .find(|entry| {
                !self.config.health_check_policy_routes || registry.is_up(entry.out_interface)
            })
    }

    /// Failover tier: longest match among general entries, first one up
    fn select_failover(
        &self,
        destination: Ipv4Addr,
        registry: &InterfaceRegistry,
    ) -> Option<&RouteEntry> {
        self.table
            .candidates_where(destination, |entry| !entry.is_policy())
            .into_iter()
            .find(|entry| registry.is_up(entry.out_interface))
    }
}

impl RouteProvider for RouteSelector {
    fn select(
        &self,
        destination: Ipv4Addr,
        traffic_class: Option<&TrafficClass>,
        registry: &InterfaceRegistry,
    ) -> RouteDecision {
        if let Some(class) = traffic_class
            && let Some(entry) = self.select_policy(destination, class, registry)
        {
            self.stats.increment_policy_hits();
            return RouteDecision::Forward(entry.clone());
        }

        if let Some(entry) = self.select_failover(destination, registry) {
            self.stats.increment_failover_hits();
            return RouteDecision::Forward(entry.clone());
        }

        self.stats.increment_fallbacks();
        RouteDecision::Fallback
    }

    fn name(&self) -> &str {
        "PolicyFailover"
    }

    fn snapshot(&self) -> Option<SelectorSnapshot> {
        Some(self.stats.snapshot())
    }
}

/// Default gateway: next hop and the interface that reaches it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub next_hop: Ipv4Addr,
    pub interface: InterfaceId,
}

/// Last-resort provider holding a single gateway
#[derive(Debug, Clone, Default)]
pub struct DefaultRouteProvider {
    gateway: Option<Gateway>,
}

impl DefaultRouteProvider {
    /// A provider that always falls back (no gateway configured)
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider sending everything to `next_hop` over `interface`
    pub fn with_gateway(next_hop: Ipv4Addr, interface: InterfaceId) -> Self {
        Self {
            gateway: Some(Gateway {
                next_hop,
                interface,
            }),
        }
    }

    pub fn gateway(&self) -> Option<Gateway> {
        self.gateway
    }
}

impl RouteProvider for DefaultRouteProvider {
    fn select(
        &self,
        destination: Ipv4Addr,
        _traffic_class: Option<&TrafficClass>,
        registry: &InterfaceRegistry,
    ) -> RouteDecision {
        match self.gateway {
            Some(gateway) if registry.is_up(gateway.interface) => {
                // Host route for this destination through the gateway
                RouteDecision::Forward(RouteEntry::new(
                    Ipv4Network::from(destination),
                    gateway.next_hop,
                    gateway.interface,
                    0,
                ))
            }
            _ => RouteDecision::Fallback,
        }
    }

    fn name(&self) -> &str {
        "DefaultGateway"
    }
}
