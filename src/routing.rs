// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Static routing table with longest-prefix matching
//!
//! Routes are provisioned once and never mutated. Several candidates may
//! share a prefix; which one is used is decided per packet by a
//! [`RouteProvider`](crate::policies::RouteProvider).
//!
//! # Features
//! - Multiple candidates per prefix, ordered by metric then insertion
//! - Optional traffic-class filter per entry (policy routes)
//! - TOML snapshots of the provisioned table

use crate::error::{RoutingError, SteerError};
use crate::interface::{InterfaceId, InterfaceRegistry};
use crate::packet::TrafficClass;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

/// A candidate path to a destination prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Reachable block
    pub destination: Ipv4Network,
    /// Adjacent forwarding element
    pub next_hop: Ipv4Addr,
    /// Interface used to reach `next_hop`
    pub out_interface: InterfaceId,
    /// Lower is preferred
    pub metric: u32,
    /// When set, only packets of this class may use the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_filter: Option<TrafficClass>,
}

impl RouteEntry {
    /// Creates a general-purpose (metric based) route
    pub fn new(
        destination: Ipv4Network,
        next_hop: Ipv4Addr,
        out_interface: InterfaceId,
        metric: u32,
    ) -> Self {
        Self {
            destination,
            next_hop,
            out_interface,
            metric,
            class_filter: None,
        }
    }

    /// Restricts this route to one traffic class
    pub fn with_class(mut self, class: impl Into<TrafficClass>) -> Self {
        self.class_filter = Some(class.into());
        self
    }

    pub fn is_policy(&self) -> bool {
        self.class_filter.is_some()
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} via {} dev {} metric {}",
            self.destination, self.next_hop, self.out_interface, self.metric
        )?;
        if let Some(class) = &self.class_filter {
            write!(f, " class {}", class)?;
        }
        Ok(())
    }
}

/// Clears host bits so `10.1.2.7/24` and `10.1.2.0/24` index the same prefix
fn normalize(prefix: Ipv4Network) -> Ipv4Network {
    Ipv4Network::new(prefix.network(), prefix.prefix()).unwrap_or(prefix)
}

/// Per-node routing table
#[derive(Debug, Clone, Default)]
pub struct RoutingTable {
    /// prefix length -> prefix -> entries in insertion order
    prefixes: BTreeMap<u8, HashMap<Ipv4Network, Vec<RouteEntry>>>,
    len: usize,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from provisioned entries, stopping at the first conflict
    pub fn from_entries(
        entries: impl IntoIterator<Item = RouteEntry>,
    ) -> Result<Self, RoutingError> {
        let mut table = Self::new();
        for entry in entries {
            table.add_route(entry)?;
        }
        Ok(table)
    }

    /// Inserts a route.
    ///
    /// Two entries for the same prefix and class filter may not share a metric.
    pub fn add_route(&mut self, mut entry: RouteEntry) -> Result<(), RoutingError> {
        entry.destination = normalize(entry.destination);

        let entries = self
            .prefixes
            .entry(entry.destination.prefix())
            .or_default()
            .entry(entry.destination)
            .or_default();

        if entries
            .iter()
            .any(|e| e.class_filter == entry.class_filter && e.metric == entry.metric)
        {
            return Err(RoutingError::DuplicateMetric {
                destination: entry.destination,
                class_filter: entry.class_filter,
                metric: entry.metric,
            });
        }

        tracing::debug!("Added route: {}", entry);
        entries.push(entry);
        self.len += 1;
        Ok(())
    }

    /// Returns every entry of the longest prefix containing `destination`,
    /// ordered by ascending metric. Equal metrics keep insertion order.
    pub fn candidates_for(&self, destination: Ipv4Addr) -> Vec<&RouteEntry> {
        self.candidates_where(destination, |_| true)
    }

    /// Longest-prefix match over the entries accepted by `filter`.
    ///
    /// A prefix with no accepted entry is skipped, so a class-only prefix
    /// never hides a shorter general route.
    pub fn candidates_where<F>(&self, destination: Ipv4Addr, filter: F) -> Vec<&RouteEntry>
    where
        F: Fn(&RouteEntry) -> bool,
    {
        for (&len, by_prefix) in self.prefixes.iter().rev() {
            let Ok(key) = Ipv4Network::new(destination, len) else {
                continue;
            };
            let Some(entries) = by_prefix.get(&normalize(key)) else {
                continue;
            };

            let mut candidates: Vec<&RouteEntry> =
                entries.iter().filter(|entry| filter(entry)).collect();
            if candidates.is_empty() {
                continue;
            }
            // Stable sort keeps insertion order among equal metrics
            candidates.sort_by_key(|e| e.metric);
            return candidates;
        }
        Vec::new()
    }

    /// Entries provisioned for exactly this prefix, in insertion order
    pub fn routes_for_prefix(&self, prefix: Ipv4Network) -> &[RouteEntry] {
        let prefix = normalize(prefix);
        self.prefixes
            .get(&prefix.prefix())
            .and_then(|by_prefix| by_prefix.get(&prefix))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All entries, longest prefixes first
    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.prefixes
            .values()
            .rev()
            .flat_map(|by_prefix| by_prefix.values().flatten())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fails on the first entry whose egress interface is not registered
    pub fn check_interfaces(&self, registry: &InterfaceRegistry) -> Result<(), RoutingError> {
        match self.iter().find(|entry| !registry.contains(entry.out_interface)) {
            Some(entry) => Err(RoutingError::UnknownInterface {
                destination: entry.destination,
                interface: entry.out_interface,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<&RouteEntry> = self.iter().collect();
        entries.sort_by(|a, b| {
            b.destination
                .prefix()
                .cmp(&a.destination.prefix())
                .then(a.destination.network().cmp(&b.destination.network()))
                .then(a.metric.cmp(&b.metric))
        });

        writeln!(
            f,
            "{:<20} {:<16} {:<6} {:>6}  Class",
            "Destination", "Gateway", "Iface", "Metric"
        )?;
        for entry in entries {
            writeln!(
                f,
                "{:<20} {:<16} {:<6} {:>6}  {}",
                entry.destination.to_string(),
                entry.next_hop.to_string(),
                entry.out_interface.to_string(),
                entry.metric,
                entry
                    .class_filter
                    .as_ref()
                    .map(TrafficClass::as_str)
                    .unwrap_or("-")
            )?;
        }
        Ok(())
    }
}

/// Snapshot of a provisioned table for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSnapshot {
    /// Version for future compatibility
    pub version: u32,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl RouteSnapshot {
    pub const VERSION: u32 = 1;

    /// Captures the current contents of a table
    pub fn from_table(table: &RoutingTable) -> Self {
        Self {
            version: Self::VERSION,
            routes: table.iter().cloned().collect(),
        }
    }

    /// Rebuilds a table, re-checking metric uniqueness
    pub fn into_table(self) -> Result<RoutingTable, RoutingError> {
        RoutingTable::from_entries(self.routes)
    }

    /// Load snapshot from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, SteerError> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: RouteSnapshot = toml::from_str(&content)?;

        if snapshot.version != Self::VERSION {
            return Err(SteerError::Config(format!(
                "Unsupported route snapshot version {} in {:?}",
                snapshot.version, path
            )));
        }

        Ok(snapshot)
    }

    /// Save snapshot to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SteerError> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        tracing::info!("Saved {} routes to {:?}", self.routes.len(), path);
        Ok(())
    }
}
