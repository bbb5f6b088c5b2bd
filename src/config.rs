// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Configuration management for forwarding nodes
//!
//! Supports both command-line arguments and TOML configuration files.
//! Without a file the built-in HQ node of the triangular WAN is used.

use crate::error::{ClassifierError, RoutingError, SteerError};
use crate::forwarder::Forwarder;
use crate::interface::{InterfaceEvent, InterfaceId, InterfaceRegistry, InterfaceStatus};
use crate::packet::{DSCP_BE, DSCP_EF, MAX_MARKING, TrafficClass};
use crate::policies::qos::{ClassRule, TrafficClassifier};
use crate::policies::routing::{DefaultRouteProvider, Gateway, RouteSelector, SelectorConfig};
use crate::policies::scheduling::{DEFAULT_BANDS, DEFAULT_CAPACITY};
use crate::routing::{RouteEntry, RoutingTable};
use clap::Parser;
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Built-in node used when no configuration file is given
const HQ_NODE: &str = include_str!("../config/hq.toml");

/// Scripted scenario run by the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// One probe per second per traffic profile, link events applied on schedule
    Failover,
    /// Offered load against a rate-limited egress link
    Qos,
    /// Both, each on a freshly built node
    All,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scenario::Failover => write!(f, "failover"),
            Scenario::Qos => write!(f, "qos"),
            Scenario::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "failover" => Ok(Scenario::Failover),
            "qos" => Ok(Scenario::Qos),
            "all" => Ok(Scenario::All),
            _ => Err(format!(
                "Invalid scenario: {}. Use 'failover', 'qos', or 'all'",
                s
            )),
        }
    }
}

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "steer")]
#[command(author = "Steer Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Policy and failover forwarding node", long_about = None)]
pub struct CliArgs {
    /// Path to TOML node configuration (defaults to the built-in HQ node)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Scenario to run: failover, qos, or all
    #[arg(long, value_name = "SCENARIO", default_value = "all")]
    pub scenario: Scenario,

    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip policy routes whose interface is down
    #[arg(long)]
    pub health_check_policy: bool,

    /// Write the provisioned routing table to this file
    #[arg(long, value_name = "FILE")]
    pub save_routes: Option<PathBuf>,
}

/// `[node]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSection {
    pub name: String,
    /// Length of a scripted scenario
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
}

fn default_duration_ms() -> u64 {
    10_000
}

/// `[[interfaces]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub id: InterfaceId,
    pub name: String,
    #[serde(default)]
    pub status: InterfaceStatus,
}

/// `[[routes]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub destination: Ipv4Network,
    pub next_hop: Ipv4Addr,
    pub interface: InterfaceId,
    #[serde(default)]
    pub metric: u32,
    /// Restricts the route to one traffic class
    #[serde(default)]
    pub class: Option<TrafficClass>,
}

impl From<&RouteConfig> for RouteEntry {
    fn from(route: &RouteConfig) -> Self {
        RouteEntry {
            destination: route.destination,
            next_hop: route.next_hop,
            out_interface: route.interface,
            metric: route.metric,
            class_filter: route.class.clone(),
        }
    }
}

/// `[classifier]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_class_rules")]
    pub rules: Vec<ClassRule>,
    #[serde(default = "default_band")]
    pub default_band: usize,
}

fn default_class_rules() -> Vec<ClassRule> {
    vec![
        ClassRule::new(DSCP_EF, DSCP_EF, 0).with_class("video"),
        ClassRule::new(DSCP_BE, DSCP_BE, 2).with_class("data"),
    ]
}

fn default_band() -> usize {
    1
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rules: default_class_rules(),
            default_band: default_band(),
        }
    }
}

/// `[scheduler]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_bands")]
    pub bands: usize,
    /// Packets held across all bands of one interface
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Egress link rate used by the qos scenario
    #[serde(default = "default_link_rate_bps")]
    pub link_rate_bps: u64,
}

fn default_bands() -> usize {
    DEFAULT_BANDS
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_link_rate_bps() -> u64 {
    5_000_000 // 5 Mbps bottleneck
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
            capacity: default_capacity(),
            link_rate_bps: default_link_rate_bps(),
        }
    }
}

/// On/off traffic source description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficProfile {
    pub name: String,
    pub destination: Ipv4Addr,
    pub data_rate_bps: u64,
    pub packet_size: usize,
    /// DSCP marking applied to every packet
    #[serde(default)]
    pub marking: u8,
    #[serde(default = "default_on_time_ms")]
    pub on_time_ms: u64,
    #[serde(default)]
    pub off_time_ms: u64,
}

fn default_on_time_ms() -> u64 {
    1000
}

impl TrafficProfile {
    /// Creates an always-on profile
    pub fn new(
        name: impl Into<String>,
        destination: Ipv4Addr,
        data_rate_bps: u64,
        packet_size: usize,
        marking: u8,
    ) -> Result<Self, SteerError> {
        let profile = Self {
            name: name.into(),
            destination,
            data_rate_bps,
            packet_size,
            marking,
            on_time_ms: default_on_time_ms(),
            off_time_ms: 0,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Sets the on/off cycle
    pub fn with_cycle(mut self, on_time_ms: u64, off_time_ms: u64) -> Result<Self, SteerError> {
        self.on_time_ms = on_time_ms;
        self.off_time_ms = off_time_ms;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), SteerError> {
        if self.packet_size == 0 {
            return Err(format!("Traffic '{}': packet_size must be non-zero", self.name).into());
        }
        if self.data_rate_bps == 0 {
            return Err(format!("Traffic '{}': data_rate_bps must be non-zero", self.name).into());
        }
        if self.marking > MAX_MARKING {
            return Err(format!(
                "Traffic '{}': marking {} exceeds {}",
                self.name, self.marking, MAX_MARKING
            )
            .into());
        }
        if self.on_time_ms == 0 {
            return Err(format!("Traffic '{}': on_time_ms must be non-zero", self.name).into());
        }
        Ok(())
    }

    /// Offered packet rate while the source is on
    pub fn packets_per_second(&self) -> f64 {
        self.data_rate_bps as f64 / (self.packet_size * 8) as f64
    }

    /// Whether the source is in its on period `elapsed_ms` after start
    pub fn is_active(&self, elapsed_ms: u64) -> bool {
        elapsed_ms % (self.on_time_ms + self.off_time_ms) < self.on_time_ms
    }
}

/// `[[events]]` entry: a scheduled link state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEventConfig {
    pub at_ms: u64,
    pub interface: InterfaceId,
    pub status: InterfaceStatus,
}

impl LinkEventConfig {
    pub fn event(&self) -> InterfaceEvent {
        InterfaceEvent {
            interface: self.interface,
            status: self.status,
        }
    }
}

/// TOML node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSection,
    #[serde(default)]
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    /// Gateway consulted when no route survives selection
    #[serde(default)]
    pub default_route: Option<Gateway>,
    #[serde(default)]
    pub traffic: Vec<TrafficProfile>,
    #[serde(default)]
    pub events: Vec<LinkEventConfig>,
}

impl NodeConfig {
    /// The HQ router of the triangular WAN.
    ///
    /// if1 (net1) reaches the branch at 10.1.1.2, if2 (net3) reaches the data
    /// centre directly at 10.1.3.2. The direct link goes down after 4 s.
    pub fn hq() -> Result<Self, SteerError> {
        Self::from_toml_str(HQ_NODE)
    }

    /// Creates configuration from command-line arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, SteerError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::hq()?,
        };

        if args.health_check_policy {
            config.selector.health_check_policy_routes = true;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SteerError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SteerError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, SteerError> {
        Ok(toml::from_str(contents)?)
    }

    /// Checks cross references the individual components cannot see
    pub fn validate(&self) -> Result<(), SteerError> {
        if self.interfaces.is_empty() {
            return Err("At least one interface is required".into());
        }

        let mut ids = BTreeSet::new();
        for interface in &self.interfaces {
            if !ids.insert(interface.id) {
                return Err(format!("Duplicate interface id {}", interface.id).into());
            }
        }

        for route in &self.routes {
            if !ids.contains(&route.interface) {
                return Err(RoutingError::UnknownInterface {
                    destination: route.destination,
                    interface: route.interface,
                }
                .into());
            }
        }

        if let Some(gateway) = &self.default_route
            && !ids.contains(&gateway.interface)
        {
            return Err(format!(
                "Default route uses unknown interface {}",
                gateway.interface
            )
            .into());
        }

        for event in &self.events {
            if !ids.contains(&event.interface) {
                return Err(format!(
                    "Event at {} ms uses unknown interface {}",
                    event.at_ms, event.interface
                )
                .into());
            }
        }

        if self.scheduler.link_rate_bps == 0 {
            return Err("scheduler.link_rate_bps must be non-zero".into());
        }

        for profile in &self.traffic {
            profile.validate()?;
        }

        Ok(())
    }

    pub fn routing_table(&self) -> Result<RoutingTable, RoutingError> {
        RoutingTable::from_entries(self.routes.iter().map(RouteEntry::from))
    }

    pub fn classifier(&self) -> Result<TrafficClassifier, ClassifierError> {
        TrafficClassifier::new(
            self.classifier.rules.clone(),
            self.classifier.default_band,
        )
    }

    pub fn registry(&self) -> Result<InterfaceRegistry, SteerError> {
        let mut registry = InterfaceRegistry::new();
        for interface in &self.interfaces {
            registry.register(interface.id, interface.name.clone(), interface.status)?;
        }
        Ok(registry)
    }

    /// Provisions a forwarder. Any configuration error aborts construction.
    pub fn build(&self) -> Result<Forwarder, SteerError> {
        self.validate()?;

        let registry = Arc::new(self.registry()?);
        let table = self.routing_table()?;
        table.check_interfaces(&registry)?;
        let classifier = Arc::new(self.classifier()?);
        let selector = RouteSelector::with_config(table, self.selector.clone());

        let forwarder = Forwarder::new(
            registry,
            classifier,
            Box::new(selector),
            self.scheduler.bands,
            self.scheduler.capacity,
        )?;

        Ok(match self.default_route {
            Some(gateway) => forwarder.with_default_provider(Box::new(
                DefaultRouteProvider::with_gateway(gateway.next_hop, gateway.interface),
            )),
            None => forwarder,
        })
    }

    /// Prints configuration summary
    pub fn print_summary(&self) {
        println!("=== Node Configuration ===");
        println!("Name: {}", self.node.name);
        for interface in &self.interfaces {
            println!(
                "Interface {} ({}): {}",
                interface.id, interface.name, interface.status
            );
        }
        println!(
            "Scheduler: {} bands, {} packets, {} bps",
            self.scheduler.bands, self.scheduler.capacity, self.scheduler.link_rate_bps
        );
        println!(
            "Policy health check: {}",
            self.selector.health_check_policy_routes
        );
        if let Some(gateway) = &self.default_route {
            println!("Default route: via {} dev {}", gateway.next_hop, gateway.interface);
        }
        for profile in &self.traffic {
            println!(
                "Traffic {}: {} bps to {} ({} bytes, dscp {}, {:.1} pps)",
                profile.name,
                profile.data_rate_bps,
                profile.destination,
                profile.packet_size,
                profile.marking,
                profile.packets_per_second()
            );
        }
        println!();
    }
}
