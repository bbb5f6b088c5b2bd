// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! The core library for steer.
//!
//! A forwarding node that picks an egress path per packet from statically
//! provisioned candidates, either by traffic-class policy or by metric and
//! link health, and queues it on a strict-priority multi-band scheduler.

// Public module declarations
pub mod actors;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod interface;
pub mod packet;
pub mod policies;
pub mod routing;
pub mod scenario;
pub mod stats;

// Re-export commonly used types
pub use actors::{ActorHandle, ForwarderActor, ForwarderHandle, ForwarderMessage};
pub use config::{CliArgs, NodeConfig, Scenario, TrafficProfile};
pub use error::{
    ClassifierError, InterfaceError, RoutingError, SchedulerError, SteerError,
};
pub use forwarder::{ForwardOutcome, Forwarder};
pub use interface::{InterfaceEvent, InterfaceId, InterfaceRegistry, InterfaceStatus};
pub use packet::{DSCP_BE, DSCP_EF, Packet, TrafficClass};
pub use policies::{
    ClassRule, DEFAULT_BANDS, DEFAULT_CAPACITY, DefaultRouteProvider, Gateway, PriorityScheduler,
    RouteDecision, RouteProvider, RouteSelector, SelectorConfig, TrafficClassifier,
};
pub use routing::{RouteEntry, RouteSnapshot, RoutingTable};
pub use scenario::{FailoverReport, FlowReport, ProbeRecord, QosReport, run_failover, run_qos};
pub use stats::{SchedulerSnapshot, SelectorSnapshot, StatsSnapshot};
