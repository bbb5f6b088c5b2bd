// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Pluggable Policies
//!
//! This module provides the policy pieces of the forwarding path:
//! - Traffic classification (marking to band and class)
//! - Route selection
//! - Strict-priority scheduling

pub mod qos;
pub mod routing;
pub mod scheduling;

pub use qos::{ClassRule, TrafficClassifier};
pub use routing::{
    DefaultRouteProvider, Gateway, RouteDecision, RouteProvider, RouteSelector, SelectorConfig,
};
pub use scheduling::{DEFAULT_BANDS, DEFAULT_CAPACITY, PriorityScheduler};
