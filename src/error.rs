// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Error types for steer
//!
//! Configuration errors (duplicate metrics, overlapping classifier rules,
//! unknown interfaces) are fatal to the configuration they occur in.
//! `QueueFull` is an ordinary operational outcome and is counted, not logged.

use crate::interface::InterfaceId;
use crate::packet::TrafficClass;
use ipnetwork::Ipv4Network;
use thiserror::Error;

/// Main error type for steer operations
#[derive(Error, Debug)]
pub enum SteerError {
    #[error("Interface error: {0}")]
    Interface(#[from] InterfaceError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Actor channel closed")]
    ChannelClosed,
}

/// Interface registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("Unknown interface: {0}")]
    UnknownInterface(InterfaceId),

    #[error("Interface already registered: {0}")]
    AlreadyRegistered(InterfaceId),
}

/// Routing table errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("Duplicate metric {metric} for {destination} (class: {})", display_class(.class_filter))]
    DuplicateMetric {
        destination: Ipv4Network,
        class_filter: Option<TrafficClass>,
        metric: u32,
    },

    #[error("Route to {destination} uses unknown interface {interface}")]
    UnknownInterface {
        destination: Ipv4Network,
        interface: InterfaceId,
    },
}

fn display_class(class: &Option<TrafficClass>) -> String {
    class
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "any".to_string())
}

fn display_range(range: &(u8, u8)) -> String {
    format!("[{}, {}]", range.0, range.1)
}

/// Traffic classifier errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("Class rule {} overlaps {}", display_range(.first), display_range(.second))]
    OverlappingClassRule { first: (u8, u8), second: (u8, u8) },

    #[error("Invalid marking range [{low}, {high}]")]
    InvalidRange { low: u8, high: u8 },

    #[error("Band {band} out of range for a scheduler with {bands} bands")]
    BandOutOfRange { band: usize, bands: usize },
}

/// Priority scheduler errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Queue full (band {band}, capacity {capacity})")]
    QueueFull { band: usize, capacity: usize },

    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

impl From<String> for SteerError {
    fn from(s: String) -> Self {
        SteerError::Config(s)
    }
}

impl From<&str> for SteerError {
    fn from(s: &str) -> Self {
        SteerError::Config(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_metric_message() {
        let err = RoutingError::DuplicateMetric {
            destination: "10.1.2.0/24".parse().unwrap(),
            class_filter: None,
            metric: 0,
        };
        assert_eq!(
            err.to_string(),
            "Duplicate metric 0 for 10.1.2.0/24 (class: any)"
        );
    }

    #[test]
    fn test_component_errors_fold_into_steer_error() {
        let err: SteerError = InterfaceError::UnknownInterface(InterfaceId(7)).into();
        assert!(matches!(
            err,
            SteerError::Interface(InterfaceError::UnknownInterface(InterfaceId(7)))
        ));
        assert!(err.to_string().contains("if7"));
    }
}
