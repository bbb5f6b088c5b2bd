// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Packet definitions
//!
//! The forwarding core never looks at payloads. A packet is described by
//! its destination, its DSCP marking and its size.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Expedited Forwarding (voice/video)
pub const DSCP_EF: u8 = 46;
/// Best Effort / default
pub const DSCP_BE: u8 = 0;
/// Largest value a 6-bit DSCP field can carry
pub const MAX_MARKING: u8 = 63;

/// Extracts the DSCP from an IPv4 ToS byte (upper six bits).
pub fn dscp_from_tos(tos: u8) -> u8 {
    tos >> 2
}

/// A packet as seen by the forwarding core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Caller-assigned identifier, used to trace ordering
    pub sequence: u64,
    /// Destination address
    pub destination: Ipv4Addr,
    /// DSCP marking (0-63)
    pub marking: u8,
    /// Size in bytes
    pub size: usize,
}

impl Packet {
    /// Creates a new packet with an explicit DSCP marking
    pub fn new(sequence: u64, destination: Ipv4Addr, marking: u8, size: usize) -> Self {
        Self {
            sequence,
            destination,
            marking,
            size,
        }
    }

    /// Creates a new packet from an IPv4 ToS byte
    pub fn from_tos(sequence: u64, destination: Ipv4Addr, tos: u8, size: usize) -> Self {
        Self::new(sequence, destination, dscp_from_tos(tos), size)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} -> {} (dscp {}, {} bytes)",
            self.sequence, self.destination, self.marking, self.size
        )
    }
}

/// Traffic-class label attached to classifier rules and policy routes
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficClass(String);

impl TrafficClass {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrafficClass {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}
