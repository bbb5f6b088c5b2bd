// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Interface Registry
//!
//! Tracks the administrative state of every interface on a node. Status
//! changes come in as explicit events from whatever watches the links;
//! the registry itself has no notion of time.

use crate::error::InterfaceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Opaque interface handle, unique per node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(pub u32);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Administrative state of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceStatus {
    #[default]
    Up,
    Down,
}

impl fmt::Display for InterfaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceStatus::Up => write!(f, "up"),
            InterfaceStatus::Down => write!(f, "down"),
        }
    }
}

/// A link failure or recovery signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceEvent {
    pub interface: InterfaceId,
    pub status: InterfaceStatus,
}

impl InterfaceEvent {
    pub fn up(interface: InterfaceId) -> Self {
        Self {
            interface,
            status: InterfaceStatus::Up,
        }
    }

    pub fn down(interface: InterfaceId) -> Self {
        Self {
            interface,
            status: InterfaceStatus::Down,
        }
    }
}

#[derive(Debug)]
struct InterfaceState {
    name: String,
    up: AtomicBool,
}

impl InterfaceState {
    fn status(&self) -> InterfaceStatus {
        if self.up.load(Ordering::SeqCst) {
            InterfaceStatus::Up
        } else {
            InterfaceStatus::Down
        }
    }
}

/// Per-node interface state.
///
/// The set of interfaces is fixed once provisioning ends. Each interface
/// carries its own atomic status, so a link event on one never contends
/// with reads of another.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: BTreeMap<InterfaceId, InterfaceState>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interface at provisioning time
    pub fn register(
        &mut self,
        id: InterfaceId,
        name: impl Into<String>,
        status: InterfaceStatus,
    ) -> Result<(), InterfaceError> {
        if self.interfaces.contains_key(&id) {
            return Err(InterfaceError::AlreadyRegistered(id));
        }
        let name = name.into();
        tracing::info!("Registered interface {} ({}) as {}", id, name, status);
        self.interfaces.insert(
            id,
            InterfaceState {
                name,
                up: AtomicBool::new(status == InterfaceStatus::Up),
            },
        );
        Ok(())
    }

    /// Records an administrative state change.
    ///
    /// Idempotent; returns `true` when the status actually changed.
    pub fn set_status(
        &self,
        id: InterfaceId,
        status: InterfaceStatus,
    ) -> Result<bool, InterfaceError> {
        let state = self
            .interfaces
            .get(&id)
            .ok_or(InterfaceError::UnknownInterface(id))?;

        let was_up = state.up.swap(status == InterfaceStatus::Up, Ordering::SeqCst);
        if was_up == (status == InterfaceStatus::Up) {
            return Ok(false);
        }

        tracing::info!("Interface {} ({}) -> {}", id, state.name, status);
        Ok(true)
    }

    /// Applies a status event
    pub fn apply(&self, event: InterfaceEvent) -> Result<bool, InterfaceError> {
        self.set_status(event.interface, event.status)
    }

    /// Unregistered interfaces read as down
    pub fn is_up(&self, id: InterfaceId) -> bool {
        self.status(id) == Some(InterfaceStatus::Up)
    }

    pub fn status(&self, id: InterfaceId) -> Option<InterfaceStatus> {
        self.interfaces.get(&id).map(InterfaceState::status)
    }

    pub fn name(&self, id: InterfaceId) -> Option<&str> {
        self.interfaces.get(&id).map(|state| state.name.as_str())
    }

    pub fn contains(&self, id: InterfaceId) -> bool {
        self.interfaces.contains_key(&id)
    }

    /// All registered interface ids, in ascending order
    pub fn interfaces(&self) -> Vec<InterfaceId> {
        self.interfaces.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
