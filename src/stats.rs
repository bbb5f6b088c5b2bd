// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Counters exposed to observers.
//!
//! The forwarding core never reports anything itself; it bumps these and
//! whoever holds an `Arc` to them can read or snapshot them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Route selection counters
#[derive(Debug, Default)]
pub struct SelectorStats {
    /// Selections satisfied by a class policy route
    policy_hits: AtomicU64,
    /// Selections satisfied by the metric/health tier
    failover_hits: AtomicU64,
    /// Selections that signalled "use default route"
    fallbacks: AtomicU64,
}

impl SelectorStats {
    #[inline]
    pub(crate) fn increment_policy_hits(&self) {
        self.policy_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_failover_hits(&self) {
        self.failover_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_fallbacks(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn policy_hits(&self) -> u64 {
        self.policy_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failover_hits(&self) -> u64 {
        self.failover_hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SelectorSnapshot {
        SelectorSnapshot {
            policy_hits: self.policy_hits(),
            failover_hits: self.failover_hits(),
            fallbacks: self.fallbacks(),
        }
    }
}

/// Per-scheduler queueing counters
#[derive(Debug, Default)]
pub struct SchedulerStats {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    /// Tail drops
    dropped: AtomicU64,
    dropped_bytes: AtomicU64,
}

impl SchedulerStats {
    #[inline]
    pub(crate) fn increment_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_dropped(&self, bytes: usize) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        self.dropped_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_bytes(&self) -> u64 {
        self.dropped_bytes.load(Ordering::Relaxed)
    }
}

/// Forwarding path counters
#[derive(Debug, Default)]
pub struct ForwarderStats {
    forwarded: AtomicU64,
    /// Packets routed by the default-route provider
    default_routed: AtomicU64,
    /// Packets neither provider could place
    unroutable: AtomicU64,
}

impl ForwarderStats {
    #[inline]
    pub(crate) fn increment_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_default_routed(&self) {
        self.default_routed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_unroutable(&self) {
        self.unroutable.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn default_routed(&self) -> u64 {
        self.default_routed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn unroutable(&self) -> u64 {
        self.unroutable.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorSnapshot {
    pub policy_hits: u64,
    pub failover_hits: u64,
    pub fallbacks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerSnapshot {
    pub queued: usize,
    pub band_occupancy: Vec<usize>,
    pub enqueued: u64,
    pub dequeued: u64,
    pub dropped: u64,
    pub dropped_bytes: u64,
}

/// Point-in-time view of every counter on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub forwarded: u64,
    pub default_routed: u64,
    pub unroutable: u64,
    pub selector: Option<SelectorSnapshot>,
    /// Keyed by interface display name (`if<N>`)
    pub schedulers: BTreeMap<String, SchedulerSnapshot>,
}

impl StatsSnapshot {
    pub fn total_dropped(&self) -> u64 {
        self.schedulers.values().map(|s| s.dropped).sum()
    }
}
