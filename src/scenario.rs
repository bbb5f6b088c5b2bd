// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Scripted scenarios
//!
//! Both scenarios build a fresh node from a [`NodeConfig`], run it behind a
//! [`ForwarderActor`] and step a millisecond clock. Link events from the
//! configuration are applied when the clock reaches them.

use crate::actors::{ForwarderActor, ForwarderHandle};
use crate::config::{LinkEventConfig, NodeConfig};
use crate::error::SteerError;
use crate::forwarder::ForwardOutcome;
use crate::interface::InterfaceRegistry;
use crate::packet::Packet;
use crate::stats::StatsSnapshot;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Interval between failover probes
pub const PROBE_INTERVAL_MS: u64 = 1000;

const ACTOR_BUFFER: usize = 64;

/// Applies configured link events in time order
struct EventScript {
    events: Vec<LinkEventConfig>,
    next: usize,
}

impl EventScript {
    fn new(events: &[LinkEventConfig]) -> Self {
        let mut events = events.to_vec();
        events.sort_by_key(|event| event.at_ms);
        Self { events, next: 0 }
    }

    async fn apply_due(&mut self, handle: &ForwarderHandle, now_ms: u64) -> Result<(), SteerError> {
        while let Some(event) = self.events.get(self.next)
            && event.at_ms <= now_ms
        {
            tracing::info!(
                "t={} ms: {} {}",
                now_ms,
                event.interface,
                event.status
            );
            handle.apply_event(event.event()).await?;
            self.next += 1;
        }
        Ok(())
    }
}

fn spawn_node(
    config: &NodeConfig,
) -> Result<(ForwarderHandle, Arc<InterfaceRegistry>), SteerError> {
    let forwarder = config.build()?;
    let registry = forwarder.registry();
    Ok((ForwarderActor::spawn(forwarder, ACTOR_BUFFER), registry))
}

/// One failover probe and what the node did with it
#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    pub at_ms: u64,
    pub profile: String,
    pub sequence: u64,
    #[serde(flatten)]
    pub outcome: ForwardOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailoverReport {
    pub probes: Vec<ProbeRecord>,
    pub stats: StatsSnapshot,
}

/// Sends one probe per active traffic profile every second and records the
/// path each one took. Queues on up interfaces are flushed after every round;
/// down interfaces keep what they hold.
pub async fn run_failover(config: &NodeConfig) -> Result<FailoverReport, SteerError> {
    let (handle, registry) = spawn_node(config)?;
    let mut script = EventScript::new(&config.events);
    let mut probes = Vec::new();
    let mut sequence = 0;

    for at_ms in (0..config.node.duration_ms).step_by(PROBE_INTERVAL_MS as usize) {
        script.apply_due(&handle, at_ms).await?;

        for profile in config.traffic.iter().filter(|p| p.is_active(at_ms)) {
            let packet = Packet::new(
                sequence,
                profile.destination,
                profile.marking,
                profile.packet_size,
            );
            let outcome = handle.forward(packet).await?;
            probes.push(ProbeRecord {
                at_ms,
                profile: profile.name.clone(),
                sequence,
                outcome,
            });
            sequence += 1;
        }

        for interface in config.interfaces.iter().filter(|i| registry.is_up(i.id)) {
            handle.drain(interface.id, usize::MAX).await?;
        }
    }

    Ok(FailoverReport {
        probes,
        stats: handle.snapshot().await?,
    })
}

/// Per traffic profile results of a qos run
#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowReport {
    pub name: String,
    pub marking: u8,
    pub offered: u64,
    pub dropped: u64,
    pub unroutable: u64,
    pub delivered: u64,
    pub delivered_bytes: u64,
    /// Mean time from enqueue to transmission
    pub mean_delay_ms: f64,
    #[serde(skip)]
    total_delay_ms: u64,
}

impl FlowReport {
    /// Delivered throughput over `duration_ms`
    pub fn goodput_bps(&self, duration_ms: u64) -> f64 {
        if duration_ms == 0 {
            return 0.0;
        }
        (self.delivered_bytes * 8) as f64 * 1000.0 / duration_ms as f64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QosReport {
    pub duration_ms: u64,
    pub flows: Vec<FlowReport>,
    pub stats: StatsSnapshot,
}

/// Offers every traffic profile at its configured rate and drains each up
/// interface at `scheduler.link_rate_bps`. Down interfaces do not transmit.
pub async fn run_qos(config: &NodeConfig) -> Result<QosReport, SteerError> {
    let (handle, registry) = spawn_node(config)?;
    let mut script = EventScript::new(&config.events);
    let profiles = &config.traffic;

    let mut flows: Vec<FlowReport> = profiles
        .iter()
        .map(|p| FlowReport {
            name: p.name.clone(),
            marking: p.marking,
            ..Default::default()
        })
        .collect();

    // Millibits: each active millisecond adds data_rate_bps
    let mut offer_credit = vec![0u64; profiles.len()];
    let mut link_credit: HashMap<_, f64> = HashMap::new();
    let mut enqueued_at: HashMap<u64, u64> = HashMap::new();
    let bytes_per_ms = config.scheduler.link_rate_bps as f64 / 8.0 / 1000.0;
    let mut packets_sent = 0u64;

    for now_ms in 0..config.node.duration_ms {
        script.apply_due(&handle, now_ms).await?;

        for (index, profile) in profiles.iter().enumerate() {
            if !profile.is_active(now_ms) {
                continue;
            }
            offer_credit[index] += profile.data_rate_bps;
            let packet_cost = profile.packet_size as u64 * 8 * 1000;

            while offer_credit[index] >= packet_cost {
                offer_credit[index] -= packet_cost;
                // Sequence encodes the profile so deliveries can be attributed
                let sequence = packets_sent * profiles.len() as u64 + index as u64;
                packets_sent += 1;

                let packet = Packet::new(
                    sequence,
                    profile.destination,
                    profile.marking,
                    profile.packet_size,
                );
                let flow = &mut flows[index];
                flow.offered += 1;
                match handle.forward(packet).await? {
                    ForwardOutcome::Queued { .. } => {
                        enqueued_at.insert(sequence, now_ms);
                    }
                    ForwardOutcome::Dropped { .. } => flow.dropped += 1,
                    ForwardOutcome::Unroutable => flow.unroutable += 1,
                }
            }
        }

        for interface in &config.interfaces {
            let credit = link_credit.entry(interface.id).or_insert(0.0);
            if !registry.is_up(interface.id) {
                *credit = 0.0;
                continue;
            }

            *credit += bytes_per_ms;
            while *credit > 0.0 {
                let Some(packet) = handle.dequeue(interface.id).await? else {
                    // An idle link does not bank credit
                    *credit = 0.0;
                    break;
                };
                *credit -= packet.size as f64;

                let flow = &mut flows[(packet.sequence % profiles.len() as u64) as usize];
                flow.delivered += 1;
                flow.delivered_bytes += packet.size as u64;
                if let Some(queued) = enqueued_at.remove(&packet.sequence) {
                    flow.total_delay_ms += now_ms - queued;
                }
            }
        }
    }

    for flow in &mut flows {
        if flow.delivered > 0 {
            flow.mean_delay_ms = flow.total_delay_ms as f64 / flow.delivered as f64;
        }
    }

    Ok(QosReport {
        duration_ms: config.node.duration_ms,
        flows,
        stats: handle.snapshot().await?,
    })
}
