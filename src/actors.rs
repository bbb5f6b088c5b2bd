// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Actor-based forwarding using Tokio
//!
//! The forwarder runs inside a single task and is driven over a channel.
//! Link events may also be applied directly on the shared
//! [`InterfaceRegistry`](crate::interface::InterfaceRegistry) from any task.

use crate::error::{InterfaceError, SteerError};
use crate::forwarder::{ForwardOutcome, Forwarder};
use crate::interface::{InterfaceEvent, InterfaceId};
use crate::packet::Packet;
use crate::stats::StatsSnapshot;
use std::time::Duration;
use tokio::sync::mpsc;

/// Messages for the forwarder actor
#[derive(Debug)]
pub enum ForwarderMessage {
    Forward {
        packet: Packet,
        response: mpsc::Sender<ForwardOutcome>,
    },
    InterfaceEvent {
        event: InterfaceEvent,
        response: mpsc::Sender<Result<bool, InterfaceError>>,
    },
    Dequeue {
        interface: InterfaceId,
        response: mpsc::Sender<Option<Packet>>,
    },
    Drain {
        interface: InterfaceId,
        budget: usize,
        response: mpsc::Sender<Vec<Packet>>,
    },
    Snapshot {
        response: mpsc::Sender<StatsSnapshot>,
    },
}

/// Forwarder Actor - owns a forwarder and serialises access to it
pub struct ForwarderActor {
    forwarder: Forwarder,
    receiver: mpsc::Receiver<ForwarderMessage>,
}

impl ForwarderActor {
    pub fn new(forwarder: Forwarder, receiver: mpsc::Receiver<ForwarderMessage>) -> Self {
        Self {
            forwarder,
            receiver,
        }
    }

    /// Creates the actor and its handle, spawning the run loop
    pub fn spawn(forwarder: Forwarder, buffer: usize) -> ForwarderHandle {
        let (tx, rx) = mpsc::channel(buffer);
        let actor = Self::new(forwarder, rx);
        tokio::spawn(async move {
            actor.run().await;
        });
        ForwarderHandle::new(tx)
    }

    pub async fn run(mut self) {
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ForwarderMessage::Forward { packet, response } => {
                    let outcome = self.forwarder.forward(packet);
                    let _ = response.send(outcome).await;
                }
                ForwarderMessage::InterfaceEvent { event, response } => {
                    let result = self.forwarder.apply_event(event);
                    let _ = response.send(result).await;
                }
                ForwarderMessage::Dequeue {
                    interface,
                    response,
                } => {
                    let packet = self.forwarder.dequeue(interface);
                    let _ = response.send(packet).await;
                }
                ForwarderMessage::Drain {
                    interface,
                    budget,
                    response,
                } => {
                    let packets = self.forwarder.drain(interface, budget);
                    let _ = response.send(packets).await;
                }
                ForwarderMessage::Snapshot { response } => {
                    let _ = response.send(self.forwarder.snapshot()).await;
                }
            }
        }
        tracing::debug!("Forwarder actor stopped");
    }

    /// Spawns a task that releases one packet from `interface` every `interval`,
    /// emulating a fixed-rate link. Released packets are passed to `sink`.
    pub fn spawn_transmitter(
        handle: ForwarderHandle,
        interface: InterfaceId,
        interval: Duration,
        sink: mpsc::Sender<Packet>,
        mut shutdown: mpsc::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        break;
                    }
                    _ = ticker.tick() => {
                        match handle.dequeue(interface).await {
                            Ok(Some(packet)) => {
                                if sink.send(packet).await.is_err() {
                                    break;
                                }
                            }
                            Ok(None) => {}
                            Err(_) => break,
                        }
                    }
                }
            }
            tracing::debug!("Transmitter for {} stopped", interface);
        })
    }
}

/// Actor handle for sending messages to an actor
pub struct ActorHandle<T> {
    sender: mpsc::Sender<T>,
}

impl<T> Clone for ActorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T> ActorHandle<T> {
    pub fn new(sender: mpsc::Sender<T>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, msg: T) -> Result<(), SteerError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SteerError::ChannelClosed)
    }
}

pub type ForwarderHandle = ActorHandle<ForwarderMessage>;

impl ActorHandle<ForwarderMessage> {
    pub async fn forward(&self, packet: Packet) -> Result<ForwardOutcome, SteerError> {
        let (tx, mut rx) = mpsc::channel(1);
        self.send(ForwarderMessage::Forward {
            packet,
            response: tx,
        })
        .await?;
        rx.recv().await.ok_or(SteerError::ChannelClosed)
    }

    pub async fn apply_event(&self, event: InterfaceEvent) -> Result<bool, SteerError> {
        let (tx, mut rx) = mpsc::channel(1);
        self.send(ForwarderMessage::InterfaceEvent {
            event,
            response: tx,
        })
        .await?;
        Ok(rx.recv().await.ok_or(SteerError::ChannelClosed)??)
    }

    pub async fn dequeue(&self, interface: InterfaceId) -> Result<Option<Packet>, SteerError> {
        let (tx, mut rx) = mpsc::channel(1);
        self.send(ForwarderMessage::Dequeue {
            interface,
            response: tx,
        })
        .await?;
        rx.recv().await.ok_or(SteerError::ChannelClosed)
    }

    pub async fn drain(
        &self,
        interface: InterfaceId,
        budget: usize,
    ) -> Result<Vec<Packet>, SteerError> {
        let (tx, mut rx) = mpsc::channel(1);
        self.send(ForwarderMessage::Drain {
            interface,
            budget,
            response: tx,
        })
        .await?;
        rx.recv().await.ok_or(SteerError::ChannelClosed)
    }

    pub async fn snapshot(&self) -> Result<StatsSnapshot, SteerError> {
        let (tx, mut rx) = mpsc::channel(1);
        self.send(ForwarderMessage::Snapshot { response: tx }).await?;
        rx.recv().await.ok_or(SteerError::ChannelClosed)
    }
}
