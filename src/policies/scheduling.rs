// SPDX-License-Identifier: EUPL-1.2-or-later
// Copyright © 2026-present Steer Contributors

//! Strict-priority scheduling
//!
//! A bounded multi-band queue. Band 0 is always served first; a busy
//! high-priority band will starve the bands below it.

use crate::error::{ClassifierError, SchedulerError};
use crate::packet::Packet;
use crate::policies::qos::TrafficClassifier;
use crate::stats::{SchedulerSnapshot, SchedulerStats};
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of bands
pub const DEFAULT_BANDS: usize = 3;
/// Default limit across all bands, in packets
pub const DEFAULT_CAPACITY: usize = 100;

/// Multi-band strict-priority queue with a shared capacity
#[derive(Debug)]
pub struct PriorityScheduler {
    /// One FIFO per band, index 0 = highest priority
    bands: Vec<VecDeque<Packet>>,
    total_capacity: usize,
    /// Packets currently held across all bands
    occupancy: usize,
    classifier: Arc<TrafficClassifier>,
    stats: Arc<SchedulerStats>,
}

impl PriorityScheduler {
    pub fn new(
        classifier: Arc<TrafficClassifier>,
        bands: usize,
        total_capacity: usize,
    ) -> Result<Self, SchedulerError> {
        if bands == 0 {
            return Err(SchedulerError::InvalidConfig(
                "at least one band is required".to_string(),
            ));
        }
        if total_capacity == 0 {
            return Err(SchedulerError::InvalidConfig(
                "total capacity must be non-zero".to_string(),
            ));
        }

        let required = classifier.bands_required();
        if required > bands {
            return Err(ClassifierError::BandOutOfRange {
                band: required - 1,
                bands,
            }
            .into());
        }

        Ok(Self {
            bands: (0..bands).map(|_| VecDeque::new()).collect(),
            total_capacity,
            occupancy: 0,
            classifier,
            stats: Arc::new(SchedulerStats::default()),
        })
    }

    /// Classifies and queues a packet, returning the band it landed in.
    ///
    /// Tail-drops with `QueueFull` once the scheduler holds `total_capacity`
    /// packets; queued packets are never evicted to make room.
    pub fn enqueue(&mut self, packet: Packet) -> Result<usize, SchedulerError> {
        let band = self.classifier.classify(packet.marking);

        if self.occupancy >= self.total_capacity {
            self.stats.increment_dropped(packet.size);
            return Err(SchedulerError::QueueFull {
                band,
                capacity: self.total_capacity,
            });
        }

        self.bands[band].push_back(packet);
        self.occupancy += 1;
        self.stats.increment_enqueued();
        Ok(band)
    }

    /// Removes the head of the highest-priority non-empty band
    pub fn dequeue(&mut self) -> Option<Packet> {
        let packet = self.bands.iter_mut().find_map(|band| band.pop_front())?;
        self.occupancy -= 1;
        self.stats.increment_dequeued();
        Some(packet)
    }

    /// Returns the number of queued packets across all bands
    pub fn len(&self) -> usize {
        self.occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    pub fn band_len(&self, band: usize) -> usize {
        self.bands.get(band).map(VecDeque::len).unwrap_or(0)
    }

    pub fn bands(&self) -> usize {
        self.bands.len()
    }

    pub fn capacity(&self) -> usize {
        self.total_capacity
    }

    pub fn stats(&self) -> Arc<SchedulerStats> {
        Arc::clone(&self.stats)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            queued: self.occupancy,
            band_occupancy: self.bands.iter().map(VecDeque::len).collect(),
            enqueued: self.stats.enqueued(),
            dequeued: self.stats.dequeued(),
            dropped: self.stats.dropped(),
            dropped_bytes: self.stats.dropped_bytes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{DSCP_BE, DSCP_EF};
    use crate::policies::qos::ClassRule;
    use std::net::Ipv4Addr;

    fn pkt(seq: u64, marking: u8) -> Packet {
        Packet::new(seq, Ipv4Addr::new(10, 1, 3, 2), marking, 100)
    }

    fn scheduler(capacity: usize) -> PriorityScheduler {
        PriorityScheduler::new(Arc::new(TrafficClassifier::pfifo_fast()), 3, capacity).unwrap()
    }

    #[test]
    fn test_strict_priority_order() {
        let mut sched = scheduler(10);

        assert_eq!(sched.enqueue(pkt(0, DSCP_BE)), Ok(2));
        assert_eq!(sched.enqueue(pkt(1, 10)), Ok(1));
        assert_eq!(sched.enqueue(pkt(2, DSCP_EF)), Ok(0));

        let order: Vec<u64> = std::iter::from_fn(|| sched.dequeue())
            .map(|p| p.sequence)
            .collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert!(sched.is_empty());
        assert_eq!(sched.dequeue(), None);
    }

    #[test]
    fn test_fifo_within_band() {
        let mut sched = scheduler(10);
        for seq in 0..4 {
            sched.enqueue(pkt(seq, DSCP_EF)).unwrap();
        }
        sched.enqueue(pkt(99, DSCP_BE)).unwrap();

        for seq in 0..4 {
            assert_eq!(sched.dequeue().unwrap().sequence, seq);
        }
        assert_eq!(sched.dequeue().unwrap().sequence, 99);
    }

    #[test]
    fn test_capacity_is_shared_and_tail_drops() {
        let mut sched = scheduler(3);
        sched.enqueue(pkt(0, DSCP_BE)).unwrap();
        sched.enqueue(pkt(1, DSCP_BE)).unwrap();
        sched.enqueue(pkt(2, DSCP_BE)).unwrap();

        // A high-priority arrival does not preempt queued low-priority packets
        let result = sched.enqueue(pkt(3, DSCP_EF));
        assert_eq!(
            result,
            Err(SchedulerError::QueueFull {
                band: 0,
                capacity: 3
            })
        );
        assert_eq!(sched.len(), 3);
        assert_eq!(sched.band_len(0), 0);
        assert_eq!(sched.band_len(2), 3);
        assert_eq!(sched.stats().dropped(), 1);

        // Draining one frees exactly one slot
        sched.dequeue().unwrap();
        assert!(sched.enqueue(pkt(4, DSCP_EF)).is_ok());
        assert!(sched.enqueue(pkt(5, DSCP_EF)).is_err());
    }

    #[test]
    fn test_occupancy_never_exceeds_capacity() {
        let mut sched = scheduler(5);
        for seq in 0..200u64 {
            let marking = [DSCP_EF, DSCP_BE, 20][(seq % 3) as usize];
            let _ = sched.enqueue(pkt(seq, marking));
            if seq % 4 == 0 {
                sched.dequeue();
            }
            assert!(sched.len() <= sched.capacity());
            let sum: usize = (0..sched.bands()).map(|b| sched.band_len(b)).sum();
            assert_eq!(sum, sched.len());
        }
    }

    #[test]
    fn test_high_band_starves_low_band() {
        let mut sched = scheduler(100);
        sched.enqueue(pkt(0, DSCP_BE)).unwrap();

        // Keep band 0 busy: the best-effort packet never gets out
        for seq in 1..50 {
            sched.enqueue(pkt(seq, DSCP_EF)).unwrap();
            assert_eq!(sched.dequeue().unwrap().marking, DSCP_EF);
        }
        assert_eq!(sched.band_len(2), 1);
    }

    #[test]
    fn test_rejects_classifier_wider_than_bands() {
        let classifier =
            TrafficClassifier::new(vec![ClassRule::new(46, 46, 4)], 0).unwrap();
        let result = PriorityScheduler::new(Arc::new(classifier), 3, 10);
        assert_eq!(
            result.unwrap_err(),
            SchedulerError::Classifier(ClassifierError::BandOutOfRange { band: 4, bands: 3 })
        );
    }

    #[test]
    fn test_rejects_empty_configuration() {
        let classifier = Arc::new(TrafficClassifier::new(vec![], 0).unwrap());
        assert!(PriorityScheduler::new(Arc::clone(&classifier), 0, 10).is_err());
        assert!(PriorityScheduler::new(classifier, 1, 0).is_err());
    }

    #[test]
    fn test_snapshot() {
        let mut sched = scheduler(2);
        sched.enqueue(pkt(0, DSCP_EF)).unwrap();
        sched.enqueue(pkt(1, DSCP_BE)).unwrap();
        let _ = sched.enqueue(pkt(2, DSCP_BE));
        sched.dequeue();

        let snapshot = sched.snapshot();
        assert_eq!(snapshot.queued, 1);
        assert_eq!(snapshot.band_occupancy, vec![0, 0, 1]);
        assert_eq!(snapshot.enqueued, 2);
        assert_eq!(snapshot.dequeued, 1);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.dropped_bytes, 100);
    }
}
