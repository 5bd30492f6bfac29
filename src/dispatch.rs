//! # Event and Timer Dispatch
//!
//! Cooperative, single-threaded event delivery between the vehicle services.
//!
//! Services never call each other. They post [`Event`]s through the
//! [`Substrate`] trait and arm single-shot timers whose expiry comes back to
//! the owning service as [`Event::Timeout`]. [`Dispatcher`] is an in-process
//! implementation: one bounded FIFO per service, drained in fixed priority
//! order, with timers measured against a millisecond clock the host advances.

use std::collections::{HashMap, VecDeque};

use tracing::{trace, warn};

use crate::session::drive::DriveCommand;
use crate::xbee::protocol::RxPacket;
use crate::xbee::status::StatusReport;

/// Service identifiers, in priority order (highest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    /// Framing receiver and status transmitter
    Link,
    /// Pairing session manager
    Pairing,
    /// Thruster and lift fan actuator
    Motion,
}

impl ServiceId {
    /// All services, highest priority first
    pub const ALL: [ServiceId; 3] = [ServiceId::Link, ServiceId::Pairing, ServiceId::Motion];

    fn index(self) -> usize {
        match self {
            ServiceId::Link => 0,
            ServiceId::Pairing => 1,
            ServiceId::Motion => 2,
        }
    }
}

/// Timer identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// Inter-byte framing timeout
    Framing,
    /// Session lifetime
    PairSession,
    /// Per-message liveness
    Liveness,
    /// Team strap sampling period
    TeamSample,
}

impl TimerId {
    /// Service that receives this timer's expiry
    pub fn owner(self) -> ServiceId {
        match self {
            TimerId::Framing => ServiceId::Link,
            TimerId::PairSession | TimerId::Liveness | TimerId::TeamSample => ServiceId::Pairing,
        }
    }
}

/// Events exchanged between services
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Service start-up
    Init,
    /// One byte from the radio UART
    ByteReceived(u8),
    /// A timer armed by the receiving service expired
    Timeout(TimerId),
    /// Team strap conversion finished
    AdcReading(u8),
    /// Validated RX packet from the link
    Packet(RxPacket),
    /// Status frame to send
    Transmit(StatusReport),
    /// Thruster command
    Drive(DriveCommand),
    /// Lift fan on/off
    Lift(bool),
    /// Host is stopping; end any session fail-safe
    Shutdown,
}

/// Event and timer services consumed by the vehicle state machines
pub trait Substrate {
    /// Queue an event; `false` if the destination queue is full
    fn post(&mut self, service: ServiceId, event: Event) -> bool;

    /// Arm (or re-arm) a single-shot timer
    fn arm_timer(&mut self, timer: TimerId, ms: u64);

    /// Cancel a timer; stopping an idle timer is a no-op
    fn stop_timer(&mut self, timer: TimerId);
}

/// In-process [`Substrate`] with bounded per-service queues
#[derive(Debug)]
pub struct Dispatcher {
    queues: [VecDeque<Event>; 3],
    capacity: usize,
    timers: HashMap<TimerId, u64>,
    now_ms: u64,
}

impl Dispatcher {
    /// Create a dispatcher whose queues each hold `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            queues: [VecDeque::new(), VecDeque::new(), VecDeque::new()],
            capacity,
            timers: HashMap::new(),
            now_ms: 0,
        }
    }

    /// Current clock reading
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Deadline of a running timer
    pub fn deadline(&self, timer: TimerId) -> Option<u64> {
        self.timers.get(&timer).copied()
    }

    /// Whether a timer is running
    pub fn is_armed(&self, timer: TimerId) -> bool {
        self.timers.contains_key(&timer)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.values().min().copied()
    }

    /// Move the clock forward and post expiries
    ///
    /// The clock never runs backwards. Timers that expire together are
    /// delivered in deadline order. A timer whose owner's queue is full stays
    /// armed with its past deadline and is retried on the next call. Returns
    /// the number of expiries delivered.
    pub fn advance_to(&mut self, now_ms: u64) -> usize {
        self.now_ms = self.now_ms.max(now_ms);
        let now = self.now_ms;

        let mut expired: Vec<(u64, TimerId)> = self
            .timers
            .iter()
            .filter(|&(_, &deadline)| deadline <= now)
            .map(|(&timer, &deadline)| (deadline, timer))
            .collect();
        expired.sort_unstable();

        let mut delivered = 0;
        for (_, timer) in expired {
            if self.post(timer.owner(), Event::Timeout(timer)) {
                self.timers.remove(&timer);
                trace!("Timer {:?} expired at {} ms", timer, now);
                delivered += 1;
            } else {
                warn!("Deferred expiry of {:?}: {:?} queue full", timer, timer.owner());
            }
        }

        delivered
    }

    /// Next event to process, highest-priority service first
    pub fn next_event(&mut self) -> Option<(ServiceId, Event)> {
        ServiceId::ALL.iter().find_map(|&service| {
            self.queues[service.index()]
                .pop_front()
                .map(|event| (service, event))
        })
    }

    /// Events waiting for a service
    pub fn pending(&self, service: ServiceId) -> usize {
        self.queues[service.index()].len()
    }
}

impl Substrate for Dispatcher {
    fn post(&mut self, service: ServiceId, event: Event) -> bool {
        let queue = &mut self.queues[service.index()];
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(event);
        true
    }

    fn arm_timer(&mut self, timer: TimerId, ms: u64) {
        self.timers.insert(timer, self.now_ms + ms);
    }

    fn stop_timer(&mut self, timer: TimerId) {
        self.timers.remove(&timer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_respects_capacity() {
        let mut dispatcher = Dispatcher::new(2);
        assert!(dispatcher.post(ServiceId::Link, Event::ByteReceived(1)));
        assert!(dispatcher.post(ServiceId::Link, Event::ByteReceived(2)));
        assert!(!dispatcher.post(ServiceId::Link, Event::ByteReceived(3)));
        assert_eq!(dispatcher.pending(ServiceId::Link), 2);

        // Other queues are independent
        assert!(dispatcher.post(ServiceId::Motion, Event::Lift(true)));
    }

    #[test]
    fn test_priority_order() {
        let mut dispatcher = Dispatcher::new(4);
        dispatcher.post(ServiceId::Motion, Event::Lift(false));
        dispatcher.post(ServiceId::Pairing, Event::Init);
        dispatcher.post(ServiceId::Link, Event::ByteReceived(0x7E));
        dispatcher.post(ServiceId::Link, Event::ByteReceived(0x00));

        let order: Vec<(ServiceId, Event)> = std::iter::from_fn(|| dispatcher.next_event()).collect();
        assert_eq!(
            order,
            vec![
                (ServiceId::Link, Event::ByteReceived(0x7E)),
                (ServiceId::Link, Event::ByteReceived(0x00)),
                (ServiceId::Pairing, Event::Init),
                (ServiceId::Motion, Event::Lift(false)),
            ]
        );
    }

    #[test]
    fn test_timer_expiry_goes_to_owner() {
        let mut dispatcher = Dispatcher::new(4);
        dispatcher.arm_timer(TimerId::Framing, 200);
        dispatcher.arm_timer(TimerId::Liveness, 2000);

        assert_eq!(dispatcher.advance_to(199), 0);
        assert_eq!(dispatcher.advance_to(200), 1);
        assert_eq!(
            dispatcher.next_event(),
            Some((ServiceId::Link, Event::Timeout(TimerId::Framing)))
        );
        assert!(!dispatcher.is_armed(TimerId::Framing));

        assert_eq!(dispatcher.advance_to(5000), 1);
        assert_eq!(
            dispatcher.next_event(),
            Some((ServiceId::Pairing, Event::Timeout(TimerId::Liveness)))
        );
    }

    #[test]
    fn test_rearm_replaces_deadline() {
        let mut dispatcher = Dispatcher::new(4);
        dispatcher.arm_timer(TimerId::Liveness, 2000);
        dispatcher.advance_to(1500);
        dispatcher.arm_timer(TimerId::Liveness, 2000);
        assert_eq!(dispatcher.deadline(TimerId::Liveness), Some(3500));

        assert_eq!(dispatcher.advance_to(2000), 0);
        assert_eq!(dispatcher.advance_to(3500), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut dispatcher = Dispatcher::new(4);
        dispatcher.arm_timer(TimerId::PairSession, 45_000);
        dispatcher.stop_timer(TimerId::PairSession);
        dispatcher.stop_timer(TimerId::PairSession);
        dispatcher.stop_timer(TimerId::TeamSample);

        assert_eq!(dispatcher.next_deadline(), None);
        assert_eq!(dispatcher.advance_to(100_000), 0);
    }

    #[test]
    fn test_expiries_delivered_in_deadline_order() {
        let mut dispatcher = Dispatcher::new(4);
        dispatcher.arm_timer(TimerId::TeamSample, 500);
        dispatcher.arm_timer(TimerId::Liveness, 300);

        assert_eq!(dispatcher.next_deadline(), Some(300));
        assert_eq!(dispatcher.advance_to(1000), 2);
        assert_eq!(dispatcher.next_event(), Some((ServiceId::Pairing, Event::Timeout(TimerId::Liveness))));
        assert_eq!(dispatcher.next_event(), Some((ServiceId::Pairing, Event::Timeout(TimerId::TeamSample))));
    }

    #[test]
    fn test_expiry_kept_while_owner_queue_full() {
        let mut dispatcher = Dispatcher::new(2);
        dispatcher.arm_timer(TimerId::Liveness, 300);
        dispatcher.post(ServiceId::Pairing, Event::AdcReading(1));
        dispatcher.post(ServiceId::Pairing, Event::AdcReading(2));

        assert_eq!(dispatcher.advance_to(400), 0);
        assert!(dispatcher.is_armed(TimerId::Liveness));
        assert_eq!(dispatcher.next_deadline(), Some(300));

        // Drain the queue, then the overdue timer goes out
        while dispatcher.next_event().is_some() {}
        assert_eq!(dispatcher.advance_to(400), 1);
        assert!(!dispatcher.is_armed(TimerId::Liveness));
        assert_eq!(
            dispatcher.next_event(),
            Some((ServiceId::Pairing, Event::Timeout(TimerId::Liveness)))
        );
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut dispatcher = Dispatcher::new(4);
        dispatcher.advance_to(1000);
        dispatcher.advance_to(10);
        assert_eq!(dispatcher.now_ms(), 1000);
    }
}
