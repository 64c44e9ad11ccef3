//! Synchronization bus
//!
//! The bus owns the playback clock and is the single source of truth for the
//! current time. Views never write time into each other: they submit a
//! command, the bus applies it to the clock at the next `pump`, and the
//! resulting state is broadcast to every subscriber, the originator included.
//!
//! ## Ordering
//!
//! - One state change produces exactly one notification per subscriber.
//! - Subscribers are notified synchronously in subscription order.
//! - A notification round completes before the next change is applied.
//! - No-op commands and ticks that leave the state unchanged notify nobody.

use std::collections::VecDeque;
use std::sync::Arc;

use super::atomics::TimeAtomics;
use super::update::{TimeUpdate, UpdateCause};
use crate::clock::{command_channel, ClockCommand, CommandReceiver, CommandSender, PlaybackClock};
use crate::timeline::TimeDomain;

/// Receives every broadcast time update
pub trait TimeSubscriber {
    fn on_time_update(&mut self, update: &TimeUpdate);
}

/// Handle returned by [`SyncBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

pub struct SyncBus {
    clock: PlaybackClock,
    subscribers: Vec<(SubscriberId, Box<dyn TimeSubscriber>)>,
    next_id: u64,
    /// Commands submitted on the render thread
    pending: VecDeque<ClockCommand>,
    /// Commands pushed from other threads
    queue: Option<CommandReceiver>,
    current: TimeUpdate,
    atomics: Arc<TimeAtomics>,
}

impl SyncBus {
    pub fn new(clock: PlaybackClock) -> Self {
        let current = TimeUpdate::from_state(
            0,
            clock.state(),
            clock.time(),
            clock.domain(),
            UpdateCause::Transport,
        );
        let atomics = Arc::new(TimeAtomics::new());
        atomics.store(&current);

        Self {
            clock,
            subscribers: Vec::new(),
            next_id: 0,
            pending: VecDeque::new(),
            queue: None,
            current,
            atomics,
        }
    }

    /// Create the cross-thread command queue and return its sender
    ///
    /// Replaces any previously attached queue.
    pub fn attach_queue(&mut self) -> CommandSender {
        let (tx, rx) = command_channel();
        self.queue = Some(rx);
        tx
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn TimeSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, subscriber));
        log::debug!("subscribe: {:?} ({} subscribers)", id, self.subscribers.len());
        id
    }

    /// Remove a subscriber; returns false if it was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Queue a view-originated command for the next `pump`
    pub fn submit(&mut self, command: ClockCommand) {
        self.pending.push_back(command);
    }

    /// Apply queued commands, then tick the clock
    ///
    /// Returns the number of broadcasts made. Called once per frame.
    pub fn pump(&mut self, elapsed: f64) -> usize {
        let mut broadcasts = 0;

        while let Some(command) = self.pending.pop_front() {
            broadcasts += usize::from(self.apply(command));
        }
        if let Some(queue) = self.queue.as_mut() {
            let mut drained = Vec::new();
            while let Ok(command) = queue.pop() {
                drained.push(command);
            }
            for command in drained {
                broadcasts += usize::from(self.apply(command));
            }
        }

        let previous = self.clock.time();
        if self.clock.tick(elapsed) {
            self.broadcast(previous, UpdateCause::Tick);
            broadcasts += 1;
        }
        broadcasts
    }

    /// Apply a command immediately, broadcasting if it changed the state
    pub fn apply(&mut self, command: ClockCommand) -> bool {
        let previous = self.clock.time();
        if !self.clock.apply(command) {
            return false;
        }
        let cause = match command {
            ClockCommand::ScrubTo(_) => UpdateCause::Scrub,
            _ => UpdateCause::Transport,
        };
        self.broadcast(previous, cause);
        true
    }

    /// Replace the canonical domain after a reload
    pub fn set_domain(&mut self, domain: TimeDomain) -> bool {
        let previous = self.clock.time();
        if !self.clock.set_domain(domain) {
            return false;
        }
        log::info!(
            "set_domain: [{:.4}, {:.4}] s, time {:.4} s",
            domain.t_min,
            domain.t_max,
            self.clock.time()
        );
        self.broadcast(previous, UpdateCause::DomainChanged);
        true
    }

    fn broadcast(&mut self, previous_time: f64, cause: UpdateCause) {
        let update = TimeUpdate::from_state(
            self.current.sequence + 1,
            self.clock.state(),
            previous_time,
            self.clock.domain(),
            cause,
        );
        self.current = update;
        self.atomics.store(&update);
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber.on_time_update(&update);
        }
    }

    /// Last broadcast update
    pub fn current(&self) -> TimeUpdate {
        self.current
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    /// Shared lock-free mirror of the current update
    pub fn atomics(&self) -> Arc<TimeAtomics> {
        Arc::clone(&self.atomics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{LoopMode, PlayStatus};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(usize, u64, f64)>>>;

    struct Recorder {
        tag: usize,
        log: Log,
    }

    impl TimeSubscriber for Recorder {
        fn on_time_update(&mut self, update: &TimeUpdate) {
            self.log.lock().unwrap().push((self.tag, update.sequence, update.time));
        }
    }

    fn bus_with(n: usize) -> (SyncBus, Log) {
        let clock = PlaybackClock::new(TimeDomain::new(0.0, 1.0), 1.0, LoopMode::Off);
        let mut bus = SyncBus::new(clock);
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        for tag in 0..n {
            bus.subscribe(Box::new(Recorder { tag, log: Arc::clone(&log) }));
        }
        (bus, log)
    }

    #[test]
    fn test_one_notification_per_subscriber_in_order() {
        let (mut bus, log) = bus_with(3);
        bus.submit(ClockCommand::ScrubTo(0.4));
        assert_eq!(bus.pump(0.0), 1);

        let log = log.lock().unwrap();
        assert_eq!(log.as_slice(), &[(0, 1, 0.4), (1, 1, 0.4), (2, 1, 0.4)]);
    }

    #[test]
    fn test_all_views_agree_after_each_round() {
        let (mut bus, log) = bus_with(2);
        bus.submit(ClockCommand::Play);
        bus.pump(0.1);
        bus.pump(0.1);

        let log = log.lock().unwrap();
        // Play, tick, tick; each round delivered to both before the next
        for round in log.chunks(2) {
            assert_eq!(round[0].1, round[1].1);
            assert_eq!(round[0].2, round[1].2);
        }
        assert_eq!(log.len(), 6);
        assert!((bus.current().time - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_noop_commands_do_not_notify() {
        let (mut bus, log) = bus_with(1);
        bus.submit(ClockCommand::Pause);
        assert_eq!(bus.pump(0.1), 0);
        bus.submit(ClockCommand::ScrubTo(0.5));
        bus.submit(ClockCommand::ScrubTo(0.5));
        assert_eq!(bus.pump(0.1), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_queue_commands_applied_on_pump() {
        let (mut bus, log) = bus_with(1);
        let mut tx = bus.attach_queue();
        tx.push(ClockCommand::ScrubTo(0.75)).unwrap();
        assert!(log.lock().unwrap().is_empty());

        bus.pump(0.0);
        assert_eq!(bus.current().time, 0.75);
        assert_eq!(bus.current().cause, UpdateCause::Scrub);
    }

    #[test]
    fn test_backward_jump_flagged() {
        let (mut bus, _log) = bus_with(0);
        bus.apply(ClockCommand::ScrubTo(0.8));
        bus.apply(ClockCommand::ScrubTo(0.2));
        assert!(bus.current().is_backward_jump());
        assert_eq!(bus.current().previous_time, 0.8);
    }

    #[test]
    fn test_atomics_mirror_current() {
        let (mut bus, _log) = bus_with(0);
        let atomics = bus.atomics();
        bus.apply(ClockCommand::SetRate(-1.5));
        bus.apply(ClockCommand::ScrubTo(0.6));
        assert_eq!(atomics.time(), 0.6);
        assert_eq!(atomics.rate(), -1.5);
        assert_eq!(atomics.status(), PlayStatus::Paused);
        assert_eq!(atomics.sequence(), bus.current().sequence);
    }

    #[test]
    fn test_unsubscribe() {
        let (mut bus, log) = bus_with(0);
        let id = bus.subscribe(Box::new(Recorder { tag: 9, log: Arc::clone(&log) }));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.apply(ClockCommand::ScrubTo(0.3));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_domain_change_broadcast() {
        let (mut bus, log) = bus_with(1);
        bus.apply(ClockCommand::ScrubTo(0.9));
        assert!(bus.set_domain(TimeDomain::new(0.0, 0.5)));
        assert_eq!(bus.current().cause, UpdateCause::DomainChanged);
        assert_eq!(bus.current().time, 0.5);
        assert!(!bus.set_domain(TimeDomain::new(0.0, 0.5)));
        assert_eq!(log.lock().unwrap().len(), 2);
    }
}
