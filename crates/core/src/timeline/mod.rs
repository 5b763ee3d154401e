//! Time sources and frame bookkeeping.
//!
//! Every time-dependent decision in the engine (wheel debouncing, settle
//! deadlines, tap durations, tween progress) reads the current time from a
//! [`Clock`] so tests can drive it with a [`ManualClock`] instead of waiting
//! on the wall clock.

use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

/// Monotonic time source measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::start()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock. Clones share the same time value, so a test can keep
/// one handle while the stage owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Handle for a registered per-frame callback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickerId(u32);

#[derive(Debug, Clone)]
struct TickerEntry {
    id: TickerId,
    label: String,
}

/// Timing information handed to every ticker on a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub frame: u64,
    pub time: Duration,
    pub delta: Duration,
}

/// Registry of per-frame callback slots.
///
/// Owners register on mount and must deregister on teardown; the stage only
/// drives components whose ticker is still registered.
#[derive(Debug, Default)]
pub struct FrameTicker {
    entries: Vec<TickerEntry>,
    next_id: u32,
    frame: u64,
    last_time: Option<Duration>,
}

impl FrameTicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: impl Into<String>) -> TickerId {
        let id = TickerId(self.next_id);
        self.next_id += 1;
        self.entries.push(TickerEntry {
            id,
            label: label.into(),
        });
        id
    }

    /// Removes a ticker. Returns `false` if it was not registered.
    pub fn remove(&mut self, id: TickerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    pub fn is_registered(&self, id: TickerId) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Starts a new frame at `time`.
    pub fn tick(&mut self, time: Duration) -> FrameInfo {
        let delta = self
            .last_time
            .map(|last| time.saturating_sub(last))
            .unwrap_or_default();
        self.last_time = Some(time);
        self.frame += 1;
        FrameInfo {
            frame: self.frame,
            time,
            delta,
        }
    }
}

/// Payload that becomes due at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledEvent<T> {
    pub at_ms: u64,
    pub payload: T,
}

impl<T> ScheduledEvent<T> {
    pub fn new(at_ms: u64, payload: T) -> Self {
        Self { at_ms, payload }
    }

    pub fn at(&self) -> Duration {
        Duration::from_millis(self.at_ms)
    }
}

/// Releases scheduled payloads in time order as the clock passes them.
#[derive(Debug)]
pub struct Scheduler<T> {
    events: Vec<ScheduledEvent<T>>,
    next_event: usize,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            next_event: 0,
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_events(&mut self, mut events: Vec<ScheduledEvent<T>>) {
        // Stable so same-timestamp events keep their script order.
        events.sort_by_key(|event| event.at_ms);
        self.events = events;
        self.next_event = 0;
    }

    /// Returns every payload that is due at `now`, oldest first.
    pub fn drain_due(&mut self, now: Duration) -> Vec<&T> {
        let start = self.next_event;
        while let Some(event) = self.events.get(self.next_event) {
            if event.at() > now {
                break;
            }
            self.next_event += 1;
        }
        self.events[start..self.next_event]
            .iter()
            .map(|event| &event.payload)
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.next_event >= self.events.len()
    }

    /// Time of the last scheduled payload, if any.
    pub fn last_at(&self) -> Option<Duration> {
        self.events.last().map(ScheduledEvent::at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance_ms(250);
        assert_eq!(clock.now(), Duration::from_millis(250));
    }

    #[test]
    fn ticker_registration_round_trip() {
        let mut ticker = FrameTicker::new();
        let a = ticker.add("carousel");
        let b = ticker.add("overlay");
        assert_eq!(ticker.len(), 2);
        assert!(ticker.remove(a));
        assert!(!ticker.remove(a));
        assert!(ticker.is_registered(b));
        assert_eq!(ticker.labels().collect::<Vec<_>>(), vec!["overlay"]);
    }

    #[test]
    fn ticker_reports_frame_delta() {
        let mut ticker = FrameTicker::new();
        let first = ticker.tick(Duration::from_millis(100));
        let second = ticker.tick(Duration::from_millis(116));
        assert_eq!(first.delta, Duration::ZERO);
        assert_eq!(second.delta, Duration::from_millis(16));
        assert_eq!(second.frame, 2);
    }

    #[test]
    fn scheduler_releases_in_time_order() {
        let mut scheduler = Scheduler::new();
        scheduler.set_events(vec![
            ScheduledEvent::new(300, "c"),
            ScheduledEvent::new(100, "a"),
            ScheduledEvent::new(100, "b"),
        ]);

        assert!(scheduler.drain_due(Duration::from_millis(50)).is_empty());
        let due: Vec<_> = scheduler
            .drain_due(Duration::from_millis(100))
            .into_iter()
            .copied()
            .collect();
        assert_eq!(due, vec!["a", "b"]);
        assert!(!scheduler.is_finished());
        assert_eq!(scheduler.drain_due(Duration::from_secs(1)).len(), 1);
        assert!(scheduler.is_finished());
    }
}
