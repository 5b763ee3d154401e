//! Property tweening.
//!
//! The engine owns a table of animated numbers keyed by target and property.
//! Tweens interpolate entries of that table toward their end values; the
//! render graph pulls the table once per frame. Nothing here knows about
//! sections or carousels.

use std::{collections::HashMap, f32::consts::PI, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::render::ElementId;

/// Free-standing animated number that is not attached to an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScalarId(u32);

/// Anything a tween can write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    Element(ElementId),
    Scalar(ScalarId),
}

impl From<ElementId> for TargetId {
    fn from(value: ElementId) -> Self {
        Self::Element(value)
    }
}

impl From<ScalarId> for TargetId {
    fn from(value: ScalarId) -> Self {
        Self::Scalar(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    X,
    Y,
    Z,
    RotateY,
    Scale,
    Opacity,
    /// The only property of a [`ScalarId`] target.
    Value,
}

impl Property {
    /// Resting value for a property that has never been written.
    pub fn initial(self) -> f32 {
        match self {
            Property::Scale | Property::Opacity => 1.0,
            _ => 0.0,
        }
    }
}

/// Named easing curves, spelled the way animation timelines usually name
/// them (`power4.out`, `sine.inOut`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ease {
    #[default]
    #[serde(rename = "none")]
    Linear,
    #[serde(rename = "power2.in")]
    Power2In,
    #[serde(rename = "power2.out")]
    Power2Out,
    #[serde(rename = "power3.out")]
    Power3Out,
    #[serde(rename = "power4.out")]
    Power4Out,
    #[serde(rename = "sine.inOut")]
    SineInOut,
}

impl Ease {
    /// Maps linear progress in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::Power2In => t * t * t,
            Ease::Power2Out => 1.0 - (1.0 - t).powi(3),
            Ease::Power3Out => 1.0 - (1.0 - t).powi(4),
            Ease::Power4Out => 1.0 - (1.0 - t).powi(5),
            Ease::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
        }
    }
}

/// How a tween moves a single property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Change {
    /// From wherever the property is when the tween starts.
    To(f32),
    /// Relative to the value when the tween starts.
    By(f32),
    /// Explicit start; the start value is written immediately on creation.
    FromTo(f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Repeat {
    #[default]
    Never,
    Count(u32),
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TweenSpec {
    pub duration: Duration,
    pub ease: Ease,
    pub delay: Duration,
    pub repeat: Repeat,
    pub yoyo: bool,
}

pub(crate) fn secs_to_duration(seconds: f32) -> Duration {
    Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or(Duration::MAX)
}

impl TweenSpec {
    pub fn new(duration: Duration, ease: Ease) -> Self {
        Self {
            duration,
            ease,
            delay: Duration::ZERO,
            repeat: Repeat::Never,
            yoyo: false,
        }
    }

    /// Negative or NaN lengths become zero; overlong ones saturate.
    pub fn secs(seconds: f32, ease: Ease) -> Self {
        Self::new(secs_to_duration(seconds), ease)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    /// Length of one play-through including the delay, ignoring repeats.
    fn span(&self) -> Duration {
        self.delay + self.duration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimelineId(u64);

#[derive(Debug, Clone)]
struct Track {
    property: Property,
    change: Change,
    from: f32,
    to: f32,
}

#[derive(Debug, Clone)]
struct ActiveTween {
    id: TweenId,
    timeline: Option<TimelineId>,
    target: TargetId,
    tracks: Vec<Track>,
    spec: TweenSpec,
    start: Duration,
    started: bool,
}

impl ActiveTween {
    /// Returns the eased progress at `now` and whether the tween is done.
    fn sample(&self, now: Duration) -> (f32, bool) {
        let elapsed = now.saturating_sub(self.start).as_secs_f32();
        let duration = self.spec.duration.as_secs_f32();
        if duration <= f32::EPSILON {
            return (1.0, !matches!(self.spec.repeat, Repeat::Infinite));
        }

        let cycles = elapsed / duration;
        let last_cycle = match self.spec.repeat {
            Repeat::Never => Some(0),
            Repeat::Count(count) => Some(count),
            Repeat::Infinite => None,
        };

        if let Some(last) = last_cycle {
            if cycles >= (last + 1) as f32 {
                let reversed = self.spec.yoyo && last % 2 == 1;
                return (if reversed { 0.0 } else { 1.0 }, true);
            }
        }

        let cycle = cycles.floor();
        let mut local = cycles - cycle;
        if self.spec.yoyo && (cycle as u64) % 2 == 1 {
            local = 1.0 - local;
        }
        (self.spec.ease.apply(local), false)
    }
}

/// Where a timeline entry starts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Position {
    /// Absolute offset from the timeline start.
    At(f32),
    /// Relative to the end of the previous entry.
    After(f32),
    /// Relative to the start of the previous entry.
    With(f32),
}

#[derive(Debug, Clone)]
struct TimelineEntry {
    target: TargetId,
    changes: Vec<(Property, Change)>,
    spec: TweenSpec,
    offset: f32,
}

/// Sequenced composition of tweens with relative offsets.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
    previous_start: f32,
    previous_end: f32,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        mut self,
        target: impl Into<TargetId>,
        changes: &[(Property, Change)],
        spec: TweenSpec,
        position: Position,
    ) -> Self {
        let offset = match position {
            Position::At(at) => at,
            Position::After(gap) => self.previous_end + gap,
            Position::With(gap) => self.previous_start + gap,
        }
        .max(0.0);

        self.previous_start = offset;
        self.previous_end = offset + spec.span().as_secs_f32();
        self.entries.push(TimelineEntry {
            target: target.into(),
            changes: changes.to_vec(),
            spec,
            offset,
        });
        self
    }

    /// Adds the same tween for every target, each starting `each` seconds
    /// after the one before it.
    pub fn stagger<T: Into<TargetId> + Copy>(
        mut self,
        targets: &[T],
        changes: &[(Property, Change)],
        spec: TweenSpec,
        each: f32,
        position: Position,
    ) -> Self {
        let mut iter = targets.iter();
        let Some(first) = iter.next() else {
            return self;
        };

        self = self.add(*first, changes, spec, position);
        let group_start = self.previous_start;
        let mut group_end = self.previous_end;
        for (index, target) in iter.enumerate() {
            let at = group_start + each * (index + 1) as f32;
            self = self.add(*target, changes, spec, Position::At(at));
            group_end = group_end.max(self.previous_end);
        }
        self.previous_start = group_start;
        self.previous_end = group_end;
        self
    }

    /// Seconds until the last entry finishes its first play-through.
    pub fn duration(&self) -> f32 {
        self.entries
            .iter()
            .map(|entry| entry.offset + entry.spec.span().as_secs_f32())
            .fold(0.0, f32::max)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start offsets of every entry in insertion order.
    pub fn offsets(&self) -> Vec<f32> {
        self.entries.iter().map(|entry| entry.offset).collect()
    }
}

/// Owner of every animated value and every in-flight tween.
#[derive(Debug, Default)]
pub struct TweenEngine {
    values: HashMap<(TargetId, Property), f32>,
    tweens: Vec<ActiveTween>,
    next_tween: u64,
    next_timeline: u64,
    next_scalar: u32,
    now: Duration,
}

impl TweenEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of the last [`advance`](Self::advance); new tweens start here.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Allocates a free-standing animated number.
    pub fn scalar(&mut self, initial: f32) -> ScalarId {
        let id = ScalarId(self.next_scalar);
        self.next_scalar += 1;
        self.values.insert((id.into(), Property::Value), initial);
        id
    }

    pub fn get(&self, target: impl Into<TargetId>, property: Property) -> f32 {
        self.values
            .get(&(target.into(), property))
            .copied()
            .unwrap_or_else(|| property.initial())
    }

    /// Writes a value immediately. In-flight tweens keep running and will
    /// overwrite it on the next advance.
    pub fn set(&mut self, target: impl Into<TargetId>, property: Property, value: f32) {
        self.values.insert((target.into(), property), value);
    }

    pub fn to(
        &mut self,
        target: impl Into<TargetId>,
        props: &[(Property, f32)],
        spec: TweenSpec,
    ) -> TweenId {
        let changes: Vec<_> = props.iter().map(|(p, v)| (*p, Change::To(*v))).collect();
        self.animate(target, &changes, spec)
    }

    pub fn by(
        &mut self,
        target: impl Into<TargetId>,
        props: &[(Property, f32)],
        spec: TweenSpec,
    ) -> TweenId {
        let changes: Vec<_> = props.iter().map(|(p, v)| (*p, Change::By(*v))).collect();
        self.animate(target, &changes, spec)
    }

    pub fn from_to(
        &mut self,
        target: impl Into<TargetId>,
        props: &[(Property, f32, f32)],
        spec: TweenSpec,
    ) -> TweenId {
        let changes: Vec<_> = props
            .iter()
            .map(|(p, from, to)| (*p, Change::FromTo(*from, *to)))
            .collect();
        self.animate(target, &changes, spec)
    }

    pub fn animate(
        &mut self,
        target: impl Into<TargetId>,
        changes: &[(Property, Change)],
        spec: TweenSpec,
    ) -> TweenId {
        self.spawn(target.into(), changes, spec, None)
    }

    fn spawn(
        &mut self,
        target: TargetId,
        changes: &[(Property, Change)],
        spec: TweenSpec,
        timeline: Option<TimelineId>,
    ) -> TweenId {
        let id = TweenId(self.next_tween);
        self.next_tween += 1;

        let tracks = changes
            .iter()
            .map(|(property, change)| {
                if let Change::FromTo(from, _) = change {
                    self.values.insert((target, *property), *from);
                }
                Track {
                    property: *property,
                    change: *change,
                    from: 0.0,
                    to: 0.0,
                }
            })
            .collect();

        self.tweens.push(ActiveTween {
            id,
            timeline,
            target,
            tracks,
            spec,
            start: self.now.saturating_add(spec.delay),
            started: false,
        });
        trace!(?id, ?target, "tween spawned");
        id
    }

    /// Schedules every entry of `timeline` relative to the current time.
    pub fn play(&mut self, timeline: Timeline) -> TimelineId {
        let id = TimelineId(self.next_timeline);
        self.next_timeline += 1;
        for entry in timeline.entries {
            let spec = TweenSpec {
                delay: entry.spec.delay.saturating_add(secs_to_duration(entry.offset)),
                ..entry.spec
            };
            self.spawn(entry.target, &entry.changes, spec, Some(id));
        }
        id
    }

    /// Stops every tween on `target` where it stands. Returns how many were
    /// removed.
    pub fn kill_tweens_of(&mut self, target: impl Into<TargetId>) -> usize {
        let target = target.into();
        self.retain_counting(|tween| tween.target != target)
    }

    pub fn kill(&mut self, id: TweenId) -> bool {
        self.retain_counting(|tween| tween.id != id) > 0
    }

    pub fn kill_timeline(&mut self, id: TimelineId) -> usize {
        self.retain_counting(|tween| tween.timeline != Some(id))
    }

    pub fn kill_all(&mut self) -> usize {
        let count = self.tweens.len();
        self.tweens.clear();
        count
    }

    fn retain_counting(&mut self, keep: impl Fn(&ActiveTween) -> bool) -> usize {
        let before = self.tweens.len();
        self.tweens.retain(|tween| keep(tween));
        before - self.tweens.len()
    }

    /// Whether any tween (running or waiting on its delay) targets `target`.
    pub fn is_tweening(&self, target: impl Into<TargetId>) -> bool {
        let target = target.into();
        self.tweens.iter().any(|tween| tween.target == target)
    }

    pub fn tweens_of(&self, target: impl Into<TargetId>) -> usize {
        let target = target.into();
        self.tweens
            .iter()
            .filter(|tween| tween.target == target)
            .count()
    }

    pub fn is_alive(&self, id: TweenId) -> bool {
        self.tweens.iter().any(|tween| tween.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.tweens.len()
    }

    /// Moves every tween to `now` and writes the interpolated values.
    pub fn advance(&mut self, now: Duration) {
        self.now = self.now.max(now);
        let now = self.now;
        let Self { values, tweens, .. } = self;

        tweens.retain_mut(|tween| {
            if now < tween.start {
                return true;
            }

            if !tween.started {
                for track in &mut tween.tracks {
                    let current = values
                        .get(&(tween.target, track.property))
                        .copied()
                        .unwrap_or_else(|| track.property.initial());
                    (track.from, track.to) = match track.change {
                        Change::To(to) => (current, to),
                        Change::By(delta) => (current, current + delta),
                        Change::FromTo(from, to) => (from, to),
                    };
                }
                tween.started = true;
            }

            let (progress, finished) = tween.sample(now);
            for track in &tween.tracks {
                let value = track.from + (track.to - track.from) * progress;
                values.insert((tween.target, track.property), value);
            }

            if finished {
                trace!(id = ?tween.id, "tween finished");
            }
            !finished
        });
    }
}
