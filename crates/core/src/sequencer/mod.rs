//! Scroll-driven section sequencer.
//!
//! A two-level state machine over `(section, sub_index)`. Wheel and swipe
//! input is reduced to discrete [`Direction`] steps, each accepted step moves
//! one position along the section list, and a settle deadline blocks further
//! steps until the transition's visuals have had time to play.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    config::SequencerConfig,
    input::{Direction, InputEvent, SwipeTracker, WheelGate},
    timeline::Clock,
    Result, ScrollStageError,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

impl SectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One full-screen panel of the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub id: SectionId,
    /// Highest sub-index; the valid range is `0..=sub_steps`.
    #[serde(default)]
    pub sub_steps: u32,
    /// Text elements staggered in whenever the section is entered.
    #[serde(default)]
    pub parts: Vec<String>,
    /// Elements revealed one per sub-step; entry `k` shows at sub-index
    /// `k + 1` and above.
    #[serde(default)]
    pub reveals: Vec<String>,
}

impl SectionSpec {
    pub fn new(id: impl Into<String>, sub_steps: u32) -> Self {
        Self {
            id: SectionId::new(id),
            sub_steps,
            parts: Vec::new(),
            reveals: Vec::new(),
        }
    }

    pub fn with_parts<I, S>(mut self, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parts = parts.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reveals<I, S>(mut self, reveals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reveals = reveals.into_iter().map(Into::into).collect();
        self
    }
}

/// Snapshot of where the sequence stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationState {
    pub current_section: SectionId,
    pub section_index: usize,
    pub sub_index: u32,
    pub is_animating: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub section: SectionId,
    pub sub_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Sub-index moved within the same section.
    SubStep,
    /// A different section became current.
    Section,
}

/// Record of an accepted state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Location,
    pub to: Location,
    pub kind: TransitionKind,
    pub settle: Duration,
}

#[derive(Debug)]
pub struct Sequencer<C: Clock> {
    sections: Vec<SectionSpec>,
    current: usize,
    sub_index: u32,
    settle_until: Option<Duration>,
    sub_step_settle: Duration,
    section_settle: Duration,
    wheel: WheelGate,
    swipe: SwipeTracker,
    clock: C,
}

impl<C: Clock> Sequencer<C> {
    pub fn new(config: &SequencerConfig, clock: C) -> Result<Self> {
        if config.sections.is_empty() {
            return Err(ScrollStageError::config(
                "the sequencer needs at least one section",
            ));
        }

        Ok(Self {
            sections: config.sections.clone(),
            current: 0,
            sub_index: 0,
            settle_until: None,
            sub_step_settle: Duration::from_millis(config.sub_step_settle_ms),
            section_settle: Duration::from_millis(config.section_settle_ms),
            wheel: WheelGate::new(Duration::from_millis(config.wheel_debounce_ms)),
            swipe: SwipeTracker::new(config.touch_threshold_px),
            clock,
        })
    }

    pub fn sections(&self) -> &[SectionSpec] {
        &self.sections
    }

    pub fn current_section(&self) -> &SectionSpec {
        &self.sections[self.current]
    }

    pub fn section_index(&self) -> usize {
        self.current
    }

    pub fn sub_index(&self) -> u32 {
        self.sub_index
    }

    pub fn is_animating(&self) -> bool {
        self.settle_until
            .is_some_and(|deadline| self.clock.now() < deadline)
    }

    pub fn state(&self) -> NavigationState {
        NavigationState {
            current_section: self.current_section().id.clone(),
            section_index: self.current,
            sub_index: self.sub_index,
            is_animating: self.is_animating(),
        }
    }

    /// Drops an expired settle deadline. Returns `true` when the guard was
    /// released by this call.
    pub fn poll(&mut self) -> bool {
        match self.settle_until {
            Some(deadline) if self.clock.now() >= deadline => {
                self.settle_until = None;
                debug!(section = %self.current_section().id, "sequencer settled");
                true
            }
            _ => false,
        }
    }

    /// Moves one position in `direction`. Dropped while a previous
    /// transition is still settling and at either end of the sequence.
    pub fn request_step(&mut self, direction: Direction) -> Option<Transition> {
        self.poll();
        if self.is_animating() {
            debug!(?direction, "step dropped while animating");
            return None;
        }

        let max = self.current_section().sub_steps;
        let (section, sub_index) = match direction {
            Direction::Forward if self.sub_index < max => (self.current, self.sub_index + 1),
            Direction::Forward if self.current + 1 < self.sections.len() => (self.current + 1, 0),
            Direction::Backward if self.sub_index > 0 => (self.current, self.sub_index - 1),
            Direction::Backward if self.current > 0 => {
                let previous = self.current - 1;
                (previous, self.sections[previous].sub_steps)
            }
            _ => {
                debug!(?direction, "step at sequence boundary ignored");
                return None;
            }
        };

        Some(self.commit(section, sub_index))
    }

    /// Jumps straight to `section`, bypassing adjacency. Unknown sections,
    /// out-of-range sub-indices and jumps to the current position are
    /// ignored, as is any jump while a transition is settling.
    pub fn navigate_to_section(&mut self, section: &str, sub_index: u32) -> Option<Transition> {
        self.poll();
        if self.is_animating() {
            debug!(section, "jump dropped while animating");
            return None;
        }

        let Some(index) = self
            .sections
            .iter()
            .position(|spec| spec.id.as_str() == section)
        else {
            debug!(section, "jump to unknown section ignored");
            return None;
        };

        if sub_index > self.sections[index].sub_steps {
            debug!(section, sub_index, "jump sub-index out of range ignored");
            return None;
        }

        if index == self.current && sub_index == self.sub_index {
            return None;
        }

        Some(self.commit(index, sub_index))
    }

    /// Feeds a wheel event through the debounce gate.
    pub fn handle_wheel(&mut self, delta_y: f32) -> Option<Transition> {
        let direction = self.wheel.accept(self.clock.now(), delta_y)?;
        self.request_step(direction)
    }

    pub fn handle_touch_start(&mut self, event: &InputEvent) {
        self.swipe.begin(event);
    }

    pub fn handle_touch_end(&mut self, event: &InputEvent) -> Option<Transition> {
        let direction = self.swipe.end(event)?;
        self.request_step(direction)
    }

    /// Drops a half-finished swipe, e.g. one that straddled a scroll lock.
    pub fn cancel_touch(&mut self) {
        self.swipe.cancel();
    }

    fn commit(&mut self, section: usize, sub_index: u32) -> Transition {
        let kind = if section == self.current {
            TransitionKind::SubStep
        } else {
            TransitionKind::Section
        };
        let settle = match kind {
            TransitionKind::SubStep => self.sub_step_settle,
            TransitionKind::Section => self.section_settle,
        };

        let from = self.location();
        self.current = section;
        self.sub_index = sub_index;
        self.settle_until = Some(self.clock.now() + settle);
        let to = self.location();

        debug!(
            from = %from.section,
            from_sub = from.sub_index,
            to = %to.section,
            to_sub = to.sub_index,
            ?kind,
            "section transition"
        );

        Transition {
            from,
            to,
            kind,
            settle,
        }
    }

    fn location(&self) -> Location {
        Location {
            section: self.current_section().id.clone(),
            sub_index: self.sub_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{input::Point, timeline::ManualClock};

    fn sequencer() -> (Sequencer<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let sequencer = Sequencer::new(&SequencerConfig::default(), clock.clone()).unwrap();
        (sequencer, clock)
    }

    /// Steps and waits long enough for any settle deadline to pass.
    fn step(
        sequencer: &mut Sequencer<ManualClock>,
        clock: &ManualClock,
        direction: Direction,
    ) -> Option<Transition> {
        let transition = sequencer.request_step(direction);
        clock.advance_ms(1200);
        transition
    }

    fn at(sequencer: &Sequencer<ManualClock>) -> (String, u32) {
        let state = sequencer.state();
        (state.current_section.to_string(), state.sub_index)
    }

    #[test]
    fn walks_the_full_sequence_forward() {
        let (mut sequencer, clock) = sequencer();
        let mut visited = vec![at(&sequencer)];
        for _ in 0..5 {
            step(&mut sequencer, &clock, Direction::Forward).unwrap();
            visited.push(at(&sequencer));
        }

        let expected: Vec<(String, u32)> = [
            ("hero", 0),
            ("feature-grid", 0),
            ("feature-grid", 1),
            ("feature-grid", 2),
            ("feature-grid", 3),
            ("statement", 0),
        ]
        .into_iter()
        .map(|(s, i)| (s.to_string(), i))
        .collect();
        assert_eq!(visited, expected);

        assert!(step(&mut sequencer, &clock, Direction::Forward).is_none());
        assert_eq!(at(&sequencer), ("statement".to_string(), 0));
    }

    #[test]
    fn backward_from_first_section_is_a_no_op() {
        let (mut sequencer, _clock) = sequencer();
        assert!(sequencer.request_step(Direction::Backward).is_none());
        assert!(!sequencer.is_animating());
        assert_eq!(at(&sequencer), ("hero".to_string(), 0));
    }

    #[test]
    fn reverse_traversal_restores_last_sub_state() {
        let (mut sequencer, clock) = sequencer();
        for _ in 0..5 {
            step(&mut sequencer, &clock, Direction::Forward);
        }
        assert_eq!(at(&sequencer), ("statement".to_string(), 0));

        let back = step(&mut sequencer, &clock, Direction::Backward).unwrap();
        assert_eq!(back.kind, TransitionKind::Section);
        assert_eq!(at(&sequencer), ("feature-grid".to_string(), 3));

        for _ in 0..3 {
            step(&mut sequencer, &clock, Direction::Backward);
        }
        assert_eq!(at(&sequencer), ("feature-grid".to_string(), 0));
        step(&mut sequencer, &clock, Direction::Backward);
        assert_eq!(at(&sequencer), ("hero".to_string(), 0));
    }

    #[test]
    fn steps_while_animating_are_dropped() {
        let (mut sequencer, clock) = sequencer();
        sequencer.request_step(Direction::Forward).unwrap();
        let snapshot = sequencer.state();
        assert!(snapshot.is_animating);

        for direction in [Direction::Forward, Direction::Backward, Direction::Forward] {
            clock.advance_ms(100);
            assert!(sequencer.request_step(direction).is_none());
        }
        assert!(sequencer.navigate_to_section("statement", 0).is_none());
        assert_eq!(sequencer.state(), snapshot);
    }

    #[test]
    fn settle_time_depends_on_transition_kind() {
        let (mut sequencer, clock) = sequencer();
        let cross = sequencer.request_step(Direction::Forward).unwrap();
        assert_eq!(cross.settle, Duration::from_millis(1200));

        clock.advance_ms(1199);
        assert!(sequencer.is_animating());
        clock.advance_ms(1);
        assert!(!sequencer.is_animating());

        let intra = sequencer.request_step(Direction::Forward).unwrap();
        assert_eq!(intra.kind, TransitionKind::SubStep);
        assert_eq!(intra.settle, Duration::from_millis(800));
        clock.advance_ms(800);
        assert!(sequencer.poll());
        assert!(!sequencer.poll());
    }

    #[test]
    fn direct_jumps_validate_their_target() {
        let (mut sequencer, clock) = sequencer();
        assert!(sequencer.navigate_to_section("pricing", 0).is_none());
        assert!(sequencer.navigate_to_section("feature-grid", 4).is_none());
        assert!(sequencer.navigate_to_section("hero", 0).is_none());
        assert!(!sequencer.is_animating());

        let jump = sequencer.navigate_to_section("statement", 0).unwrap();
        assert_eq!(jump.kind, TransitionKind::Section);
        assert!(sequencer.is_animating());
        clock.advance_ms(1200);

        let jump = sequencer.navigate_to_section("feature-grid", 2).unwrap();
        assert_eq!(jump.to.sub_index, 2);
        clock.advance_ms(1200);
        let within = sequencer.navigate_to_section("feature-grid", 0).unwrap();
        assert_eq!(within.kind, TransitionKind::SubStep);
    }

    #[test]
    fn wheel_bursts_produce_one_step_per_window() {
        let (mut sequencer, clock) = sequencer();
        let mut accepted = 0;
        for _ in 0..30 {
            if sequencer.handle_wheel(120.0).is_some() {
                accepted += 1;
            }
            clock.advance_ms(50);
        }
        // The gate also opens at 0.5 s and 1.0 s, but both fall inside the
        // 1.2 s settle of the first step.
        assert_eq!(accepted, 1);
        assert_eq!(at(&sequencer), ("feature-grid".to_string(), 0));
    }

    #[test]
    fn swipes_step_in_the_matching_direction() {
        let (mut sequencer, clock) = sequencer();
        let start = |y| InputEvent::TouchStart {
            touches: vec![Point::new(0.0, y)],
            target: None,
        };
        let end = |y| InputEvent::TouchEnd {
            changed_touches: vec![Point::new(0.0, y)],
            target: None,
        };

        sequencer.handle_touch_start(&start(500.0));
        assert!(sequencer.handle_touch_end(&end(460.0)).is_none());

        sequencer.handle_touch_start(&start(500.0));
        let forward = sequencer.handle_touch_end(&end(200.0)).unwrap();
        assert_eq!(forward.to.section.as_str(), "feature-grid");
        clock.advance_ms(1200);

        sequencer.handle_touch_start(&start(200.0));
        let backward = sequencer.handle_touch_end(&end(600.0)).unwrap();
        assert_eq!(backward.to.section.as_str(), "hero");
    }

    #[test]
    fn generalises_to_sub_steps_everywhere() {
        let config = SequencerConfig {
            sections: vec![
                SectionSpec::new("intro", 2),
                SectionSpec::new("outro", 1),
            ],
            ..SequencerConfig::default()
        };
        let clock = ManualClock::new();
        let mut sequencer = Sequencer::new(&config, clock.clone()).unwrap();
        for _ in 0..3 {
            step(&mut sequencer, &clock, Direction::Forward);
        }
        assert_eq!(at(&sequencer), ("outro".to_string(), 0));
        step(&mut sequencer, &clock, Direction::Backward);
        assert_eq!(at(&sequencer), ("intro".to_string(), 2));
    }

    #[test]
    fn empty_section_list_is_rejected() {
        let config = SequencerConfig {
            sections: Vec::new(),
            ..SequencerConfig::default()
        };
        assert!(Sequencer::new(&config, ManualClock::new()).is_err());
    }
}
