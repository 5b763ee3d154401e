//! Input event model and gesture normalisation.
//!
//! Raw events may be missing coordinates (a touch-end with no changed
//! touches, a pointer event without client position). Accessors here fall
//! back to the origin rather than rejecting the gesture.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::render::{ElementId, EventKind};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Other(String),
}

/// A single input event as delivered by the host surface. Timestamps come
/// from the stage clock at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Wheel {
        delta_y: f32,
        target: Option<ElementId>,
    },
    PointerDown {
        position: Option<Point>,
        target: Option<ElementId>,
    },
    PointerMove {
        position: Option<Point>,
        target: Option<ElementId>,
    },
    PointerUp {
        position: Option<Point>,
        target: Option<ElementId>,
    },
    TouchStart {
        touches: Vec<Point>,
        target: Option<ElementId>,
    },
    TouchMove {
        touches: Vec<Point>,
        target: Option<ElementId>,
    },
    TouchEnd {
        changed_touches: Vec<Point>,
        target: Option<ElementId>,
    },
    KeyDown {
        key: Key,
    },
    Click {
        target: Option<ElementId>,
    },
    Resize {
        width: f32,
        height: f32,
    },
}

impl InputEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            InputEvent::Wheel { .. } => EventKind::Wheel,
            InputEvent::PointerDown { .. } => EventKind::PointerDown,
            InputEvent::PointerMove { .. } => EventKind::PointerMove,
            InputEvent::PointerUp { .. } => EventKind::PointerUp,
            InputEvent::TouchStart { .. } => EventKind::TouchStart,
            InputEvent::TouchMove { .. } => EventKind::TouchMove,
            InputEvent::TouchEnd { .. } => EventKind::TouchEnd,
            InputEvent::KeyDown { .. } => EventKind::KeyDown,
            InputEvent::Click { .. } => EventKind::Click,
            InputEvent::Resize { .. } => EventKind::Resize,
        }
    }

    pub fn target(&self) -> Option<ElementId> {
        match self {
            InputEvent::Wheel { target, .. }
            | InputEvent::PointerDown { target, .. }
            | InputEvent::PointerMove { target, .. }
            | InputEvent::PointerUp { target, .. }
            | InputEvent::TouchStart { target, .. }
            | InputEvent::TouchMove { target, .. }
            | InputEvent::TouchEnd { target, .. }
            | InputEvent::Click { target } => *target,
            InputEvent::KeyDown { .. } | InputEvent::Resize { .. } => None,
        }
    }

    /// Pointer position, or the first touch point for touch events.
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::PointerDown { position, .. }
            | InputEvent::PointerMove { position, .. }
            | InputEvent::PointerUp { position, .. } => *position,
            InputEvent::TouchStart { touches, .. } | InputEvent::TouchMove { touches, .. } => {
                touches.first().copied()
            }
            InputEvent::TouchEnd {
                changed_touches, ..
            } => changed_touches.first().copied(),
            _ => None,
        }
    }

    /// [`position`](Self::position), falling back to the origin.
    pub fn point(&self) -> Point {
        self.position().unwrap_or_default()
    }
}

/// Direction of a discrete navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    /// Positive deltas scroll the page down, which moves forward.
    pub fn from_delta(delta: f32) -> Option<Self> {
        if delta > 0.0 {
            Some(Direction::Forward)
        } else if delta < 0.0 {
            Some(Direction::Backward)
        } else {
            None
        }
    }
}

/// Leading-edge rate limiter for wheel input: the first event of a burst
/// produces a step and everything within `window` of it is swallowed.
#[derive(Debug, Clone)]
pub struct WheelGate {
    window: Duration,
    last_accepted: Option<Duration>,
}

impl WheelGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    pub fn accept(&mut self, now: Duration, delta_y: f32) -> Option<Direction> {
        let direction = Direction::from_delta(delta_y)?;
        if let Some(last) = self.last_accepted {
            if now.saturating_sub(last) < self.window {
                trace!(?now, "wheel event inside debounce window");
                return None;
            }
        }
        self.last_accepted = Some(now);
        Some(direction)
    }
}

/// Turns a touch-start/touch-end pair into at most one step.
#[derive(Debug, Clone)]
pub struct SwipeTracker {
    threshold: f32,
    start_y: Option<f32>,
}

impl SwipeTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            start_y: None,
        }
    }

    pub fn begin(&mut self, event: &InputEvent) {
        self.start_y = Some(event.point().y);
    }

    /// Finishes the gesture. A finger travelling up the screen by more than
    /// the threshold scrolls forward. An end without a tracked start is
    /// ignored.
    pub fn end(&mut self, event: &InputEvent) -> Option<Direction> {
        let start = self.start_y.take()?;
        let travel = start - event.point().y;
        if travel.abs() > self.threshold {
            Direction::from_delta(travel)
        } else {
            None
        }
    }

    /// Forgets any gesture in progress.
    pub fn cancel(&mut self) {
        self.start_y = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.start_y.is_some()
    }
}
