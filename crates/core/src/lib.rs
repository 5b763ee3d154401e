//! Core library for the ScrollStage landing page engine.
//!
//! The crate models a scroll-sequenced marketing page without a browser:
//! input events drive a section sequencer, a 3D carousel and a detail
//! overlay, while a tween engine produces the animated values that the
//! render graph commits to element styles each frame. Each module owns one
//! subsystem and [`Stage`] wires them together for a mounted page.

pub mod carousel;
pub mod config;
pub mod error;
pub mod input;
pub mod overlay;
pub mod render;
pub mod scene;
pub mod sequencer;
pub mod stage;
pub mod timeline;
pub mod tween;

pub use carousel::{project, Carousel, CarouselItem, Gesture, Projection, RotationProgress};
pub use config::{AppConfig, CarouselConfig, OverlayConfig, SequencerConfig};
pub use error::{Result, ScrollStageError};
pub use input::{Direction, InputEvent, Key, Point};
pub use overlay::{CloseReason, DetailOverlay, OverlayPhase};
pub use render::{ElementId, ElementStyle, EventKind, RenderGraph};
pub use scene::{SceneBinder, SectionLayout};
pub use sequencer::{NavigationState, SectionId, SectionSpec, Sequencer, Transition, TransitionKind};
pub use stage::{NavLink, Stage, StageEvent};
pub use timeline::{Clock, FrameInfo, FrameTicker, ManualClock, ScheduledEvent, Scheduler, SystemClock};
pub use tween::{Ease, Property, Timeline, TweenEngine, TweenSpec};
