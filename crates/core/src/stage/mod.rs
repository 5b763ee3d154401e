//! Page-level composition root.
//!
//! A [`Stage`] owns every piece of mutable state for one mounted page: the
//! tween engine, the element graph, the section sequencer, the carousel and
//! the detail overlay. Input arrives through [`Stage::dispatch`] and is routed
//! by the listener subscriptions registered at mount time; [`Stage::frame`]
//! advances animation and commits the result to element styles.
//!
//! Everything registered by [`Stage::mount`] is released by
//! [`Stage::unmount`], which leaves the listener and ticker registries empty.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    carousel::{Carousel, CarouselItem, Gesture},
    config::AppConfig,
    error::Result,
    input::InputEvent,
    overlay::{CloseReason, DetailOverlay},
    render::{ElementId, EventKind, ListenerScope, RenderGraph, SubscriptionId},
    scene::SceneBinder,
    sequencer::{NavigationState, SectionId, Sequencer, Transition},
    timeline::{Clock, FrameInfo, FrameTicker, TickerId},
    tween::TweenEngine,
};

/// Header navigation entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    pub label: String,
    pub section: SectionId,
}

impl NavLink {
    pub fn new(label: impl Into<String>, section: &str) -> Self {
        Self {
            label: label.into(),
            section: SectionId::from(section),
        }
    }

    pub fn defaults() -> Vec<Self> {
        vec![
            NavLink::new("Home", "hero"),
            NavLink::new("Services", "feature-grid"),
            NavLink::new("About", "statement"),
        ]
    }
}

/// Observable outcome of a dispatched event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageEvent {
    Transition(Transition),
    OverlayOpened { item: u32, label: String },
    OverlayClosed { reason: CloseReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    SequencerWheel,
    SequencerTouchStart,
    SequencerTouchEnd,
    CarouselWheel,
    CarouselPress,
    CarouselMove,
    CarouselRelease,
    OverlayClick,
    OverlayKey,
    Resize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameJob {
    Carousel,
    Overlay,
    Scene,
}

pub struct Stage<C: Clock + Clone> {
    config: AppConfig,
    clock: C,
    engine: TweenEngine,
    graph: RenderGraph,
    ticker: FrameTicker,
    sequencer: Sequencer<C>,
    scene: SceneBinder,
    carousel: Carousel,
    overlay: DetailOverlay,
    subscriptions: Vec<(SubscriptionId, Handler)>,
    jobs: Vec<(TickerId, FrameJob)>,
    mounted: bool,
}

impl<C: Clock + Clone> Stage<C> {
    /// Validates `config`, builds the element tree and registers listeners
    /// and frame callbacks.
    pub fn mount(config: AppConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let mut engine = TweenEngine::new();
        engine.advance(clock.now());
        let mut graph = RenderGraph::new();
        let mut ticker = FrameTicker::new();

        let sequencer = Sequencer::new(&config.sequencer, clock.clone())?;
        let mut scene = SceneBinder::build(sequencer.sections(), &mut graph);
        let carousel_parent = scene
            .layouts()
            .first()
            .map(|layout| layout.root)
            .unwrap_or_else(|| graph.root());
        let mut carousel = Carousel::build(&config.carousel, carousel_parent, &mut graph, &mut engine);
        let overlay = DetailOverlay::build(&config.overlay, &mut graph, &mut engine);

        // Element-scoped listeners come first so they see an event before
        // the window-level ones.
        let carousel_scope = ListenerScope::Element(carousel.root());
        let routes = [
            (carousel_scope, EventKind::Wheel, Handler::CarouselWheel),
            (carousel_scope, EventKind::PointerDown, Handler::CarouselPress),
            (carousel_scope, EventKind::TouchStart, Handler::CarouselPress),
            (
                ListenerScope::Element(overlay.backdrop()),
                EventKind::Click,
                Handler::OverlayClick,
            ),
            (ListenerScope::Window, EventKind::PointerMove, Handler::CarouselMove),
            (ListenerScope::Window, EventKind::TouchMove, Handler::CarouselMove),
            (ListenerScope::Window, EventKind::PointerUp, Handler::CarouselRelease),
            (ListenerScope::Window, EventKind::TouchEnd, Handler::CarouselRelease),
            (ListenerScope::Window, EventKind::Wheel, Handler::SequencerWheel),
            (ListenerScope::Window, EventKind::TouchStart, Handler::SequencerTouchStart),
            (ListenerScope::Window, EventKind::TouchEnd, Handler::SequencerTouchEnd),
            (ListenerScope::Window, EventKind::KeyDown, Handler::OverlayKey),
            (ListenerScope::Window, EventKind::Resize, Handler::Resize),
        ];
        let subscriptions = routes
            .into_iter()
            .map(|(scope, kind, handler)| (graph.subscribe(scope, kind), handler))
            .collect();

        let jobs = vec![
            (ticker.add("carousel"), FrameJob::Carousel),
            (ticker.add("overlay"), FrameJob::Overlay),
            (ticker.add("scene"), FrameJob::Scene),
        ];

        carousel.start(&mut engine);
        scene.sync(&sequencer.state(), &mut engine, &mut graph);
        carousel.on_frame(&mut engine);
        graph.commit(&engine);

        info!(
            sections = sequencer.sections().len(),
            items = carousel.items().len(),
            listeners = graph.listener_count(),
            "stage mounted"
        );

        Ok(Self {
            config,
            clock,
            engine,
            graph,
            ticker,
            sequencer,
            scene,
            carousel,
            overlay,
            subscriptions,
            jobs,
            mounted: true,
        })
    }

    /// Tears down listeners, frame callbacks and tweens. Safe to call twice.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        for (subscription, _) in self.subscriptions.drain(..) {
            self.graph.unsubscribe(subscription);
        }
        for (id, _) in self.jobs.drain(..) {
            self.ticker.remove(id);
        }
        self.carousel.stop(&mut self.engine, &mut self.graph);
        let killed = self.engine.kill_all();
        self.graph.unlock_scroll();
        self.mounted = false;
        info!(killed, "stage unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Routes `event` to every subscription that accepts it.
    pub fn dispatch(&mut self, event: &InputEvent) -> Vec<StageEvent> {
        let mut out = Vec::new();
        if !self.mounted {
            return out;
        }

        let kind = event.kind();
        let target = event.target();
        let handlers: Vec<Handler> = self
            .subscriptions
            .iter()
            .filter(|(subscription, _)| self.graph.delivers(*subscription, kind, target))
            .map(|(_, handler)| *handler)
            .collect();

        for handler in handlers {
            self.handle(handler, event, &mut out);
        }
        out
    }

    fn handle(&mut self, handler: Handler, event: &InputEvent, out: &mut Vec<StageEvent>) {
        let now = self.clock.now();
        let scroll_locked = self.graph.is_scroll_locked();

        match (handler, event) {
            (Handler::SequencerWheel, InputEvent::Wheel { delta_y, .. }) if !scroll_locked => {
                let transition = self.sequencer.handle_wheel(*delta_y);
                self.apply_transition(transition, out);
            }
            (Handler::SequencerTouchStart, _) if !scroll_locked => {
                self.sequencer.handle_touch_start(event);
            }
            (Handler::SequencerTouchEnd, _) if !scroll_locked => {
                let transition = self.sequencer.handle_touch_end(event);
                self.apply_transition(transition, out);
            }
            (Handler::SequencerTouchStart | Handler::SequencerTouchEnd, _) => {
                self.sequencer.cancel_touch();
            }
            (Handler::CarouselWheel, InputEvent::Wheel { delta_y, .. }) => {
                self.carousel.handle_wheel(*delta_y, &mut self.engine);
            }
            (Handler::CarouselPress, _) => {
                self.carousel
                    .pointer_down(event.point(), event.target(), now, &mut self.graph);
            }
            (Handler::CarouselMove, _) => {
                // A move without coordinates carries no displacement.
                if let Some(point) = event.position() {
                    self.carousel.pointer_move(point, &mut self.engine);
                }
            }
            (Handler::CarouselRelease, _) => {
                let gesture =
                    self.carousel
                        .pointer_up(event.position(), event.target(), now, &mut self.graph);
                if let Gesture::Tap(index) = gesture {
                    self.open_item(index, out);
                }
            }
            (Handler::OverlayClick, _) => {
                if let Some(reason) = self
                    .overlay
                    .close_reason_for_click(event.target(), &self.graph)
                {
                    self.close_overlay(reason, out);
                }
            }
            (Handler::OverlayKey, InputEvent::KeyDown { key }) => {
                if let Some(reason) = self.overlay.close_reason_for_key(key) {
                    self.close_overlay(reason, out);
                }
            }
            (Handler::Resize, InputEvent::Resize { width, height }) => {
                self.graph.resize(*width, *height);
            }
            _ => {}
        }
    }

    fn apply_transition(&mut self, transition: Option<Transition>, out: &mut Vec<StageEvent>) {
        if let Some(transition) = transition {
            self.scene
                .sync(&self.sequencer.state(), &mut self.engine, &mut self.graph);
            out.push(StageEvent::Transition(transition));
        }
    }

    fn open_item(&mut self, index: usize, out: &mut Vec<StageEvent>) {
        let Some(item) = self.carousel.item(index).cloned() else {
            return;
        };
        let opened = StageEvent::OverlayOpened {
            item: item.id,
            label: item.label.clone(),
        };
        if self.overlay.open(item, &mut self.engine, &mut self.graph) {
            out.push(opened);
        }
    }

    fn close_overlay(&mut self, reason: CloseReason, out: &mut Vec<StageEvent>) {
        if self.overlay.close(reason, &mut self.engine, &mut self.graph) {
            out.push(StageEvent::OverlayClosed { reason });
        }
    }

    /// Runs one display frame at the clock's current time.
    pub fn frame(&mut self) -> FrameInfo {
        let now = self.clock.now();
        let info = self.ticker.tick(now);
        self.engine.advance(now);

        for (id, job) in self.jobs.clone() {
            if !self.ticker.is_registered(id) {
                continue;
            }
            match job {
                FrameJob::Carousel => self.carousel.on_frame(&mut self.engine),
                FrameJob::Overlay => self.overlay.on_frame(&self.engine, &mut self.graph),
                FrameJob::Scene => {
                    self.sequencer.poll();
                    self.scene
                        .sync(&self.sequencer.state(), &mut self.engine, &mut self.graph);
                }
            }
        }

        self.graph.commit(&self.engine);
        info
    }

    /// Jumps to the start of `section`. Returns `None` when the jump was
    /// refused (unknown section, already there, or a transition settling).
    pub fn navigate_to_section(&mut self, section: &str) -> Option<Transition> {
        if !self.mounted {
            return None;
        }
        let transition = self.sequencer.navigate_to_section(section, 0);
        if transition.is_some() {
            self.scene
                .sync(&self.sequencer.state(), &mut self.engine, &mut self.graph);
        }
        transition
    }

    /// Activates the header link labelled `label` (case-insensitive).
    pub fn follow_nav_link(&mut self, label: &str) -> Option<Transition> {
        let section = self
            .config
            .nav
            .iter()
            .find(|link| link.label.eq_ignore_ascii_case(label))
            .map(|link| link.section.clone());
        match section {
            Some(section) => self.navigate_to_section(section.as_str()),
            None => {
                debug!(label, "unknown nav link");
                None
            }
        }
    }

    pub fn state(&self) -> NavigationState {
        self.sequencer.state()
    }

    pub fn overlay_selection(&self) -> Option<&CarouselItem> {
        self.overlay.selected()
    }

    pub fn nav_links(&self) -> &[NavLink] {
        &self.config.nav
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn element(&self, name: &str) -> Option<ElementId> {
        self.graph.element_by_name(name)
    }

    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    pub fn engine(&self) -> &TweenEngine {
        &self.engine
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn overlay(&self) -> &DetailOverlay {
        &self.overlay
    }

    pub fn scene(&self) -> &SceneBinder {
        &self.scene
    }

    pub fn listener_count(&self) -> usize {
        self.graph.listener_count()
    }

    pub fn ticker_count(&self) -> usize {
        self.ticker.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        carousel::project,
        input::{Key, Point},
        overlay::OverlayPhase,
        sequencer::TransitionKind,
        timeline::ManualClock,
        tween::Property,
    };

    fn mounted() -> (Stage<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let stage = Stage::mount(AppConfig::default(), clock.clone()).unwrap();
        (stage, clock)
    }

    fn wheel(delta_y: f32, target: Option<ElementId>) -> InputEvent {
        InputEvent::Wheel { delta_y, target }
    }

    fn tap(stage: &mut Stage<ManualClock>, clock: &ManualClock, element: ElementId) -> Vec<StageEvent> {
        let at = Some(Point::new(100.0, 100.0));
        stage.dispatch(&InputEvent::PointerDown {
            position: at,
            target: Some(element),
        });
        clock.advance_ms(80);
        stage.dispatch(&InputEvent::PointerUp {
            position: at,
            target: Some(element),
        })
    }

    #[test]
    fn mount_registers_and_unmount_releases_everything() {
        let (mut stage, _clock) = mounted();
        assert_eq!(stage.listener_count(), 13);
        assert_eq!(stage.ticker_count(), 3);
        assert!(stage.engine().active_count() > 0);

        stage.unmount();
        assert_eq!(stage.listener_count(), 0);
        assert_eq!(stage.ticker_count(), 0);
        assert_eq!(stage.engine().active_count(), 0);
        assert!(!stage.is_mounted());

        stage.unmount();
        assert!(stage.dispatch(&wheel(100.0, None)).is_empty());
    }

    #[test]
    fn wheel_burst_advances_one_step() {
        let (mut stage, clock) = mounted();
        let mut transitions = 0;
        for _ in 0..10 {
            transitions += stage.dispatch(&wheel(120.0, None)).len();
            clock.advance_ms(20);
        }
        assert_eq!(transitions, 1);
        let state = stage.state();
        assert_eq!(state.current_section.as_str(), "feature-grid");
        assert_eq!(state.sub_index, 0);
        assert!(state.is_animating);
    }

    #[test]
    fn walks_sub_steps_then_leaves_section() {
        let (mut stage, clock) = mounted();
        let mut kinds = Vec::new();
        for _ in 0..6 {
            for event in stage.dispatch(&wheel(120.0, None)) {
                if let StageEvent::Transition(transition) = event {
                    kinds.push(transition.kind);
                }
            }
            clock.advance_ms(1300);
            stage.frame();
        }
        assert_eq!(
            kinds,
            vec![
                TransitionKind::Section,
                TransitionKind::SubStep,
                TransitionKind::SubStep,
                TransitionKind::SubStep,
                TransitionKind::Section,
            ]
        );
        assert_eq!(stage.state().current_section.as_str(), "statement");
    }

    #[test]
    fn swipe_moves_between_sections() {
        let (mut stage, clock) = mounted();
        stage.dispatch(&InputEvent::TouchStart {
            touches: vec![Point::new(10.0, 600.0)],
            target: None,
        });
        let events = stage.dispatch(&InputEvent::TouchEnd {
            changed_touches: vec![Point::new(10.0, 200.0)],
            target: None,
        });
        assert_eq!(events.len(), 1);
        assert_eq!(stage.state().current_section.as_str(), "feature-grid");

        clock.advance_ms(1500);
        stage.dispatch(&InputEvent::TouchStart {
            touches: vec![Point::new(10.0, 200.0)],
            target: None,
        });
        stage.dispatch(&InputEvent::TouchEnd {
            changed_touches: vec![Point::new(10.0, 600.0)],
            target: None,
        });
        assert_eq!(stage.state().current_section.as_str(), "hero");
    }

    #[test]
    fn nav_links_jump_directly() {
        let (mut stage, clock) = mounted();
        let transition = stage.follow_nav_link("about").unwrap();
        assert_eq!(transition.to.section.as_str(), "statement");
        assert_eq!(transition.kind, TransitionKind::Section);

        assert!(stage.follow_nav_link("Home").is_none());
        clock.advance_ms(1300);
        assert!(stage.follow_nav_link("Home").is_some());
        clock.advance_ms(1300);
        assert!(stage.follow_nav_link("Careers").is_none());
        assert!(stage.navigate_to_section("hero").is_none());
    }

    #[test]
    fn carousel_wheel_runs_a_single_progress_tween() {
        let (mut stage, clock) = mounted();
        let root = stage.carousel().root();
        let progress = stage.carousel().progress();
        for _ in 0..5 {
            stage.dispatch(&wheel(100.0, Some(root)));
            clock.advance_ms(16);
            stage.frame();
        }
        assert_eq!(stage.engine().tweens_of(progress.id()), 1);
        clock.advance_ms(3000);
        stage.frame();
        assert!(!progress.is_tweening(stage.engine()));
        // Wheel deltas rotate backwards; idle rotation only adds a little.
        assert!(progress.value(stage.engine()) < 0.0);
    }

    #[test]
    fn tap_opens_overlay_and_locks_scroll() {
        let (mut stage, clock) = mounted();
        let item = stage.carousel().item_elements()[2];
        let events = tap(&mut stage, &clock, item);
        assert_eq!(
            events,
            vec![StageEvent::OverlayOpened {
                item: 3,
                label: stage.carousel().items()[2].label.clone(),
            }]
        );
        assert!(stage.graph().is_scroll_locked());
        assert_eq!(stage.overlay_selection().map(|item| item.id), Some(3));

        clock.advance_ms(2000);
        assert!(stage.dispatch(&wheel(120.0, None)).is_empty());
        assert_eq!(stage.state().current_section.as_str(), "hero");
    }

    #[test]
    fn drag_does_not_open_overlay() {
        let (mut stage, clock) = mounted();
        let item = stage.carousel().item_elements()[0];
        stage.dispatch(&InputEvent::PointerDown {
            position: Some(Point::new(100.0, 100.0)),
            target: Some(item),
        });
        stage.dispatch(&InputEvent::PointerMove {
            position: Some(Point::new(160.0, 100.0)),
            target: None,
        });
        clock.advance_ms(50);
        let events = stage.dispatch(&InputEvent::PointerUp {
            position: Some(Point::new(160.0, 100.0)),
            target: Some(item),
        });
        assert!(events.is_empty());
        assert!(!stage.overlay().is_open());
        assert!(stage.carousel().progress().is_tweening(stage.engine()));
    }

    #[test]
    fn every_close_path_restores_scroll() {
        let closers: [fn(&Stage<ManualClock>) -> InputEvent; 3] = [
            |stage| InputEvent::Click {
                target: Some(stage.overlay().backdrop()),
            },
            |stage| InputEvent::Click {
                target: Some(stage.overlay().close_control()),
            },
            |_| InputEvent::KeyDown { key: Key::Escape },
        ];
        let expected = [
            CloseReason::Backdrop,
            CloseReason::CloseControl,
            CloseReason::Escape,
        ];

        for (closer, reason) in closers.iter().zip(expected) {
            let (mut stage, clock) = mounted();
            let item = stage.carousel().item_elements()[1];
            tap(&mut stage, &clock, item);

            let inside = InputEvent::Click {
                target: Some(stage.overlay().content()),
            };
            assert!(stage.dispatch(&inside).is_empty());
            assert!(stage.overlay().is_open());

            let event = closer(&stage);
            assert_eq!(
                stage.dispatch(&event),
                vec![StageEvent::OverlayClosed { reason }]
            );
            assert!(!stage.graph().is_scroll_locked());
            assert!(stage.overlay_selection().is_none());

            clock.advance_ms(1000);
            stage.frame();
            assert_eq!(stage.overlay().phase(), OverlayPhase::Closed);
        }
    }

    #[test]
    fn frames_project_items_onto_styles() {
        let (mut stage, clock) = mounted();
        clock.advance(Duration::from_millis(16));
        let info = stage.frame();
        assert_eq!(info.frame, 1);

        let first = stage.carousel().item_elements()[0];
        let style = stage.graph().style(first).unwrap();
        let progress = stage.carousel().progress().value(stage.engine());
        let expected = project(0, 8, progress, 280.0);
        assert!((style.transform.scale - expected.scale).abs() < 1e-3);
        // Slot 0 sits at the front of the ring.
        assert!(style.transform.scale > 1.0);
        assert_eq!(
            style.opacity,
            stage.engine().get(first, Property::Opacity)
        );
    }

    #[test]
    fn swipe_started_before_overlay_does_not_leak() {
        let (mut stage, clock) = mounted();
        let item = stage.carousel().item_elements()[0];
        let at = vec![Point::new(200.0, 500.0)];
        stage.dispatch(&InputEvent::TouchStart {
            touches: at.clone(),
            target: Some(item),
        });
        clock.advance_ms(60);
        let opened = stage.dispatch(&InputEvent::TouchEnd {
            changed_touches: at,
            target: Some(item),
        });
        assert!(matches!(opened.as_slice(), [StageEvent::OverlayOpened { .. }]));

        stage.dispatch(&InputEvent::KeyDown { key: Key::Escape });
        clock.advance_ms(2000);
        let events = stage.dispatch(&InputEvent::TouchEnd {
            changed_touches: vec![Point::new(200.0, 100.0)],
            target: None,
        });
        assert!(events.is_empty());
        assert_eq!(stage.state().current_section.as_str(), "hero");
    }

    #[test]
    fn resize_updates_viewport() {
        let (mut stage, _clock) = mounted();
        stage.dispatch(&InputEvent::Resize {
            width: 390.0,
            height: 844.0,
        });
        assert_eq!(stage.graph().viewport(), (390.0, 844.0));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.carousel.items.clear();
        assert!(Stage::mount(config, ManualClock::new()).is_err());
    }
}
