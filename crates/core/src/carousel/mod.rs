//! Rotating 3D carousel.
//!
//! N items sit on a circle; a single unbounded rotation scalar decides where
//! each one is. The scalar creeps forward on idle frames and is pushed by
//! wheel and drag input through short eased tweens, each of which replaces
//! the previous one.

use std::{f32::consts::TAU, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    config::CarouselConfig,
    input::Point,
    render::{Cursor, ElementId, RenderGraph},
    tween::{Ease, Property, Repeat, ScalarId, TweenEngine, TweenId, TweenSpec},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselItem {
    pub id: u32,
    pub number: String,
    pub label: String,
    pub image: String,
}

impl CarouselItem {
    pub fn new(id: u32, label: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            id,
            number: format!("{id:02}"),
            label: label.into(),
            image: image.into(),
        }
    }

    /// The eight service tiles shown on the landing page.
    pub fn defaults() -> Vec<Self> {
        [
            "BRAND STRATEGY",
            "CONTENT MARKETING",
            "SOCIAL ADVERTISING",
            "EMAIL CAMPAIGNS",
            "SEARCH OPTIMIZATION",
            "INFLUENCER MARKETING",
            "MARKET RESEARCH",
            "CREATIVE DIRECTION",
        ]
        .into_iter()
        .zip(1u32..)
        .map(|(label, id)| {
            Self::new(id, label, format!("https://picsum.photos/600/800?random={id}"))
        })
        .collect()
    }
}

/// Where one item sits for a given rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub x: f32,
    pub z: f32,
    /// Degrees around the vertical axis.
    pub rotation_y: f32,
    pub scale: f32,
    pub opacity: f32,
}

/// Places item `index` of `count` on a circle of `radius` for `progress`
/// turns of rotation. Items nearer the viewer (`z` toward `+radius`) come out
/// larger and more opaque.
pub fn project(index: usize, count: usize, progress: f32, radius: f32) -> Projection {
    let count = count.max(1);
    let theta = index as f32 / count as f32 - progress;
    let angle = theta * TAU;
    let x = -angle.sin() * radius;
    let z = angle.cos() * radius;

    let depth = if radius > 0.0 { z / (radius * 2.0) } else { 0.0 };
    Projection {
        x,
        z,
        rotation_y: -360.0 * theta,
        scale: 1.0 + depth * 0.2,
        opacity: 0.7 + (depth + 0.5) * 0.3,
    }
}

/// Handle to the rotation scalar stored in the tween engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationProgress {
    id: ScalarId,
}

impl RotationProgress {
    pub fn new(engine: &mut TweenEngine) -> Self {
        Self {
            id: engine.scalar(0.0),
        }
    }

    pub fn id(&self) -> ScalarId {
        self.id
    }

    pub fn value(&self, engine: &TweenEngine) -> f32 {
        engine.get(self.id, Property::Value)
    }

    pub fn is_tweening(&self, engine: &TweenEngine) -> bool {
        engine.is_tweening(self.id)
    }

    /// Replaces any in-flight tween with one that moves by `delta` turns.
    pub fn push(&self, engine: &mut TweenEngine, delta: f32, spec: TweenSpec) -> TweenId {
        engine.kill_tweens_of(self.id);
        engine.by(self.id, &[(Property::Value, delta)], spec)
    }

    /// Moves instantly, without tweening.
    pub fn advance(&self, engine: &mut TweenEngine, delta: f32) {
        let value = self.value(engine);
        engine.set(self.id, Property::Value, value + delta);
    }
}

#[derive(Debug, Clone)]
struct DragState {
    last: Point,
    travel: f32,
    started_at: Duration,
    pressed_item: Option<usize>,
}

/// Outcome of releasing the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Release without a matching press.
    Stray,
    Drag,
    /// Short, still press on the item at this index.
    Tap(usize),
}

#[derive(Debug)]
pub struct Carousel {
    config: CarouselConfig,
    root: ElementId,
    item_elements: Vec<ElementId>,
    progress: RotationProgress,
    drag: Option<DragState>,
    float: Option<TweenId>,
}

impl Carousel {
    /// Creates the carousel root under `parent` plus one element per item.
    pub fn build(
        config: &CarouselConfig,
        parent: ElementId,
        graph: &mut RenderGraph,
        engine: &mut TweenEngine,
    ) -> Self {
        let root = graph.create_element("carousel", parent);
        graph.set_cursor(root, Cursor::Grab);
        let item_elements = config
            .items
            .iter()
            .map(|item| graph.create_element(format!("carousel-item-{}", item.id), root))
            .collect();

        Self {
            config: config.clone(),
            root,
            item_elements,
            progress: RotationProgress::new(engine),
            drag: None,
            float: None,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn items(&self) -> &[CarouselItem] {
        &self.config.items
    }

    pub fn item(&self, index: usize) -> Option<&CarouselItem> {
        self.config.items.get(index)
    }

    pub fn item_elements(&self) -> &[ElementId] {
        &self.item_elements
    }

    pub fn progress(&self) -> RotationProgress {
        self.progress
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Index of the item that contains `target`, if any.
    pub fn item_at(&self, target: ElementId, graph: &RenderGraph) -> Option<usize> {
        self.item_elements
            .iter()
            .position(|element| graph.is_within(target, *element))
    }

    /// Starts the vertical float loop.
    pub fn start(&mut self, engine: &mut TweenEngine) {
        if let Some(float) = self.float.take() {
            engine.kill(float);
        }
        let spec = TweenSpec::secs(self.config.float_period_secs, Ease::SineInOut)
            .with_repeat(Repeat::Infinite)
            .with_yoyo(true);
        self.float = Some(engine.to(
            self.root,
            &[(Property::Y, self.config.float_offset_px)],
            spec,
        ));
    }

    /// Kills every tween the carousel owns and drops any drag in progress.
    pub fn stop(&mut self, engine: &mut TweenEngine, graph: &mut RenderGraph) {
        self.float = None;
        engine.kill_tweens_of(self.root);
        engine.kill_tweens_of(self.progress.id());
        if self.drag.take().is_some() {
            graph.set_cursor(self.root, Cursor::Grab);
        }
    }

    pub fn handle_wheel(&mut self, delta_y: f32, engine: &mut TweenEngine) -> TweenId {
        let delta = delta_y * self.config.wheel_factor;
        trace!(delta_y, delta, "carousel wheel");
        self.progress.push(
            engine,
            delta,
            TweenSpec::secs(self.config.wheel_tween_secs, self.config.wheel_ease),
        )
    }

    pub fn pointer_down(
        &mut self,
        point: Point,
        target: Option<ElementId>,
        now: Duration,
        graph: &mut RenderGraph,
    ) {
        let pressed_item = match target {
            Some(target) => self.item_at(target, graph),
            None => None,
        };
        self.drag = Some(DragState {
            last: point,
            travel: 0.0,
            started_at: now,
            pressed_item,
        });
        graph.set_cursor(self.root, Cursor::Grabbing);
        debug!(?pressed_item, "carousel drag start");
    }

    pub fn pointer_move(&mut self, point: Point, engine: &mut TweenEngine) {
        let Some(drag) = self.drag.as_mut() else {
            return;
        };

        let dx = point.x - drag.last.x;
        let dy = point.y - drag.last.y;
        drag.travel += dx.hypot(dy);
        drag.last = point;

        // Vertical-only motion must not cut short an in-flight spin.
        if dx == 0.0 {
            return;
        }
        self.progress.push(
            engine,
            dx * self.config.drag_factor,
            TweenSpec::secs(self.config.drag_tween_secs, self.config.drag_ease),
        );
    }

    /// Ends the gesture. A press counts as a tap only if the pointer moved
    /// no further than the slop **and** was released before the tap
    /// timeout, over the item it was pressed on.
    pub fn pointer_up(
        &mut self,
        point: Option<Point>,
        target: Option<ElementId>,
        now: Duration,
        graph: &mut RenderGraph,
    ) -> Gesture {
        let Some(drag) = self.drag.take() else {
            return Gesture::Stray;
        };
        graph.set_cursor(self.root, Cursor::Grab);

        let travel = drag.travel
            + point
                .map(|point| (point.x - drag.last.x).hypot(point.y - drag.last.y))
                .unwrap_or_default();
        let elapsed = now.saturating_sub(drag.started_at);
        let still = travel <= self.config.tap_slop_px;
        let quick = elapsed < Duration::from_millis(self.config.tap_max_ms);

        let released_on = match target {
            Some(target) => self.item_at(target, graph),
            None => drag.pressed_item,
        };

        let gesture = match drag.pressed_item {
            Some(item) if still && quick && released_on == Some(item) => Gesture::Tap(item),
            _ => Gesture::Drag,
        };
        debug!(travel, elapsed_ms = elapsed.as_millis() as u64, ?gesture, "carousel release");
        gesture
    }

    /// Per-frame update: idle rotation, then projection of every item.
    pub fn on_frame(&mut self, engine: &mut TweenEngine) {
        if !self.progress.is_tweening(engine) && self.drag.is_none() {
            self.progress.advance(engine, self.config.auto_speed);
        }

        let progress = self.progress.value(engine);
        let count = self.item_elements.len();
        for (index, element) in self.item_elements.iter().copied().enumerate() {
            let projection = project(index, count, progress, self.config.radius);
            engine.set(element, Property::X, projection.x);
            engine.set(element, Property::Z, projection.z);
            engine.set(element, Property::RotateY, projection.rotation_y);
            engine.set(element, Property::Scale, projection.scale);
            engine.set(element, Property::Opacity, projection.opacity);
        }
    }
}
