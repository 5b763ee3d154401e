use tracing::debug;

use crate::tween::{Property, TweenEngine};

/// Identifier of a node in the [`RenderGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u32);

impl ElementId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// 3D transform applied to an element, in pixels and degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3d {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotate_y: f32,
    pub scale: f32,
}

impl Default for Transform3d {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rotate_y: 0.0,
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Grab,
    Grabbing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementStyle {
    pub transform: Transform3d,
    pub opacity: f32,
    pub visible: bool,
    pub cursor: Cursor,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            transform: Transform3d::default(),
            opacity: 1.0,
            visible: true,
            cursor: Cursor::Default,
        }
    }
}

#[derive(Debug, Clone)]
struct Element {
    id: ElementId,
    name: String,
    parent: Option<ElementId>,
    style: ElementStyle,
}

/// Kinds of input a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Wheel,
    PointerDown,
    PointerMove,
    PointerUp,
    TouchStart,
    TouchMove,
    TouchEnd,
    KeyDown,
    Click,
    Resize,
}

/// Where a listener is attached. Element listeners only hear events whose
/// target is the element itself or one of its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerScope {
    Window,
    Element(ElementId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u32);

#[derive(Debug, Clone, Copy)]
struct Listener {
    id: SubscriptionId,
    scope: ListenerScope,
    kind: EventKind,
}

/// Headless rendering surface: an element tree with per-element styles,
/// listener bookkeeping and the page scroll lock.
#[derive(Debug)]
pub struct RenderGraph {
    elements: Vec<Element>,
    listeners: Vec<Listener>,
    next_listener: u32,
    scroll_locked: bool,
    viewport: (f32, f32),
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            elements: vec![Element {
                id: ElementId(0),
                name: "root".to_string(),
                parent: None,
                style: ElementStyle::default(),
            }],
            listeners: Vec::new(),
            next_listener: 0,
            scroll_locked: false,
            viewport: (1280.0, 800.0),
        }
    }

    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    pub fn create_element(&mut self, name: impl Into<String>, parent: ElementId) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(Element {
            id,
            name: name.into(),
            parent: Some(parent),
            style: ElementStyle::default(),
        });
        id
    }

    pub fn element_by_name(&self, name: &str) -> Option<ElementId> {
        self.elements
            .iter()
            .find(|element| element.name == name)
            .map(|element| element.id)
    }

    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(|element| element.name.as_str())
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(|element| element.parent)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn style(&self, id: ElementId) -> Option<&ElementStyle> {
        self.element(id).map(|element| &element.style)
    }

    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        if let Some(element) = self.element_mut(id) {
            element.style.visible = visible;
        }
    }

    pub fn set_cursor(&mut self, id: ElementId, cursor: Cursor) {
        if let Some(element) = self.element_mut(id) {
            element.style.cursor = cursor;
        }
    }

    /// Whether `id` is `ancestor` or sits somewhere beneath it.
    pub fn is_within(&self, id: ElementId, ancestor: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    pub fn subscribe(&mut self, scope: ListenerScope, kind: EventKind) -> SubscriptionId {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener { id, scope, kind });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        before != self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether subscription `id` hears an event of `kind` aimed at `target`.
    /// Events without a target only reach window listeners.
    pub fn delivers(&self, id: SubscriptionId, kind: EventKind, target: Option<ElementId>) -> bool {
        self.listeners
            .iter()
            .find(|listener| listener.id == id)
            .is_some_and(|listener| {
                listener.kind == kind
                    && match listener.scope {
                        ListenerScope::Window => true,
                        ListenerScope::Element(element) => {
                            target.is_some_and(|target| self.is_within(target, element))
                        }
                    }
            })
    }

    pub fn lock_scroll(&mut self) {
        if !self.scroll_locked {
            debug!("background scroll locked");
        }
        self.scroll_locked = true;
    }

    pub fn unlock_scroll(&mut self) {
        if self.scroll_locked {
            debug!("background scroll released");
        }
        self.scroll_locked = false;
    }

    pub fn is_scroll_locked(&self) -> bool {
        self.scroll_locked
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = (width.max(0.0), height.max(0.0));
    }

    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    /// Copies the engine's animated values onto every element's style.
    pub fn commit(&mut self, engine: &TweenEngine) {
        for element in &mut self.elements {
            let id = element.id;
            element.style.transform = Transform3d {
                x: engine.get(id, Property::X),
                y: engine.get(id, Property::Y),
                z: engine.get(id, Property::Z),
                rotate_y: engine.get(id, Property::RotateY),
                scale: engine.get(id, Property::Scale),
            };
            element.style.opacity = engine.get(id, Property::Opacity);
        }
    }

    fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0 as usize)
    }

    fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.0 as usize)
    }
}
