//! Carousel item detail overlay.
//!
//! Opening captures the tapped item and locks background scroll; every close
//! path (backdrop, close control, Escape) releases it. The exit fades the
//! content first and lets the backdrop trail behind.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    carousel::CarouselItem,
    config::OverlayConfig,
    input::Key,
    render::{ElementId, RenderGraph},
    tween::{secs_to_duration, Ease, Property, TweenEngine, TweenSpec},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Backdrop,
    CloseControl,
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPhase {
    Closed,
    Open,
    /// Exit tweens still running; elements hide once they finish.
    Closing,
}

#[derive(Debug)]
pub struct DetailOverlay {
    config: OverlayConfig,
    backdrop: ElementId,
    content: ElementId,
    close_control: ElementId,
    selected: Option<CarouselItem>,
    phase: OverlayPhase,
}

impl DetailOverlay {
    pub fn build(config: &OverlayConfig, graph: &mut RenderGraph, engine: &mut TweenEngine) -> Self {
        let backdrop = graph.create_element("overlay-backdrop", graph.root());
        let content = graph.create_element("overlay-content", backdrop);
        let close_control = graph.create_element("overlay-close", content);

        for element in [backdrop, content] {
            graph.set_visible(element, false);
            engine.set(element, Property::Opacity, 0.0);
        }

        Self {
            config: config.clone(),
            backdrop,
            content,
            close_control,
            selected: None,
            phase: OverlayPhase::Closed,
        }
    }

    pub fn backdrop(&self) -> ElementId {
        self.backdrop
    }

    pub fn content(&self) -> ElementId {
        self.content
    }

    pub fn close_control(&self) -> ElementId {
        self.close_control
    }

    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == OverlayPhase::Open
    }

    pub fn selected(&self) -> Option<&CarouselItem> {
        self.selected.as_ref()
    }

    /// Shows `item`. Ignored while another item is already open.
    pub fn open(&mut self, item: CarouselItem, engine: &mut TweenEngine, graph: &mut RenderGraph) -> bool {
        if self.is_open() {
            return false;
        }
        debug!(item = item.id, label = %item.label, "overlay open");

        self.selected = Some(item);
        self.phase = OverlayPhase::Open;
        graph.lock_scroll();
        graph.set_visible(self.backdrop, true);
        graph.set_visible(self.content, true);

        engine.kill_tweens_of(self.backdrop);
        engine.kill_tweens_of(self.content);
        engine.from_to(
            self.backdrop,
            &[(Property::Opacity, 0.0, 1.0)],
            TweenSpec::secs(self.config.backdrop_fade_secs, Ease::Power2Out),
        );
        engine.from_to(
            self.content,
            &[
                (Property::Scale, self.config.content_start_scale, 1.0),
                (Property::Opacity, 0.0, 1.0),
            ],
            TweenSpec::secs(self.config.content_enter_secs, Ease::Power2Out),
        );
        true
    }

    /// Starts the exit. Ignored unless the overlay is open.
    pub fn close(&mut self, reason: CloseReason, engine: &mut TweenEngine, graph: &mut RenderGraph) -> bool {
        if !self.is_open() {
            return false;
        }
        debug!(?reason, "overlay close");

        self.selected = None;
        self.phase = OverlayPhase::Closing;
        graph.unlock_scroll();

        engine.kill_tweens_of(self.backdrop);
        engine.kill_tweens_of(self.content);
        engine.to(
            self.content,
            &[
                (Property::Scale, self.config.content_start_scale),
                (Property::Opacity, 0.0),
            ],
            TweenSpec::secs(self.config.content_exit_secs, Ease::Power2In),
        );
        engine.to(
            self.backdrop,
            &[(Property::Opacity, 0.0)],
            TweenSpec::secs(self.config.content_exit_secs, Ease::Power2In).with_delay(
                secs_to_duration(self.config.backdrop_exit_delay_secs),
            ),
        );
        true
    }

    /// Resolves a click while open: the backdrop itself or the close
    /// control dismiss, anything inside the content panel does not.
    pub fn close_reason_for_click(&self, target: Option<ElementId>, graph: &RenderGraph) -> Option<CloseReason> {
        if !self.is_open() {
            return None;
        }
        let target = target?;
        if graph.is_within(target, self.close_control) {
            Some(CloseReason::CloseControl)
        } else if target == self.backdrop {
            Some(CloseReason::Backdrop)
        } else {
            None
        }
    }

    pub fn close_reason_for_key(&self, key: &Key) -> Option<CloseReason> {
        (self.is_open() && *key == Key::Escape).then_some(CloseReason::Escape)
    }

    /// Hides the elements once the exit has played out.
    pub fn on_frame(&mut self, engine: &TweenEngine, graph: &mut RenderGraph) {
        if self.phase != OverlayPhase::Closing {
            return;
        }
        if engine.is_tweening(self.backdrop) || engine.is_tweening(self.content) {
            return;
        }
        graph.set_visible(self.backdrop, false);
        graph.set_visible(self.content, false);
        self.phase = OverlayPhase::Closed;
        debug!("overlay closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (DetailOverlay, TweenEngine, RenderGraph) {
        let mut graph = RenderGraph::new();
        let mut engine = TweenEngine::new();
        let overlay = DetailOverlay::build(&OverlayConfig::default(), &mut graph, &mut engine);
        (overlay, engine, graph)
    }

    fn item() -> CarouselItem {
        CarouselItem::defaults().remove(4)
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn open_captures_item_and_locks_scroll() {
        let (mut overlay, mut engine, mut graph) = setup();
        assert!(overlay.open(item(), &mut engine, &mut graph));
        assert!(graph.is_scroll_locked());
        assert_eq!(overlay.selected().unwrap().label, "SEARCH OPTIMIZATION");
        assert!(!overlay.open(item(), &mut engine, &mut graph));

        engine.advance(ms(500));
        graph.commit(&engine);
        let content = graph.style(overlay.content()).unwrap();
        assert_eq!(content.opacity, 1.0);
        assert_eq!(content.transform.scale, 1.0);
        assert!(content.visible);
    }

    #[test]
    fn every_close_path_releases_scroll() {
        let (mut overlay, mut engine, mut graph) = setup();
        let backdrop = overlay.backdrop();
        let close = overlay.close_control();
        let content = overlay.content();

        let reasons = [
            overlay.close_reason_for_click(Some(backdrop), &graph),
            overlay.close_reason_for_click(Some(close), &graph),
            overlay.close_reason_for_key(&Key::Escape),
        ];
        assert_eq!(reasons, [None, None, None]);

        for path in 0..3 {
            overlay.open(item(), &mut engine, &mut graph);
            let reason = match path {
                0 => overlay.close_reason_for_click(Some(backdrop), &graph),
                1 => overlay.close_reason_for_click(Some(close), &graph),
                _ => overlay.close_reason_for_key(&Key::Escape),
            }
            .unwrap();
            assert_eq!(overlay.close_reason_for_click(Some(content), &graph), None);

            assert!(overlay.close(reason, &mut engine, &mut graph));
            assert!(!graph.is_scroll_locked());
            assert!(overlay.selected().is_none());
        }
    }

    #[test]
    fn content_fades_before_backdrop() {
        let (mut overlay, mut engine, mut graph) = setup();
        overlay.open(item(), &mut engine, &mut graph);
        engine.advance(ms(1000));
        overlay.close(CloseReason::Escape, &mut engine, &mut graph);

        engine.advance(ms(1300));
        graph.commit(&engine);
        assert_eq!(graph.style(overlay.content()).unwrap().opacity, 0.0);
        assert!(graph.style(overlay.backdrop()).unwrap().opacity > 0.0);
        overlay.on_frame(&engine, &mut graph);
        assert_eq!(overlay.phase(), OverlayPhase::Closing);

        engine.advance(ms(1500));
        overlay.on_frame(&engine, &mut graph);
        assert_eq!(overlay.phase(), OverlayPhase::Closed);
        assert!(!graph.style(overlay.backdrop()).unwrap().visible);
    }

    #[test]
    fn escape_while_closed_does_nothing() {
        let (mut overlay, mut engine, mut graph) = setup();
        assert_eq!(overlay.close_reason_for_key(&Key::Escape), None);
        assert!(!overlay.close(CloseReason::Escape, &mut engine, &mut graph));
        overlay.open(item(), &mut engine, &mut graph);
        assert_eq!(
            overlay.close_reason_for_key(&Key::Other("Enter".into())),
            None
        );
    }
}
