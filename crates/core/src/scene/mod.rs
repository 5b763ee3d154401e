//! Section choreography.
//!
//! [`SceneBinder`] watches the sequencer's `(section, sub_index)` and turns
//! every change into enter, exit and reveal tweens. The sequencer itself
//! never touches the view.

use tracing::debug;

use crate::{
    render::{ElementId, RenderGraph},
    sequencer::{NavigationState, SectionId, SectionSpec},
    tween::{Change, Ease, Position, Property, Timeline, TweenEngine, TweenSpec},
};

const ENTER_FADE_SECS: f32 = 0.8;
const EXIT_FADE_SECS: f32 = 0.6;
const PART_OFFSET_Y: f32 = 30.0;
const PART_SECS: f32 = 0.8;
const PART_FIRST_AT: f32 = 0.2;
const PART_STAGGER: f32 = 0.2;
const REVEAL_OFFSET_Y: f32 = 400.0;
const REVEAL_SCALE: f32 = 0.95;
const REVEAL_SECS: f32 = 1.2;
const HIDE_SECS: f32 = 0.6;
/// Reveal elements dimmer than this restart their entrance from scratch.
const VISIBLE_OPACITY: f32 = 0.5;

/// Element handles backing one section.
#[derive(Debug, Clone)]
pub struct SectionLayout {
    pub id: SectionId,
    pub root: ElementId,
    pub parts: Vec<ElementId>,
    pub reveals: Vec<ElementId>,
}

#[derive(Debug)]
pub struct SceneBinder {
    layouts: Vec<SectionLayout>,
    observed: Option<(usize, u32)>,
    exiting: Vec<usize>,
    revealed: Vec<Vec<bool>>,
}

impl SceneBinder {
    /// Creates the element tree for `sections` beneath the graph root.
    pub fn build(sections: &[SectionSpec], graph: &mut RenderGraph) -> Self {
        let layouts: Vec<SectionLayout> = sections
            .iter()
            .map(|section| {
                let root = graph.create_element(section.id.as_str(), graph.root());
                let parts = section
                    .parts
                    .iter()
                    .map(|name| graph.create_element(name.as_str(), root))
                    .collect();
                let reveals = section
                    .reveals
                    .iter()
                    .map(|name| graph.create_element(name.as_str(), root))
                    .collect();
                SectionLayout {
                    id: section.id.clone(),
                    root,
                    parts,
                    reveals,
                }
            })
            .collect();

        let revealed = layouts
            .iter()
            .map(|layout| vec![false; layout.reveals.len()])
            .collect();

        Self {
            layouts,
            observed: None,
            exiting: Vec::new(),
            revealed,
        }
    }

    pub fn layouts(&self) -> &[SectionLayout] {
        &self.layouts
    }

    pub fn layout(&self, id: &str) -> Option<&SectionLayout> {
        self.layouts.iter().find(|layout| layout.id.as_str() == id)
    }

    /// Brings the view in line with `state`. Returns `true` if anything had
    /// to be scheduled.
    pub fn sync(
        &mut self,
        state: &NavigationState,
        engine: &mut TweenEngine,
        graph: &mut RenderGraph,
    ) -> bool {
        self.finish_exits(engine, graph);

        let next = (state.section_index, state.sub_index);
        if next.0 >= self.layouts.len() {
            return false;
        }

        let observed = self.observed;
        match observed {
            Some(previous) if previous == next => return false,
            Some((section, _)) if section == next.0 => {
                self.reveal(next.0, next.1, engine, false);
            }
            Some((section, _)) => {
                self.exit(section, engine);
                self.enter(next.0, next.1, engine, graph);
            }
            None => {
                for index in 0..self.layouts.len() {
                    if index != next.0 {
                        let root = self.layouts[index].root;
                        engine.set(root, Property::Opacity, 0.0);
                        graph.set_visible(root, false);
                    }
                }
                self.enter(next.0, next.1, engine, graph);
            }
        }

        self.observed = Some(next);
        true
    }

    fn enter(&mut self, index: usize, sub_index: u32, engine: &mut TweenEngine, graph: &mut RenderGraph) {
        self.exiting.retain(|exiting| *exiting != index);
        let layout = &self.layouts[index];
        debug!(section = %layout.id, sub_index, "section enter");

        engine.kill_tweens_of(layout.root);
        graph.set_visible(layout.root, true);

        let mut timeline = Timeline::new().add(
            layout.root,
            &[(Property::Opacity, Change::FromTo(0.0, 1.0))],
            TweenSpec::secs(ENTER_FADE_SECS, Ease::Power2Out),
            Position::At(0.0),
        );
        if !layout.parts.is_empty() {
            for part in &layout.parts {
                engine.kill_tweens_of(*part);
            }
            timeline = timeline.stagger(
                &layout.parts,
                &[
                    (Property::Y, Change::FromTo(PART_OFFSET_Y, 0.0)),
                    (Property::Opacity, Change::FromTo(0.0, 1.0)),
                ],
                TweenSpec::secs(PART_SECS, Ease::Power2Out),
                PART_STAGGER,
                Position::At(PART_FIRST_AT),
            );
        }
        engine.play(timeline);

        self.reveal(index, sub_index, engine, true);
    }

    fn exit(&mut self, index: usize, engine: &mut TweenEngine) {
        let layout = &self.layouts[index];
        debug!(section = %layout.id, "section exit");
        engine.kill_tweens_of(layout.root);
        engine.to(
            layout.root,
            &[(Property::Opacity, 0.0)],
            TweenSpec::secs(EXIT_FADE_SECS, Ease::Power2In),
        );
        if !self.exiting.contains(&index) {
            self.exiting.push(index);
        }
    }

    /// Shows every reveal element up to `sub_index` and hides the rest.
    /// Revealed elements stay put while stepping forward; on section entry
    /// hidden elements snap into place instead of animating out.
    fn reveal(&mut self, index: usize, sub_index: u32, engine: &mut TweenEngine, entering: bool) {
        let layout = &self.layouts[index];
        let revealed = &mut self.revealed[index];

        for (slot, element) in layout.reveals.iter().copied().enumerate() {
            let wanted = sub_index > slot as u32;
            if wanted && !revealed[slot] {
                engine.kill_tweens_of(element);
                if engine.get(element, Property::Opacity) < VISIBLE_OPACITY {
                    engine.from_to(
                        element,
                        &[
                            (Property::Y, REVEAL_OFFSET_Y, 0.0),
                            (Property::Scale, REVEAL_SCALE, 1.0),
                            (Property::Opacity, 0.0, 1.0),
                        ],
                        TweenSpec::secs(REVEAL_SECS, Ease::Power3Out),
                    );
                } else {
                    engine.to(
                        element,
                        &[(Property::Y, 0.0), (Property::Scale, 1.0), (Property::Opacity, 1.0)],
                        TweenSpec::secs(REVEAL_SECS, Ease::Power3Out),
                    );
                }
            } else if !wanted && entering {
                engine.kill_tweens_of(element);
                engine.set(element, Property::Y, REVEAL_OFFSET_Y);
                engine.set(element, Property::Scale, REVEAL_SCALE);
                engine.set(element, Property::Opacity, 0.0);
            } else if !wanted && revealed[slot] {
                engine.kill_tweens_of(element);
                engine.to(
                    element,
                    &[
                        (Property::Y, REVEAL_OFFSET_Y),
                        (Property::Scale, REVEAL_SCALE),
                        (Property::Opacity, 0.0),
                    ],
                    TweenSpec::secs(HIDE_SECS, Ease::Power2In),
                );
            }
            revealed[slot] = wanted;
        }
    }

    /// Hides sections whose exit fade has completed.
    fn finish_exits(&mut self, engine: &TweenEngine, graph: &mut RenderGraph) {
        let layouts = &self.layouts;
        self.exiting.retain(|index| {
            let root = layouts[*index].root;
            if engine.is_tweening(root) {
                return true;
            }
            graph.set_visible(root, false);
            false
        });
    }
}
