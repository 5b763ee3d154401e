use std::{collections::HashSet, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    carousel::CarouselItem,
    sequencer::SectionSpec,
    stage::NavLink,
    tween::Ease,
    Result, ScrollStageError,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sequencer: SequencerConfig,
    pub carousel: CarouselConfig,
    pub overlay: OverlayConfig,
    pub nav: Vec<NavLink>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sequencer: SequencerConfig::default(),
            carousel: CarouselConfig::default(),
            overlay: OverlayConfig::default(),
            nav: NavLink::defaults(),
        }
    }
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rejects configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let sections = &self.sequencer.sections;
        if sections.is_empty() {
            return Err(ScrollStageError::config("at least one section is required"));
        }

        let mut seen = HashSet::new();
        for section in sections {
            if !seen.insert(&section.id) {
                return Err(ScrollStageError::config(format!(
                    "duplicate section `{}`",
                    section.id
                )));
            }
        }

        for link in &self.nav {
            if !seen.contains(&link.section) {
                return Err(ScrollStageError::config(format!(
                    "nav link `{}` points at unknown section `{}`",
                    link.label, link.section
                )));
            }
        }

        let carousel = &self.carousel;
        if carousel.items.is_empty() {
            return Err(ScrollStageError::config(
                "the carousel needs at least one item",
            ));
        }
        if !(carousel.radius > 0.0) {
            return Err(ScrollStageError::config("carousel radius must be positive"));
        }
        if carousel.tap_slop_px < 0.0 {
            return Err(ScrollStageError::config("tap slop cannot be negative"));
        }
        let overlay = &self.overlay;
        for (name, secs) in [
            ("carousel.wheel_tween_secs", carousel.wheel_tween_secs),
            ("carousel.drag_tween_secs", carousel.drag_tween_secs),
            ("carousel.float_period_secs", carousel.float_period_secs),
            ("overlay.backdrop_fade_secs", overlay.backdrop_fade_secs),
            ("overlay.content_enter_secs", overlay.content_enter_secs),
            ("overlay.content_exit_secs", overlay.content_exit_secs),
        ] {
            check_secs(name, secs, false)?;
        }
        check_secs(
            "overlay.backdrop_exit_delay_secs",
            overlay.backdrop_exit_delay_secs,
            true,
        )?;
        if self.sequencer.touch_threshold_px < 0.0 {
            return Err(ScrollStageError::config(
                "touch threshold cannot be negative",
            ));
        }

        Ok(())
    }
}

/// Longest duration any configured animation may take.
const MAX_DURATION_SECS: f32 = 60.0;

fn check_secs(name: &str, secs: f32, allow_zero: bool) -> Result<()> {
    let lower_ok = if allow_zero { secs >= 0.0 } else { secs > 0.0 };
    if secs.is_finite() && lower_ok && secs <= MAX_DURATION_SECS {
        Ok(())
    } else {
        Err(ScrollStageError::config(format!(
            "`{name}` must be within 0..={MAX_DURATION_SECS} seconds{}, got {secs}",
            if allow_zero { "" } else { " and non-zero" }
        )))
    }
}

/// Section list plus the gesture and settle timings of the sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub sections: Vec<SectionSpec>,
    pub wheel_debounce_ms: u64,
    pub touch_threshold_px: f32,
    pub sub_step_settle_ms: u64,
    pub section_settle_ms: u64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            sections: vec![
                SectionSpec::new("hero", 0).with_parts(["hero-title", "hero-tagline"]),
                SectionSpec::new("feature-grid", 3)
                    .with_parts([
                        "what-we-do-headline",
                        "what-we-do-subtitle",
                        "what-we-do-description",
                    ])
                    .with_reveals(["tech-card", "people-card", "media-card"]),
                SectionSpec::new("statement", 0).with_parts([
                    "why-we-title",
                    "why-we-subtitle",
                    "why-we-description",
                ]),
            ],
            wheel_debounce_ms: 500,
            touch_threshold_px: 50.0,
            sub_step_settle_ms: 800,
            section_settle_ms: 1200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarouselConfig {
    pub items: Vec<CarouselItem>,
    pub radius: f32,
    /// Turns added per idle frame.
    pub auto_speed: f32,
    /// Turns per unit of wheel delta; negative so scrolling down spins
    /// the ring backwards.
    pub wheel_factor: f32,
    pub wheel_tween_secs: f32,
    pub wheel_ease: Ease,
    /// Turns per pixel of horizontal drag.
    pub drag_factor: f32,
    pub drag_tween_secs: f32,
    pub drag_ease: Ease,
    pub tap_slop_px: f32,
    pub tap_max_ms: u64,
    pub float_offset_px: f32,
    pub float_period_secs: f32,
}

impl Default for CarouselConfig {
    fn default() -> Self {
        Self {
            items: CarouselItem::defaults(),
            radius: 280.0,
            auto_speed: 0.001,
            wheel_factor: -0.0005,
            wheel_tween_secs: 2.0,
            wheel_ease: Ease::Power4Out,
            drag_factor: 0.05,
            drag_tween_secs: 0.6,
            drag_ease: Ease::Power4Out,
            tap_slop_px: 5.0,
            tap_max_ms: 300,
            float_offset_px: 30.0,
            float_period_secs: 3.0,
        }
    }
}

/// Timings of the detail overlay's enter and exit choreography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub backdrop_fade_secs: f32,
    pub content_enter_secs: f32,
    pub content_exit_secs: f32,
    /// How long the backdrop waits before fading out on close.
    pub backdrop_exit_delay_secs: f32,
    pub content_start_scale: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            backdrop_fade_secs: 0.3,
            content_enter_secs: 0.4,
            content_exit_secs: 0.3,
            backdrop_exit_delay_secs: 0.15,
            content_start_scale: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sequencer.sections.len(), 3);
        assert_eq!(config.carousel.items.len(), 8);
        assert_eq!(config.nav.len(), 3);
    }

    #[test]
    fn json_round_trip_preserves_defaults() {
        let config = AppConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert!(json.contains("\"power4.out\""));
        assert_eq!(AppConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = AppConfig::from_json_str(r#"{ "carousel": { "radius": 320.0 } }"#).unwrap();
        assert_eq!(config.carousel.radius, 320.0);
        assert_eq!(config.carousel.items.len(), 8);
        assert_eq!(config.sequencer.wheel_debounce_ms, 500);
    }

    #[test]
    fn rejects_unknown_nav_target() {
        let mut config = AppConfig::default();
        config.nav.push(NavLink::new("Blog", "blog"));
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("blog"));
    }

    #[test]
    fn rejects_empty_and_duplicate_sections() {
        let mut config = AppConfig::default();
        config.nav.clear();
        config.sequencer.sections.clear();
        assert!(config.validate().is_err());

        config.sequencer.sections = vec![SectionSpec::new("hero", 0), SectionSpec::new("hero", 1)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_durations() {
        type Field = fn(&mut AppConfig) -> &mut f32;
        let fields: [(&str, Field); 7] = [
            ("wheel_tween_secs", |c| &mut c.carousel.wheel_tween_secs),
            ("drag_tween_secs", |c| &mut c.carousel.drag_tween_secs),
            ("float_period_secs", |c| &mut c.carousel.float_period_secs),
            ("backdrop_fade_secs", |c| &mut c.overlay.backdrop_fade_secs),
            ("content_enter_secs", |c| &mut c.overlay.content_enter_secs),
            ("content_exit_secs", |c| &mut c.overlay.content_exit_secs),
            ("backdrop_exit_delay_secs", |c| &mut c.overlay.backdrop_exit_delay_secs),
        ];

        for (name, field) in fields {
            for bad in [-3.0, 1e30, f32::NAN, f32::INFINITY] {
                let mut config = AppConfig::default();
                *field(&mut config) = bad;
                let err = config.validate().unwrap_err();
                assert!(format!("{err}").contains(name), "{name} = {bad}");
            }
        }

        let mut config = AppConfig::default();
        config.overlay.backdrop_exit_delay_secs = 0.0;
        config.validate().unwrap();
        config.overlay.content_exit_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_durations_fail_to_load() {
        let json = r#"{ "carousel": { "wheel_tween_secs": 1e30 }, "overlay": { "content_enter_secs": -3.0 } }"#;
        assert!(AppConfig::from_json_str(json).is_err());
    }

    #[test]
    fn rejects_degenerate_carousel() {
        let mut config = AppConfig::default();
        config.carousel.radius = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.carousel.items.clear();
        assert!(config.validate().is_err());
    }
}
