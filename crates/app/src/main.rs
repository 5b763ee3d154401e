use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use scrollstage_core::{
    project, AppConfig, CarouselItem, ElementId, InputEvent, Key, ManualClock, NavigationState, Point,
    ScheduledEvent, Scheduler, ScrollStageError, Stage, StageEvent,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Extra time simulated after the last scripted event so tweens can land.
const SETTLE_TAIL: Duration = Duration::from_secs(2);

fn main() -> scrollstage_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { script, config, fps } => run_simulate(&script, config.as_ref(), fps),
        Commands::Project {
            items,
            progress,
            radius,
        } => run_project(items, progress, radius),
        Commands::Config => {
            println!("{}", AppConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}

/// One scripted input. Targets are element names as created by the stage
/// (`carousel`, `carousel-item-3`, `overlay-backdrop`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ScriptEvent {
    Wheel {
        delta_y: f32,
        #[serde(default)]
        target: Option<String>,
    },
    PointerDown {
        #[serde(default)]
        position: Option<Point>,
        #[serde(default)]
        target: Option<String>,
    },
    PointerMove {
        #[serde(default)]
        position: Option<Point>,
    },
    PointerUp {
        #[serde(default)]
        position: Option<Point>,
        #[serde(default)]
        target: Option<String>,
    },
    TouchStart {
        #[serde(default)]
        touches: Vec<Point>,
        #[serde(default)]
        target: Option<String>,
    },
    TouchMove {
        #[serde(default)]
        touches: Vec<Point>,
    },
    TouchEnd {
        #[serde(default)]
        touches: Vec<Point>,
        #[serde(default)]
        target: Option<String>,
    },
    Key {
        key: String,
    },
    Click {
        target: String,
    },
    Resize {
        width: f32,
        height: f32,
    },
    Nav {
        label: String,
    },
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    frames: u64,
    state: NavigationState,
    overlay: Option<CarouselItem>,
    events: Vec<StageEvent>,
}

fn run_simulate(script: &PathBuf, config: Option<&PathBuf>, fps: u32) -> scrollstage_core::Result<()> {
    tracing::info!(?script, ?config, fps, "running simulation");

    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let events: Vec<ScheduledEvent<ScriptEvent>> =
        serde_json::from_str(&std::fs::read_to_string(script)?)?;
    if fps == 0 {
        return Err(ScrollStageError::msg("--fps must be positive"));
    }

    let clock = ManualClock::new();
    let mut stage = Stage::mount(config, clock.clone())?;
    let mut scheduler = Scheduler::new();
    scheduler.set_events(events);

    let step = Duration::from_secs_f64(1.0 / f64::from(fps));
    let end = scheduler.last_at().unwrap_or_default() + SETTLE_TAIL;
    let mut now = Duration::ZERO;
    let mut frames = 0;
    let mut log = Vec::new();

    while now <= end {
        clock.set(now);
        for event in scheduler.drain_due(now) {
            log.extend(apply(&mut stage, event));
        }
        frames = stage.frame().frame;
        now += step;
    }

    for event in &log {
        tracing::info!(?event, "stage event");
    }

    let report = SimulationReport {
        frames,
        state: stage.state(),
        overlay: stage.overlay_selection().cloned(),
        events: log,
    };
    stage.unmount();

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn apply(stage: &mut Stage<ManualClock>, event: &ScriptEvent) -> Vec<StageEvent> {
    let input = match event {
        ScriptEvent::Wheel { delta_y, target } => InputEvent::Wheel {
            delta_y: *delta_y,
            target: resolve(stage, target.as_ref()),
        },
        ScriptEvent::PointerDown { position, target } => InputEvent::PointerDown {
            position: *position,
            target: resolve(stage, target.as_ref()),
        },
        ScriptEvent::PointerMove { position } => InputEvent::PointerMove {
            position: *position,
            target: None,
        },
        ScriptEvent::PointerUp { position, target } => InputEvent::PointerUp {
            position: *position,
            target: resolve(stage, target.as_ref()),
        },
        ScriptEvent::TouchStart { touches, target } => InputEvent::TouchStart {
            touches: touches.clone(),
            target: resolve(stage, target.as_ref()),
        },
        ScriptEvent::TouchMove { touches } => InputEvent::TouchMove {
            touches: touches.clone(),
            target: None,
        },
        ScriptEvent::TouchEnd { touches, target } => InputEvent::TouchEnd {
            changed_touches: touches.clone(),
            target: resolve(stage, target.as_ref()),
        },
        ScriptEvent::Key { key } => InputEvent::KeyDown {
            key: if key == "Escape" {
                Key::Escape
            } else {
                Key::Other(key.clone())
            },
        },
        ScriptEvent::Click { target } => InputEvent::Click {
            target: resolve(stage, Some(target)),
        },
        ScriptEvent::Resize { width, height } => InputEvent::Resize {
            width: *width,
            height: *height,
        },
        ScriptEvent::Nav { label } => {
            return stage
                .follow_nav_link(label)
                .map(StageEvent::Transition)
                .into_iter()
                .collect();
        }
    };
    stage.dispatch(&input)
}

fn resolve(stage: &Stage<ManualClock>, name: Option<&String>) -> Option<ElementId> {
    let name = name?;
    let element = stage.element(name);
    if element.is_none() {
        tracing::warn!(name = name.as_str(), "script targets an unknown element");
    }
    element
}

fn run_project(items: usize, progress: f32, radius: f32) -> scrollstage_core::Result<()> {
    if items == 0 {
        return Err(ScrollStageError::msg("--items must be at least 1"));
    }
    let slots: Vec<_> = (0..items)
        .map(|index| project(index, items, progress, radius))
        .collect();
    println!("{}", serde_json::to_string_pretty(&slots)?);
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Scroll-sequenced landing page engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a timestamped input script against a freshly mounted stage.
    Simulate {
        /// JSON array of `{ "at_ms": .., "payload": { "type": .. } }` entries.
        script: PathBuf,
        /// Optional configuration file; defaults are used otherwise.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Simulated frame rate.
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Print where every carousel slot sits for a given rotation.
    Project {
        #[arg(long, default_value_t = 8)]
        items: usize,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        progress: f32,
        #[arg(long, default_value_t = 280.0)]
        radius: f32,
    },
    /// Print the default configuration as JSON.
    Config,
}
