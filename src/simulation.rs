use bevy::log::{info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::animation::resolve_animation_library;
use crate::config::GameConfig;
use crate::controller::AvatarController;
use crate::error::AvatarError;
use crate::state::{Command, CommandAction, Direction, FallingState};
use crate::tilemap::TileGrid;

/// Frames between two random command changes.
const RANDOM_HOLD_FRAMES: u32 = 20;

#[derive(Deserialize, Clone, Debug)]
pub struct SimulationRequest {
    /// Level to run on; the built-in test level when absent.
    pub level: Option<TileGrid>,
    #[serde(default)]
    pub inputs: Vec<SimInput>,
    pub max_frames: u32,
    #[serde(default = "default_record_interval")]
    pub record_interval: u32,
    /// Seeds random commands for frames no scripted input covers.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_record_interval() -> u32 {
    1
}

/// A command held from `frame` for `duration` frames (at least one).
#[derive(Deserialize, Clone, Debug)]
pub struct SimInput {
    pub frame: u32,
    pub action: String,
    #[serde(default)]
    pub duration: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SimulationResult {
    pub outcome: String,
    pub frames_elapsed: u32,
    pub trace: Vec<TraceFrame>,
    pub events: Vec<SimEvent>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct TraceFrame {
    pub frame: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub state: String,
    pub index: u32,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SimEvent {
    pub frame: u32,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SimEvent {
    fn new(frame: u32, event_type: &str) -> Self {
        Self {
            frame,
            event_type: event_type.to_string(),
            from: None,
            to: None,
            detail: None,
        }
    }
}

/// Maps a scripted action name to a command. Unknown names yield `None`.
pub fn parse_action(action: &str) -> Option<Command> {
    let command = match action {
        "left" => Command::running(Direction::Left),
        "right" => Command::running(Direction::Right),
        "jump" | "up" => Command::jumping(None),
        "jump_left" => Command::jumping(Some(Direction::Left)),
        "jump_right" => Command::jumping(Some(Direction::Right)),
        "look" => Command::looking(),
        "down" => Command::down(),
        "none" | "idle" => Command::none(),
        _ => return None,
    };
    Some(command)
}

fn random_command(rng: &mut SmallRng) -> Command {
    let direction = if rng.gen_bool(0.5) {
        Direction::Left
    } else {
        Direction::Right
    };
    match rng.gen_range(0..6) {
        0 => Command::none(),
        1 | 2 => Command::running(direction),
        3 => Command::jumping(Some(direction)),
        4 => Command::new(CommandAction::Jumping, None),
        _ => Command::down(),
    }
}

pub fn run_simulation(request: &SimulationRequest, config: &GameConfig) -> SimulationResult {
    let mut events = Vec::new();
    let animations = match resolve_animation_library(config.animations_path.as_deref()) {
        Ok(animations) => animations,
        Err(e) => {
            let mut event = SimEvent::new(0, "error");
            event.detail = Some(e.to_string());
            return SimulationResult {
                outcome: "error".to_string(),
                frames_elapsed: 0,
                trace: Vec::new(),
                events: vec![event],
            };
        }
    };

    let mut controller = AvatarController::new(config, animations);
    let level = request.level.clone().unwrap_or_else(TileGrid::test_level);
    controller.load_level(&level);

    // Pre-process inputs into per-frame commands; later inputs win.
    let mut scripted: Vec<Option<Command>> = vec![None; request.max_frames as usize];
    for input in &request.inputs {
        let Some(command) = parse_action(&input.action) else {
            warn!(
                "[Charlie sim] Ignoring unknown action {:?} at frame {}",
                input.action, input.frame
            );
            let mut event = SimEvent::new(input.frame, "unknown_action");
            event.detail = Some(input.action.clone());
            events.push(event);
            continue;
        };
        let duration = input.duration.max(1);
        let end = input.frame.saturating_add(duration).min(request.max_frames);
        for f in input.frame..end {
            scripted[f as usize] = Some(command);
        }
    }

    let mut rng = request.seed.map(SmallRng::seed_from_u64);
    let mut random = Command::none();
    let mut trace = Vec::new();
    let mut outcome = "timeout".to_string();
    let mut frames_elapsed = 0;

    for frame in 0..request.max_frames {
        let command = match (scripted[frame as usize], rng.as_mut()) {
            (Some(command), _) => Some(command),
            (None, Some(rng)) => {
                if frame % RANDOM_HOLD_FRAMES == 0 {
                    random = random_command(rng);
                }
                Some(random)
            }
            (None, None) => None,
        };
        if let Some(command) = command {
            controller.set_command(command);
        }

        match controller.tick() {
            Ok(_) => {}
            Err(AvatarError::NotReady { reason }) => {
                let mut event = SimEvent::new(frame, "not_ready");
                event.detail = Some(reason.to_string());
                events.push(event);
                outcome = "not_ready".to_string();
                break;
            }
            Err(e) if e.is_fatal() => {
                let mut event = SimEvent::new(frame, "error");
                event.detail = Some(e.to_string());
                events.push(event);
                outcome = "error".to_string();
                break;
            }
            Err(e) => {
                let mut event = SimEvent::new(frame, "skipped");
                event.detail = Some(e.to_string());
                events.push(event);
            }
        }
        frames_elapsed = frame + 1;

        for record in controller.transitions_mut().drain() {
            let mut event = SimEvent::new(frame, "transition");
            event.from = Some(record.from);
            event.to = Some(record.to);
            events.push(event);
        }

        let avatar = controller.avatar();
        let dead = avatar.state.kind == FallingState::Dead.into();
        if dead || (request.record_interval > 0 && frame % request.record_interval == 0) {
            trace.push(TraceFrame {
                frame,
                x: avatar.position.x,
                y: avatar.position.y,
                vx: avatar.velocity.x,
                vy: avatar.velocity.y,
                state: avatar.state.kind.to_string(),
                index: avatar.state.state_index,
            });
        }
        if dead {
            events.push(SimEvent::new(frame, "death"));
            outcome = "dead".to_string();
            break;
        }
    }

    info!("[Charlie sim] Finished after {frames_elapsed} frames: {outcome}");
    SimulationResult {
        outcome,
        frames_elapsed,
        trace,
        events,
    }
}
