use std::path::Path;

use bevy::log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_ENV_VAR: &str = "CHARLIE_GAME_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "game.json";

/// Depth at which the avatar lives; z never changes.
pub const MIDDLEGROUND_Z: f32 = 10.0;

/// Default cap on regime changes within one tick before the transition table
/// is considered cyclic.
pub const MAX_CHAINED_TRANSITIONS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConstants {
    pub gravity_per_frame: f32,
    /// Downward clamp, negative.
    pub max_velocity_per_frame: f32,
}

impl Default for WorldConstants {
    fn default() -> Self {
        Self {
            gravity_per_frame: -0.5,
            max_velocity_per_frame: -12.0,
        }
    }
}

/// Horizontal and vertical launch speed for one kind of jump.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JumpStrength {
    pub vx: f32,
    pub vy: f32,
}

impl JumpStrength {
    pub const fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandingTuning {
    pub overbalance_impulse: f32,
    pub takeoff_speed: f32,
    pub jump: JumpStrength,
}

impl Default for StandingTuning {
    fn default() -> Self {
        Self {
            overbalance_impulse: 1.5,
            takeoff_speed: 2.0,
            jump: JumpStrength::new(1.0, 10.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunningTuning {
    pub takeoff_speed: f32,
    pub running_speed: f32,
    pub acceleration: f32,
    /// Distance after which a run start counts as full speed.
    pub acceleration_distance: f32,
    /// Beyond this distance a stop uses `long_deceleration`.
    pub deceleration_distance: f32,
    pub long_deceleration: f32,
    pub short_deceleration: f32,
    pub wall_impact_mid_distance: f32,
    pub wall_impact_high_distance: f32,
    pub mid_speed_bounce: JumpStrength,
    pub high_speed_bounce: JumpStrength,
    pub overbalance_impulse: f32,
    pub full_run_jump: JumpStrength,
    pub accelerating_jump: JumpStrength,
    pub stopped_jump: JumpStrength,
    pub fall_handoff_distance: f32,
}

impl Default for RunningTuning {
    fn default() -> Self {
        Self {
            takeoff_speed: 2.0,
            running_speed: 6.0,
            acceleration: 0.5,
            acceleration_distance: 48.0,
            deceleration_distance: 160.0,
            long_deceleration: 0.75,
            short_deceleration: 1.5,
            wall_impact_mid_distance: 64.0,
            wall_impact_high_distance: 192.0,
            mid_speed_bounce: JumpStrength::new(1.5, 3.0),
            high_speed_bounce: JumpStrength::new(3.0, 6.0),
            overbalance_impulse: 2.0,
            full_run_jump: JumpStrength::new(7.0, 9.0),
            accelerating_jump: JumpStrength::new(4.0, 8.0),
            stopped_jump: JumpStrength::new(0.0, 10.0),
            fall_handoff_distance: -192.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallingTuning {
    /// `y_fallen` below this on touchdown is fatal.
    pub safe_landing: f32,
    pub wall_impact_correction: f32,
}

impl Default for FallingTuning {
    fn default() -> Self {
        Self {
            safe_landing: -512.0,
            wall_impact_correction: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpingTuning {
    pub wall_jump: JumpStrength,
    pub wall_jump_boost_vy: f32,
    pub wall_jump_boost_distance: f32,
    pub landing_friction: f32,
    pub fall_handoff_distance: f32,
    pub ledge_grab_tolerance: f32,
    /// Launch used when a jump command is queued as a landing ends.
    pub repeat_jump: JumpStrength,
}

impl Default for JumpingTuning {
    fn default() -> Self {
        Self {
            wall_jump: JumpStrength::new(4.0, 9.0),
            wall_jump_boost_vy: 3.0,
            wall_jump_boost_distance: 128.0,
            landing_friction: 0.5,
            fall_handoff_distance: -192.0,
            ledge_grab_tolerance: 6.0,
            repeat_jump: JumpStrength::new(1.0, 10.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimbingTuning {
    pub climb_step_y: f32,
    pub climb_step_x: f32,
    pub drop_step: f32,
    /// Speed when a climb ends straight into a run.
    pub takeoff_speed: f32,
    pub jump: JumpStrength,
}

impl Default for ClimbingTuning {
    fn default() -> Self {
        Self {
            climb_step_y: 15.0,
            climb_step_x: 8.0,
            drop_step: 6.0,
            takeoff_speed: 2.0,
            jump: JumpStrength::new(1.0, 10.0),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarTuning {
    pub standing: StandingTuning,
    pub running: RunningTuning,
    pub falling: FallingTuning,
    pub jumping: JumpingTuning,
    pub climbing: ClimbingTuning,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub world: WorldConstants,
    pub tuning: AvatarTuning,
    pub animations_path: Option<String>,
    pub frame_rate: f32,
    pub debug_step: bool,
    pub spawn: [f32; 2],
    /// Regime changes allowed within one tick.
    pub max_chained_transitions: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            world: WorldConstants::default(),
            tuning: AvatarTuning::default(),
            animations_path: None,
            frame_rate: 60.0,
            debug_step: false,
            spawn: [64.0, 32.0],
            max_chained_transitions: MAX_CHAINED_TRANSITIONS,
        }
    }
}

impl GameConfig {
    pub fn from_json(path: &str, contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_json(&display, &contents)
    }
}

/// Reads the config named by `CHARLIE_GAME_CONFIG` (or `game.json`). A missing
/// file means defaults; a broken one means defaults and a warning.
pub fn load_game_config() -> GameConfig {
    let path = std::env::var(CONFIG_ENV_VAR)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let path = Path::new(&path);
    if !path.exists() {
        return GameConfig::default();
    }
    match GameConfig::read(path) {
        Ok(cfg) => {
            info!("[Charlie config] Loaded startup config from {}", path.display());
            cfg
        }
        Err(e) => {
            warn!("[Charlie config] {e}; using defaults");
            GameConfig::default()
        }
    }
}
