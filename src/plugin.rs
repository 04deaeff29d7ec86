use bevy::prelude::*;

use crate::animation::charlie_animation_library;
use crate::config::GameConfig;
use crate::controller::AvatarController;
use crate::state::{AvatarState, Command};
use crate::tilemap::{TileChange, TileGrid};
use crate::timing::ClockMode;

/// World notification that a tile appeared or disappeared.
#[derive(Event, Clone, Copy, Debug)]
pub struct TileChangeEvent(pub TileChange);

/// Input collaborator's command for the coming frames.
#[derive(Event, Clone, Copy, Debug)]
pub struct AvatarCommandEvent(pub Command);

/// Switches between real-time play and explicit debug stepping.
#[derive(Event, Clone, Copy, Debug)]
pub struct ClockModeEvent(pub ClockMode);

/// Sent after every frame whose state differs from the previous frame's.
#[derive(Event, Clone, Copy, Debug, PartialEq)]
pub struct AvatarStateChanged {
    pub frame: u64,
    pub from: AvatarState,
    pub to: AvatarState,
}

pub struct AvatarPlugin {
    pub config: GameConfig,
    pub level: Option<TileGrid>,
}

impl AvatarPlugin {
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            level: None,
        }
    }

    pub fn with_level(mut self, level: TileGrid) -> Self {
        self.level = Some(level);
        self
    }
}

impl Plugin for AvatarPlugin {
    fn build(&self, app: &mut App) {
        let mut controller = match AvatarController::from_config(&self.config) {
            Ok(controller) => controller,
            Err(e) => {
                error!("[Charlie avatar] {e}; falling back to built-in animations");
                AvatarController::new(&self.config, charlie_animation_library())
            }
        };
        if let Some(level) = &self.level {
            controller.load_level(level);
        }

        app.insert_resource(controller)
            .add_event::<TileChangeEvent>()
            .add_event::<AvatarCommandEvent>()
            .add_event::<ClockModeEvent>()
            .add_event::<AvatarStateChanged>()
            .add_systems(
                PreUpdate,
                (apply_clock_mode, apply_tile_changes, apply_commands),
            )
            .add_systems(Update, drive_avatar);
    }
}

fn apply_clock_mode(
    mut events: EventReader<ClockModeEvent>,
    mut controller: ResMut<AvatarController>,
) {
    if let Some(ClockModeEvent(mode)) = events.read().last() {
        info!("[Charlie avatar] Clock mode set to {mode:?}");
        controller.clock_mut().set_mode(*mode);
    }
}

fn apply_tile_changes(
    mut events: EventReader<TileChangeEvent>,
    mut controller: ResMut<AvatarController>,
) {
    for TileChangeEvent(change) in events.read() {
        controller.apply_tile_change(*change);
    }
}

fn apply_commands(
    mut events: EventReader<AvatarCommandEvent>,
    mut controller: ResMut<AvatarController>,
) {
    // Only the latest command of the frame counts.
    if let Some(AvatarCommandEvent(command)) = events.read().last() {
        controller.set_command(*command);
    }
}

fn drive_avatar(
    time: Res<Time>,
    mut controller: ResMut<AvatarController>,
    mut changes: EventWriter<AvatarStateChanged>,
    mut exit: EventWriter<AppExit>,
) {
    let due = controller.clock_mut().advance(time.delta_secs());
    for _ in 0..due {
        let frame = controller.frame();
        match controller.tick() {
            Ok(_) => {
                if controller.has_state_changed() {
                    let avatar = controller.avatar();
                    changes.send(AvatarStateChanged {
                        frame,
                        from: avatar.last_rendered.state.kind,
                        to: avatar.state.kind,
                    });
                }
            }
            Err(e) if e.is_fatal() => {
                error!("[Charlie avatar] Stopping: {e}");
                exit.send(AppExit::error());
                return;
            }
            // Not ready yet or a skipped frame; retry on the next one.
            Err(_) => return,
        }
    }
}
