use bevy::log::error;

use crate::animation::AnimationLibrary;
use crate::avatar::Avatar;
use crate::config::{AvatarTuning, WorldConstants};
use crate::error::AvatarError;
use crate::state::ParentState;
use crate::tilemap::TileRegistry;

pub mod climbing;
pub mod falling;
pub mod jumping;
pub mod running;
pub mod standing;

pub use climbing::ClimbingController;
pub use falling::FallingController;
pub use jumping::JumpingController;
pub use running::RunningController;
pub use standing::StandingController;

/// Shared, read-only world data lent to the active regime for one call.
#[derive(Clone, Copy)]
pub struct RegimeContext<'a> {
    pub tiles: &'a TileRegistry,
    pub world: &'a WorldConstants,
    pub animations: &'a AnimationLibrary,
}

/// One controller per parent state. A run either steps the animation frame or
/// performs a transition.
///
/// A run is *fresh* when nothing has changed the avatar's state yet this tick:
/// it applies motion, then checks contacts, commands and animation completion
/// in that order. A run that follows a regime change in the same tick applies
/// no motion and only re-checks contacts.
#[derive(Clone, Debug)]
pub enum Regime {
    Standing(StandingController),
    Falling(FallingController),
    Running(RunningController),
    Jumping(JumpingController),
    Climbing(ClimbingController),
}

impl Regime {
    pub fn for_parent(parent: ParentState, tuning: &AvatarTuning) -> Self {
        match parent {
            ParentState::Standing => {
                Regime::Standing(StandingController::new(tuning.standing.clone()))
            }
            ParentState::Falling => Regime::Falling(FallingController::new(tuning.falling.clone())),
            ParentState::Running => Regime::Running(RunningController::new(tuning.running.clone())),
            ParentState::Jumping => Regime::Jumping(JumpingController::new(tuning.jumping.clone())),
            ParentState::Climbing => {
                Regime::Climbing(ClimbingController::new(tuning.climbing.clone()))
            }
        }
    }

    pub fn parent(&self) -> ParentState {
        match self {
            Regime::Standing(_) => ParentState::Standing,
            Regime::Falling(_) => ParentState::Falling,
            Regime::Running(_) => ParentState::Running,
            Regime::Jumping(_) => ParentState::Jumping,
            Regime::Climbing(_) => ParentState::Climbing,
        }
    }

    pub fn run(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        match self {
            Regime::Standing(c) => c.run(avatar, ctx),
            Regime::Falling(c) => c.run(avatar, ctx),
            Regime::Running(c) => c.run(avatar, ctx),
            Regime::Jumping(c) => c.run(avatar, ctx),
            Regime::Climbing(c) => c.run(avatar, ctx),
        }
    }
}

/// Gravity, clamp and ballistic motion shared by every airborne state.
pub(crate) fn integrate_airborne(avatar: &mut Avatar, world: &WorldConstants) {
    avatar.velocity.y =
        (avatar.velocity.y + world.gravity_per_frame).max(world.max_velocity_per_frame);
    avatar.position.x += avatar.velocity.x;
    avatar.position.y += avatar.velocity.y;
    avatar.y_fallen += avatar.velocity.y.min(0.0);
    avatar.distance_traveled += avatar.velocity.x.abs();
}

/// Error for a finished, non-repeating clip that has no successor.
pub(crate) fn missing_transition(avatar: &Avatar) -> AvatarError {
    let kind = avatar.state.kind;
    error!(
        "[Charlie avatar] No transition out of finished animation {kind} (frame {})",
        avatar.state.state_index
    );
    AvatarError::MissingTransition {
        parent: kind.parent(),
        state: kind.label(),
    }
}

/// Error for a regime asked to run an avatar whose state it does not own.
pub(crate) fn wrong_regime(regime: ParentState, avatar: &Avatar) -> AvatarError {
    let kind = avatar.state.kind;
    error!("[Charlie avatar] {regime} controller cannot run {kind}");
    AvatarError::WrongRegime {
        regime,
        parent: kind.parent(),
        state: kind.label(),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use bevy::math::Vec2;

    use super::*;
    use crate::animation::charlie_animation_library;
    use crate::state::{AvatarState, Direction};
    use crate::tilemap::TileDef;

    pub struct Fixture {
        pub tiles: TileRegistry,
        pub world: WorldConstants,
        pub animations: AnimationLibrary,
    }

    impl Fixture {
        pub fn new(defs: &[TileDef]) -> Self {
            let mut tiles = TileRegistry::default();
            for def in defs {
                tiles.add(*def);
            }
            Self {
                tiles,
                world: WorldConstants::default(),
                animations: charlie_animation_library(),
            }
        }

        pub fn ctx(&self) -> RegimeContext<'_> {
            RegimeContext {
                tiles: &self.tiles,
                world: &self.world,
                animations: &self.animations,
            }
        }

        /// Avatar in `kind` at `(x, y)`, snapshot taken so the next run is fresh.
        pub fn avatar(
            &self,
            kind: impl Into<AvatarState>,
            direction: Direction,
            x: f32,
            y: f32,
        ) -> Avatar {
            let mut avatar = Avatar::new(Vec2::new(x, y), &self.animations).expect("avatar");
            avatar
                .set_state(kind, direction, &self.animations)
                .expect("state");
            avatar.begin_tick();
            avatar
        }
    }
}
