use bevy::math::Vec3;

use crate::avatar::Avatar;
use crate::collision::{align_against, floor_support, wall_collision};
use crate::config::StandingTuning;
use crate::error::AvatarError;
use crate::regimes::{missing_transition, wrong_regime, RegimeContext};
use crate::state::{
    AvatarState, CommandAction, JumpingState, ParentState, RunningState, StandingState,
};

#[derive(Clone, Debug)]
pub struct StandingController {
    tuning: StandingTuning,
}

impl StandingController {
    pub fn new(tuning: StandingTuning) -> Self {
        Self { tuning }
    }

    pub fn run(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        let AvatarState::Standing(state) = avatar.state.kind else {
            return Err(wrong_regime(ParentState::Standing, avatar));
        };
        if !avatar.is_fresh() {
            self.contacts(avatar, ctx)?;
            return Ok(());
        }

        avatar.velocity = Vec3::ZERO;
        if self.contacts(avatar, ctx)? || self.commands(state, avatar, ctx)? {
            return Ok(());
        }
        if avatar.animation_finished(ctx.animations)? {
            // Both standing clips loop; a finished one means broken metadata.
            return Err(missing_transition(avatar));
        }
        avatar.advance_frame(ctx.animations)
    }

    /// Returns true when a transition fired.
    fn contacts(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<bool, AvatarError> {
        let body = avatar.body();
        if floor_support(&body, ctx.tiles.floors()).is_none() {
            let direction = avatar.state.direction;
            avatar.set_state(JumpingState::GapArcFall, direction, ctx.animations)?;
            let impulse = self.tuning.overbalance_impulse * direction.sign();
            avatar.velocity = Vec3::new(impulse, 0.0, 0.0);
            avatar.y_fallen = 0.0;
            return Ok(true);
        }
        if let Some(hit) = wall_collision(&body, ctx.tiles.walls(), avatar.state.direction) {
            let rect = avatar.body_rect();
            align_against(&mut avatar.position, &rect, &hit);
            avatar.last_wall = Some(hit);
        }
        Ok(false)
    }

    fn commands(
        &self,
        state: StandingState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        match avatar.command.action {
            Some(CommandAction::Running) => {
                let direction = avatar.command_direction();
                avatar.set_state(RunningState::StandingToRunning, direction, ctx.animations)?;
                avatar.velocity.x = self.tuning.takeoff_speed * direction.sign();
                avatar.distance_traveled = 0.0;
                avatar.clear_command();
                Ok(true)
            }
            Some(CommandAction::Jumping) => {
                let vx = avatar
                    .command
                    .direction
                    .map_or(0.0, |d| self.tuning.jump.vx * d.sign());
                let direction = avatar.command_direction();
                avatar.set_state(JumpingState::VerticalTakeoff, direction, ctx.animations)?;
                avatar.velocity = Vec3::new(vx, self.tuning.jump.vy, 0.0);
                avatar.distance_traveled = 0.0;
                avatar.clear_command();
                Ok(true)
            }
            Some(CommandAction::Looking) if state == StandingState::Standing => {
                avatar.set_state(StandingState::Looking, avatar.state.direction, ctx.animations)?;
                avatar.clear_command();
                Ok(true)
            }
            Some(CommandAction::Looking) => Ok(false),
            _ if state == StandingState::Looking => {
                avatar.set_state(StandingState::Standing, avatar.state.direction, ctx.animations)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
