use bevy::math::Vec3;

use crate::avatar::Avatar;
use crate::collision::align_on_top;
use crate::config::ClimbingTuning;
use crate::error::{AvatarError, ContactKind};
use crate::regimes::{missing_transition, wrong_regime, RegimeContext};
use crate::state::{
    AvatarState, ClimbingState, CommandAction, FallingState, JumpingState, ParentState,
    RunningState, StandingState,
};

/// Ledge handling. No gravity applies while climbing; only `Hanging` listens
/// to commands.
#[derive(Clone, Debug)]
pub struct ClimbingController {
    tuning: ClimbingTuning,
}

impl ClimbingController {
    pub fn new(tuning: ClimbingTuning) -> Self {
        Self { tuning }
    }

    pub fn run(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        let AvatarState::Climbing(state) = avatar.state.kind else {
            return Err(wrong_regime(ParentState::Climbing, avatar));
        };
        if !avatar.is_fresh() {
            return Ok(());
        }

        avatar.velocity = Vec3::ZERO;
        match state {
            ClimbingState::ClimbingUp => avatar.position.y += self.tuning.climb_step_y,
            ClimbingState::ClimbingToStanding => {
                avatar.position.x += self.tuning.climb_step_x * avatar.state.direction.sign();
            }
            ClimbingState::HangingDrop => avatar.position.y -= self.tuning.drop_step,
            _ => {}
        }

        if state == ClimbingState::Hanging && self.commands(avatar, ctx)? {
            return Ok(());
        }
        if avatar.animation_finished(ctx.animations)? {
            return self.finish(state, avatar, ctx);
        }
        avatar.advance_frame(ctx.animations)
    }

    fn commands(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<bool, AvatarError> {
        let direction = avatar.state.direction;
        match avatar.command.action {
            Some(CommandAction::Running | CommandAction::Jumping)
                if avatar.command_direction() == direction =>
            {
                avatar.set_state(ClimbingState::ClimbingUp, direction, ctx.animations)?;
                avatar.clear_command();
                Ok(true)
            }
            Some(CommandAction::Down) => {
                avatar.set_state(ClimbingState::HangingDrop, direction, ctx.animations)?;
                avatar.clear_command();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn finish(
        &self,
        state: ClimbingState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<(), AvatarError> {
        let direction = avatar.state.direction;
        match state {
            ClimbingState::GrabAscending | ClimbingState::GrabDescending => {
                avatar.set_state(ClimbingState::Grabbing, direction, ctx.animations)
            }
            ClimbingState::Grabbing => {
                avatar.set_state(ClimbingState::Hanging, direction, ctx.animations)
            }
            ClimbingState::ClimbingUp => {
                avatar.set_state(ClimbingState::ClimbingToStanding, direction, ctx.animations)
            }
            ClimbingState::HangingDrop => {
                avatar.set_state(FallingState::DownFacing, direction, ctx.animations)?;
                avatar.y_fallen = 0.0;
                Ok(())
            }
            ClimbingState::ClimbingToStanding => self.stand_up(avatar, ctx),
            ClimbingState::Hanging => Err(missing_transition(avatar)),
        }
    }

    /// Ends a climb on top of the grabbed ledge, honouring a queued command.
    fn stand_up(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        let ledge = avatar.last_ledge.ok_or(AvatarError::NoSuchContact {
            contact: ContactKind::Ledge,
        })?;
        let direction = avatar.state.direction;
        match avatar.command.action {
            Some(CommandAction::Running) => {
                let run_direction = avatar.command_direction();
                avatar.set_state(RunningState::StandingToRunning, run_direction, ctx.animations)?;
                avatar.velocity.x = self.tuning.takeoff_speed * run_direction.sign();
                avatar.clear_command();
            }
            Some(CommandAction::Jumping) => {
                let vx = avatar
                    .command
                    .direction
                    .map_or(0.0, |d| self.tuning.jump.vx * d.sign());
                let jump_direction = avatar.command_direction();
                avatar.set_state(JumpingState::VerticalTakeoff, jump_direction, ctx.animations)?;
                avatar.velocity = Vec3::new(vx, self.tuning.jump.vy, 0.0);
                avatar.clear_command();
            }
            _ => avatar.set_state(StandingState::Standing, direction, ctx.animations)?,
        }
        let rect = avatar.body_rect();
        align_on_top(&mut avatar.position, &rect, &ledge.tile);
        avatar.y_fallen = 0.0;
        avatar.distance_traveled = 0.0;
        Ok(())
    }
}
