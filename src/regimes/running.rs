use bevy::math::Vec3;

use crate::avatar::Avatar;
use crate::collision::{align_against, align_on_top, find_landing, floor_support, wall_collision};
use crate::config::{JumpStrength, RunningTuning};
use crate::error::AvatarError;
use crate::regimes::{integrate_airborne, missing_transition, wrong_regime, RegimeContext};
use crate::state::{
    AvatarState, CommandAction, Direction, FallingState, JumpingState, ParentState, RunningState,
    StandingState,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ImpactTier {
    Stop,
    MidSpeed,
    HighSpeed,
}

#[derive(Clone, Debug)]
pub struct RunningController {
    tuning: RunningTuning,
}

impl RunningController {
    pub fn new(tuning: RunningTuning) -> Self {
        Self { tuning }
    }

    pub fn run(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        let AvatarState::Running(state) = avatar.state.kind else {
            return Err(wrong_regime(ParentState::Running, avatar));
        };
        if !avatar.is_fresh() {
            self.contacts(state, avatar, ctx)?;
            return Ok(());
        }

        self.integrate(state, avatar, ctx);
        if self.contacts(state, avatar, ctx)? || self.commands(state, avatar, ctx)? {
            return Ok(());
        }
        if avatar.animation_finished(ctx.animations)? {
            return self.finish(state, avatar, ctx);
        }
        avatar.advance_frame(ctx.animations)
    }

    fn integrate(&self, state: RunningState, avatar: &mut Avatar, ctx: &RegimeContext<'_>) {
        let sign = avatar.state.direction.sign();
        match state {
            RunningState::StandingToRunning | RunningState::Running => {
                // Ramps only within the acceleration distance, then holds full speed.
                let speed = if avatar.distance_traveled < self.tuning.acceleration_distance {
                    (avatar.speed() + self.tuning.acceleration).min(self.tuning.running_speed)
                } else {
                    self.tuning.running_speed
                };
                avatar.velocity = Vec3::new(speed * sign, 0.0, 0.0);
                avatar.position.x += avatar.velocity.x;
                avatar.distance_traveled += speed;
            }
            RunningState::RunningToStanding => {
                let rate = if avatar.distance_traveled > self.tuning.deceleration_distance {
                    self.tuning.long_deceleration
                } else {
                    self.tuning.short_deceleration
                };
                let speed = (avatar.speed() - rate).max(0.0);
                avatar.velocity = Vec3::new(speed * sign, 0.0, 0.0);
                avatar.position.x += avatar.velocity.x;
            }
            RunningState::MidSpeedImpactRise
            | RunningState::MidSpeedImpactFall
            | RunningState::HighSpeedImpactRise
            | RunningState::HighSpeedImpactFall => integrate_airborne(avatar, ctx.world),
            RunningState::MidSpeedImpactLand | RunningState::HighSpeedImpactLand => {
                avatar.velocity = Vec3::ZERO;
            }
        }
    }

    fn contacts(
        &self,
        state: RunningState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        match state {
            RunningState::StandingToRunning
            | RunningState::Running
            | RunningState::RunningToStanding => self.ground_contacts(state, avatar, ctx),
            RunningState::MidSpeedImpactRise
            | RunningState::MidSpeedImpactFall
            | RunningState::HighSpeedImpactRise
            | RunningState::HighSpeedImpactFall => self.bounce_contacts(state, avatar, ctx),
            RunningState::MidSpeedImpactLand | RunningState::HighSpeedImpactLand => Ok(false),
        }
    }

    fn ground_contacts(
        &self,
        state: RunningState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        let direction = avatar.state.direction;
        let body = avatar.body();
        if let Some(hit) = wall_collision(&body, ctx.tiles.walls(), direction) {
            let tier = self.impact_tier(state, avatar);
            let sign = direction.sign();
            match tier {
                ImpactTier::Stop => {
                    avatar.set_state(StandingState::Standing, direction, ctx.animations)?;
                    avatar.velocity = Vec3::ZERO;
                }
                ImpactTier::MidSpeed => {
                    let bounce = self.tuning.mid_speed_bounce;
                    avatar.set_state(RunningState::MidSpeedImpactRise, direction, ctx.animations)?;
                    avatar.velocity = Vec3::new(-bounce.vx * sign, bounce.vy, 0.0);
                }
                ImpactTier::HighSpeed => {
                    let bounce = self.tuning.high_speed_bounce;
                    avatar.set_state(RunningState::HighSpeedImpactRise, direction, ctx.animations)?;
                    avatar.velocity = Vec3::new(-bounce.vx * sign, bounce.vy, 0.0);
                }
            }
            let rect = avatar.body_rect();
            align_against(&mut avatar.position, &rect, &hit);
            avatar.last_wall = Some(hit);
            avatar.distance_traveled = 0.0;
            avatar.y_fallen = 0.0;
            return Ok(true);
        }
        if floor_support(&body, ctx.tiles.floors()).is_none() {
            let speed = avatar.speed().max(self.tuning.overbalance_impulse);
            avatar.set_state(JumpingState::GapArcFall, direction, ctx.animations)?;
            avatar.velocity = Vec3::new(speed * direction.sign(), 0.0, 0.0);
            avatar.y_fallen = 0.0;
            return Ok(true);
        }
        Ok(false)
    }

    fn impact_tier(&self, state: RunningState, avatar: &Avatar) -> ImpactTier {
        let distance = avatar.distance_traveled;
        if distance < self.tuning.wall_impact_mid_distance {
            ImpactTier::Stop
        } else if distance >= self.tuning.wall_impact_high_distance
            && state == RunningState::Running
            && avatar.speed() >= self.tuning.running_speed
        {
            ImpactTier::HighSpeed
        } else {
            ImpactTier::MidSpeed
        }
    }

    fn bounce_contacts(
        &self,
        state: RunningState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        let direction = avatar.state.direction;
        let travel = if avatar.velocity.x < 0.0 {
            Direction::Left
        } else {
            Direction::Right
        };
        let body = avatar.body();
        if let Some(hit) = wall_collision(&body, ctx.tiles.walls(), travel) {
            let rect = avatar.body_rect();
            align_against(&mut avatar.position, &rect, &hit);
            avatar.velocity.x = 0.0;
            avatar.last_wall = Some(hit);
        }

        let falling = matches!(
            state,
            RunningState::MidSpeedImpactFall | RunningState::HighSpeedImpactFall
        );
        if falling {
            let body = avatar.body();
            let previous_bottom = avatar.previous_bottom();
            if let Some(landing) = find_landing(&body, previous_bottom, ctx.tiles.floors()) {
                let land = if state == RunningState::HighSpeedImpactFall {
                    RunningState::HighSpeedImpactLand
                } else {
                    RunningState::MidSpeedImpactLand
                };
                avatar.set_state(land, direction, ctx.animations)?;
                let rect = avatar.body_rect();
                align_on_top(&mut avatar.position, &rect, &landing.tile);
                avatar.velocity = Vec3::ZERO;
                avatar.y_fallen = 0.0;
                return Ok(true);
            }
            if avatar.y_fallen < self.tuning.fall_handoff_distance {
                avatar.set_state(FallingState::DownFacing, direction, ctx.animations)?;
                return Ok(true);
            }
        } else if avatar.velocity.y <= 0.0 && avatar.is_fresh() {
            let fall = if state == RunningState::HighSpeedImpactRise {
                RunningState::HighSpeedImpactFall
            } else {
                RunningState::MidSpeedImpactFall
            };
            avatar.set_state(fall, direction, ctx.animations)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn commands(
        &self,
        state: RunningState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        let direction = avatar.state.direction;
        match state {
            RunningState::StandingToRunning | RunningState::Running => match avatar.command.action {
                Some(CommandAction::Jumping) => {
                    self.jump(avatar, ctx)?;
                    Ok(true)
                }
                Some(CommandAction::Running) if avatar.command_direction() == direction => {
                    Ok(false)
                }
                _ => {
                    avatar.set_state(RunningState::RunningToStanding, direction, ctx.animations)?;
                    Ok(true)
                }
            },
            RunningState::RunningToStanding => match avatar.command.action {
                Some(CommandAction::Running) => {
                    let new_direction = avatar.command_direction();
                    avatar.set_state(
                        RunningState::StandingToRunning,
                        new_direction,
                        ctx.animations,
                    )?;
                    if new_direction != direction {
                        avatar.velocity.x = self.tuning.takeoff_speed * new_direction.sign();
                        avatar.distance_traveled = 0.0;
                    }
                    avatar.clear_command();
                    Ok(true)
                }
                Some(CommandAction::Jumping) => {
                    self.jump(avatar, ctx)?;
                    Ok(true)
                }
                _ => Ok(false),
            },
            _ => Ok(false),
        }
    }

    /// Jump strength follows the current horizontal speed.
    fn jump(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        let direction = avatar.state.direction;
        let speed = avatar.speed();
        let (kind, strength): (JumpingState, JumpStrength) = if speed >= self.tuning.running_speed {
            (JumpingState::GapTakeoff, self.tuning.full_run_jump)
        } else if speed > self.tuning.takeoff_speed {
            (JumpingState::GapTakeoff, self.tuning.accelerating_jump)
        } else {
            (JumpingState::VerticalTakeoff, self.tuning.stopped_jump)
        };
        avatar.set_state(kind, direction, ctx.animations)?;
        avatar.velocity = Vec3::new(strength.vx * direction.sign(), strength.vy, 0.0);
        avatar.clear_command();
        Ok(())
    }

    fn finish(
        &self,
        state: RunningState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<(), AvatarError> {
        let direction = avatar.state.direction;
        match state {
            RunningState::StandingToRunning => {
                avatar.set_state(RunningState::Running, direction, ctx.animations)
            }
            RunningState::RunningToStanding
            | RunningState::MidSpeedImpactLand
            | RunningState::HighSpeedImpactLand => {
                avatar.set_state(StandingState::Standing, direction, ctx.animations)?;
                avatar.velocity = Vec3::ZERO;
                avatar.distance_traveled = 0.0;
                Ok(())
            }
            _ => Err(missing_transition(avatar)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regimes::test_support::Fixture;
    use crate::state::Command;
    use crate::tilemap::TileDef;

    fn controller() -> RunningController {
        RunningController::new(RunningTuning::default())
    }

    fn ground() -> TileDef {
        TileDef::floor(0.0, 0.0, 2048.0, 32.0)
    }

    #[test]
    fn run_start_accelerates_toward_running_speed() {
        let fx = Fixture::new(&[ground()]);
        let mut avatar = fx.avatar(RunningState::StandingToRunning, Direction::Right, 100.0, 32.0);
        avatar.velocity.x = 2.0;
        avatar.command = Command::running(Direction::Right);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert!((avatar.velocity.x - 2.5).abs() < 0.01);
        assert!((avatar.position.x - 102.5).abs() < 0.01);
        assert_eq!(avatar.state.state_index, 1);
    }

    #[test]
    fn releasing_run_starts_deceleration() {
        let fx = Fixture::new(&[ground()]);
        let mut avatar = fx.avatar(RunningState::Running, Direction::Right, 100.0, 32.0);
        avatar.velocity.x = 6.0;
        avatar.distance_traveled = 300.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, RunningState::RunningToStanding.into());

        avatar.begin_tick();
        let distance = avatar.distance_traveled;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert!((avatar.velocity.x - 5.25).abs() < 0.01);
        assert_eq!(avatar.distance_traveled, distance);
    }

    #[test]
    fn short_run_decelerates_faster() {
        let fx = Fixture::new(&[ground()]);
        let mut avatar = fx.avatar(RunningState::RunningToStanding, Direction::Left, 500.0, 32.0);
        avatar.velocity.x = -4.0;
        avatar.distance_traveled = 50.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert!((avatar.velocity.x + 2.5).abs() < 0.01);
    }

    #[test]
    fn slow_wall_contact_stops_dead() {
        let fx = Fixture::new(&[ground(), TileDef::wall(160.0, 32.0, 32.0, 96.0)]);
        let mut avatar = fx.avatar(RunningState::StandingToRunning, Direction::Right, 114.0, 32.0);
        avatar.velocity.x = 2.0;
        avatar.distance_traveled = 10.0;
        avatar.command = Command::running(Direction::Right);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, StandingState::Standing.into());
        assert!((avatar.position.x - 116.0).abs() < 0.01);
        assert_eq!(avatar.velocity, Vec3::ZERO);
    }

    #[test]
    fn accelerating_wall_contact_takes_mid_speed_arc() {
        let fx = Fixture::new(&[ground(), TileDef::wall(160.0, 32.0, 32.0, 96.0)]);
        let mut avatar = fx.avatar(RunningState::StandingToRunning, Direction::Right, 114.0, 32.0);
        avatar.velocity.x = 4.0;
        avatar.distance_traveled = 250.0;
        avatar.command = Command::running(Direction::Right);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, RunningState::MidSpeedImpactRise.into());
        assert!((avatar.velocity.x + 1.5).abs() < 0.01);
        assert!((avatar.velocity.y - 3.0).abs() < 0.01);
    }

    #[test]
    fn jump_strength_follows_speed() {
        let fx = Fixture::new(&[ground()]);
        let cases = [
            (6.0, 500.0, JumpingState::GapTakeoff, 7.0, 9.0),
            (4.0, 20.0, JumpingState::GapTakeoff, 4.0, 8.0),
        ];
        for (speed, distance, kind, vx, vy) in cases {
            let mut avatar = fx.avatar(RunningState::Running, Direction::Right, 100.0, 32.0);
            avatar.velocity.x = speed;
            avatar.distance_traveled = distance;
            avatar.command = Command::jumping(Some(Direction::Right));
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
            assert_eq!(avatar.state.kind, kind.into());
            assert!((avatar.velocity.x - vx).abs() < 0.01);
            assert!((avatar.velocity.y - vy).abs() < 0.01);
        }

        let mut avatar = fx.avatar(RunningState::RunningToStanding, Direction::Right, 100.0, 32.0);
        avatar.velocity.x = 2.0;
        avatar.command = Command::jumping(None);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::VerticalTakeoff.into());
        assert_eq!(avatar.velocity.x, 0.0);
    }

    #[test]
    fn running_off_an_edge_keeps_momentum() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 128.0, 32.0)]);
        let mut avatar = fx.avatar(RunningState::Running, Direction::Right, 104.0, 32.0);
        avatar.velocity.x = 6.0;
        avatar.distance_traveled = 400.0;
        avatar.command = Command::running(Direction::Right);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::GapArcFall.into());
        assert!((avatar.velocity.x - 6.0).abs() < 0.01);
    }

    #[test]
    fn bounce_rises_then_falls_then_lands() {
        let fx = Fixture::new(&[ground()]);
        let mut avatar = fx.avatar(RunningState::MidSpeedImpactRise, Direction::Right, 300.0, 34.0);
        avatar.velocity = Vec3::new(-1.5, 0.4, 0.0);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, RunningState::MidSpeedImpactFall.into());

        for _ in 0..20 {
            avatar.begin_tick();
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
            if avatar.state.kind == RunningState::MidSpeedImpactLand.into() {
                break;
            }
        }
        assert_eq!(avatar.state.kind, RunningState::MidSpeedImpactLand.into());
        assert!((avatar.position.y - 32.0).abs() < 0.01);
        assert_eq!(avatar.y_fallen, 0.0);
    }

    #[test]
    fn acceleration_distance_decides_when_full_speed_is_reached() {
        let fx = Fixture::new(&[ground()]);
        let trajectory = |acceleration_distance: f32| {
            let tuning = RunningTuning {
                acceleration_distance,
                ..RunningTuning::default()
            };
            let controller = RunningController::new(tuning);
            let mut avatar =
                fx.avatar(RunningState::StandingToRunning, Direction::Right, 100.0, 32.0);
            avatar.velocity.x = 2.0;
            let mut speeds = Vec::new();
            for _ in 0..6 {
                avatar.begin_tick();
                avatar.command = Command::running(Direction::Right);
                controller.run(&mut avatar, &fx.ctx()).expect("tick");
                speeds.push(avatar.velocity.x);
            }
            speeds
        };

        let immediate = trajectory(0.0);
        let ramped = trajectory(1.0e9);
        assert_ne!(immediate, ramped);
        assert!(immediate.iter().all(|v| (v - 6.0).abs() < 0.01));
        assert!((ramped[0] - 2.5).abs() < 0.01);
        assert!((ramped[5] - 5.0).abs() < 0.01);
    }

    #[test]
    fn high_speed_bounce_lands_then_stands() {
        let fx = Fixture::new(&[ground()]);
        let mut avatar =
            fx.avatar(RunningState::HighSpeedImpactRise, Direction::Right, 300.0, 34.0);
        avatar.velocity = Vec3::new(-3.0, 0.4, 0.0);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, RunningState::HighSpeedImpactFall.into());

        let mut landed = false;
        for _ in 0..40 {
            avatar.begin_tick();
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
            landed |= avatar.state.kind == RunningState::HighSpeedImpactLand.into();
            if avatar.state.parent() == ParentState::Standing {
                break;
            }
        }
        assert!(landed);
        assert_eq!(avatar.state.kind, StandingState::Standing.into());
        assert!((avatar.position.y - 32.0).abs() < 0.01);
        assert_eq!(avatar.velocity, Vec3::ZERO);
        assert_eq!(avatar.distance_traveled, 0.0);
    }
}
