use bevy::math::Vec3;

use crate::avatar::Avatar;
use crate::collision::{align_against, align_on_top, find_landing, wall_collision, CollisionSide};
use crate::config::FallingTuning;
use crate::error::AvatarError;
use crate::regimes::{integrate_airborne, missing_transition, wrong_regime, RegimeContext};
use crate::state::{AvatarState, Direction, FallingState, ParentState, StandingState};

/// Ballistic descent. Commands are ignored for the whole regime.
#[derive(Clone, Debug)]
pub struct FallingController {
    tuning: FallingTuning,
}

impl FallingController {
    pub fn new(tuning: FallingTuning) -> Self {
        Self { tuning }
    }

    pub fn run(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        let AvatarState::Falling(state) = avatar.state.kind else {
            return Err(wrong_regime(ParentState::Falling, avatar));
        };
        let airborne = matches!(
            state,
            FallingState::DownFacing | FallingState::WallImpactLeft | FallingState::WallImpactRight
        );
        if !avatar.is_fresh() {
            if airborne {
                self.contacts(state, avatar, ctx)?;
            }
            return Ok(());
        }

        if airborne {
            integrate_airborne(avatar, ctx.world);
            if self.contacts(state, avatar, ctx)? {
                return Ok(());
            }
        } else {
            avatar.velocity = Vec3::ZERO;
        }
        if avatar.animation_finished(ctx.animations)? {
            return self.finish(state, avatar, ctx);
        }
        avatar.advance_frame(ctx.animations)
    }

    fn contacts(
        &self,
        state: FallingState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        let direction = avatar.state.direction;
        let body = avatar.body();
        let previous_bottom = avatar.previous_bottom();
        if let Some(landing) = find_landing(&body, previous_bottom, ctx.tiles.floors()) {
            if avatar.y_fallen < self.tuning.safe_landing {
                let death = match direction {
                    Direction::Left => FallingState::ToDeathLeft,
                    Direction::Right => FallingState::ToDeathRight,
                };
                avatar.set_state(death, direction, ctx.animations)?;
            } else {
                avatar.set_state(StandingState::Standing, direction, ctx.animations)?;
            }
            let rect = avatar.body_rect();
            align_on_top(&mut avatar.position, &rect, &landing.tile);
            avatar.velocity = Vec3::ZERO;
            avatar.y_fallen = 0.0;
            avatar.distance_traveled = 0.0;
            return Ok(true);
        }

        if state != FallingState::DownFacing {
            return Ok(false);
        }
        let travel = if avatar.velocity.x < 0.0 {
            Direction::Left
        } else {
            direction
        };
        if let Some(hit) = wall_collision(&body, ctx.tiles.walls(), travel) {
            let (impact, push) = match hit.side {
                CollisionSide::Left => (FallingState::WallImpactLeft, 1.0),
                _ => (FallingState::WallImpactRight, -1.0),
            };
            avatar.set_state(impact, direction, ctx.animations)?;
            let rect = avatar.body_rect();
            align_against(&mut avatar.position, &rect, &hit);
            avatar.velocity.x = self.tuning.wall_impact_correction * push;
            avatar.last_wall = Some(hit);
            return Ok(true);
        }
        Ok(false)
    }

    fn finish(
        &self,
        state: FallingState,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<(), AvatarError> {
        let direction = avatar.state.direction;
        match state {
            FallingState::WallImpactLeft | FallingState::WallImpactRight => {
                avatar.set_state(FallingState::DownFacing, direction, ctx.animations)
            }
            FallingState::ToDeathLeft | FallingState::ToDeathRight => {
                avatar.set_state(FallingState::Dead, direction, ctx.animations)
            }
            _ => Err(missing_transition(avatar)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regimes::test_support::Fixture;
    use crate::state::{Command, ParentState};
    use crate::tilemap::TileDef;

    fn controller() -> FallingController {
        FallingController::new(FallingTuning::default())
    }

    #[test]
    fn gravity_accumulates_and_clamps() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 64.0, 32.0)]);
        let mut avatar = fx.avatar(FallingState::DownFacing, Direction::Right, 500.0, 4000.0);
        for _ in 0..60 {
            avatar.begin_tick();
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
            assert!(avatar.velocity.y >= fx.world.max_velocity_per_frame - 0.001);
        }
        assert!((avatar.velocity.y + 12.0).abs() < 0.01);
        assert!(avatar.y_fallen < -500.0);
        assert_eq!(avatar.state.kind, FallingState::DownFacing.into());
    }

    #[test]
    fn safe_landing_stands_and_resets_fall() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 256.0, 32.0)]);
        let mut avatar = fx.avatar(FallingState::DownFacing, Direction::Left, 40.0, 36.0);
        avatar.velocity.y = -6.0;
        avatar.y_fallen = -100.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, StandingState::Standing.into());
        assert_eq!(avatar.state.direction, Direction::Left);
        assert_eq!(avatar.y_fallen, 0.0);
        assert!((avatar.position.y - 32.0).abs() < 0.01);
    }

    #[test]
    fn wall_impact_pushes_away_then_resumes_falling() {
        let fx = Fixture::new(&[
            TileDef::floor(0.0, 0.0, 512.0, 32.0),
            TileDef::wall(60.0, 200.0, 32.0, 200.0),
        ]);
        let mut avatar = fx.avatar(FallingState::DownFacing, Direction::Right, 20.0, 300.0);
        avatar.velocity.x = 2.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, FallingState::WallImpactRight.into());
        assert!((avatar.velocity.x + 1.0).abs() < 0.01);
        assert!((avatar.position.x - 16.0).abs() < 0.01);

        for _ in 0..3 {
            avatar.begin_tick();
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
        }
        assert_eq!(avatar.state.kind, FallingState::DownFacing.into());
    }

    #[test]
    fn wall_on_the_left_pushes_right() {
        let fx = Fixture::new(&[
            TileDef::floor(0.0, 0.0, 512.0, 32.0),
            TileDef::wall(0.0, 200.0, 32.0, 200.0),
        ]);
        let mut avatar = fx.avatar(FallingState::DownFacing, Direction::Left, 12.0, 300.0);
        avatar.velocity.x = -2.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, FallingState::WallImpactLeft.into());
        assert_eq!(avatar.state.direction, Direction::Left);
        assert!((avatar.velocity.x - 1.0).abs() < 0.01);
        assert!((avatar.position.x - 12.0).abs() < 0.01);
        assert!(avatar.last_wall.is_some());

        for _ in 0..3 {
            avatar.begin_tick();
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
        }
        assert_eq!(avatar.state.kind, FallingState::DownFacing.into());
        assert!(avatar.position.x > 12.0);
    }

    #[test]
    fn death_chains_to_dead_and_ignores_commands() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 256.0, 32.0)]);
        let mut avatar = fx.avatar(FallingState::ToDeathRight, Direction::Right, 40.0, 32.0);
        for _ in 0..8 {
            avatar.begin_tick();
            avatar.command = Command::running(Direction::Left);
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
        }
        assert_eq!(avatar.state.kind, FallingState::Dead.into());
        avatar.begin_tick();
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind.parent(), ParentState::Falling);
        assert_eq!(avatar.state.kind, FallingState::Dead.into());
        assert_eq!(avatar.state.state_index, 0);
    }
}
