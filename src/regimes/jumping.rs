use bevy::math::Vec3;

use crate::avatar::Avatar;
use crate::collision::{
    align_against, align_on_last_wall, align_on_ledge, align_on_top, find_landing, floor_support,
    ledge_grab, wall_collision, CollisionSide,
};
use crate::config::JumpingTuning;
use crate::error::AvatarError;
use crate::regimes::{integrate_airborne, missing_transition, wrong_regime, RegimeContext};
use crate::state::{
    AvatarState, ClimbingState, CommandAction, Direction, FallingState, JumpingState, ParentState,
    RunningState, StandingState,
};

/// Which of the three jump chains a sub-state belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Arc {
    Vertical,
    Gap,
    Wall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Takeoff,
    Rise,
    Fall,
    Landing,
}

fn classify(state: JumpingState) -> (Arc, Phase) {
    use JumpingState::*;
    match state {
        VerticalTakeoff => (Arc::Vertical, Phase::Takeoff),
        VerticalRise => (Arc::Vertical, Phase::Rise),
        VerticalFall => (Arc::Vertical, Phase::Fall),
        VerticalLanding => (Arc::Vertical, Phase::Landing),
        GapTakeoff => (Arc::Gap, Phase::Takeoff),
        GapArcRise => (Arc::Gap, Phase::Rise),
        GapArcFall => (Arc::Gap, Phase::Fall),
        GapLanding => (Arc::Gap, Phase::Landing),
        WallTakeoff => (Arc::Wall, Phase::Takeoff),
        WallArcRise => (Arc::Wall, Phase::Rise),
        WallArcFall => (Arc::Wall, Phase::Fall),
        WallLanding => (Arc::Wall, Phase::Landing),
    }
}

fn sub_state(arc: Arc, phase: Phase) -> JumpingState {
    use JumpingState::*;
    match (arc, phase) {
        (Arc::Vertical, Phase::Takeoff) => VerticalTakeoff,
        (Arc::Vertical, Phase::Rise) => VerticalRise,
        (Arc::Vertical, Phase::Fall) => VerticalFall,
        (Arc::Vertical, Phase::Landing) => VerticalLanding,
        (Arc::Gap, Phase::Takeoff) => GapTakeoff,
        (Arc::Gap, Phase::Rise) => GapArcRise,
        (Arc::Gap, Phase::Fall) => GapArcFall,
        (Arc::Gap, Phase::Landing) => GapLanding,
        (Arc::Wall, Phase::Takeoff) => WallTakeoff,
        (Arc::Wall, Phase::Rise) => WallArcRise,
        (Arc::Wall, Phase::Fall) => WallArcFall,
        (Arc::Wall, Phase::Landing) => WallLanding,
    }
}

#[derive(Clone, Debug)]
pub struct JumpingController {
    tuning: JumpingTuning,
}

impl JumpingController {
    pub fn new(tuning: JumpingTuning) -> Self {
        Self { tuning }
    }

    pub fn run(&self, avatar: &mut Avatar, ctx: &RegimeContext<'_>) -> Result<(), AvatarError> {
        let AvatarState::Jumping(state) = avatar.state.kind else {
            return Err(wrong_regime(ParentState::Jumping, avatar));
        };
        let (arc, phase) = classify(state);
        if !avatar.is_fresh() {
            self.contacts(arc, phase, avatar, ctx)?;
            return Ok(());
        }

        match phase {
            // The launch velocity is set by whoever started the jump; it is
            // held until the takeoff animation ends.
            Phase::Takeoff => {}
            Phase::Rise | Phase::Fall => integrate_airborne(avatar, ctx.world),
            Phase::Landing => {
                let speed = (avatar.speed() - self.tuning.landing_friction).max(0.0);
                avatar.velocity = Vec3::new(speed * avatar.velocity.x.signum(), 0.0, 0.0);
                avatar.position.x += avatar.velocity.x;
            }
        }
        if self.contacts(arc, phase, avatar, ctx)? {
            return Ok(());
        }
        if avatar.animation_finished(ctx.animations)? {
            return self.finish(arc, phase, avatar, ctx);
        }
        avatar.advance_frame(ctx.animations)
    }

    fn contacts(
        &self,
        arc: Arc,
        phase: Phase,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        match phase {
            // Wall takeoff stays flush against the wall it kicks off.
            Phase::Takeoff if arc == Arc::Wall => {
                let rect = avatar.body_rect();
                align_on_last_wall(&mut avatar.position, &rect, avatar.last_wall.as_ref())?;
                Ok(false)
            }
            Phase::Takeoff => Ok(false),
            Phase::Rise | Phase::Fall => self.air_contacts(arc, phase, avatar, ctx),
            Phase::Landing => self.landing_contacts(avatar, ctx),
        }
    }

    fn air_contacts(
        &self,
        arc: Arc,
        phase: Phase,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        let direction = avatar.state.direction;

        if let Some(hand) = avatar.hand() {
            let tolerance = self.tuning.ledge_grab_tolerance;
            if let Some(grab) = ledge_grab(&hand, ctx.tiles.ledges(), direction, tolerance) {
                let kind = if avatar.velocity.y > 0.0 {
                    ClimbingState::GrabAscending
                } else {
                    ClimbingState::GrabDescending
                };
                avatar.set_state(kind, direction, ctx.animations)?;
                let body = avatar.body_rect();
                let hand = avatar.hand_rect().unwrap_or(body);
                align_on_ledge(&mut avatar.position, &body, &hand, &grab.tile, direction);
                avatar.velocity = Vec3::ZERO;
                avatar.y_fallen = 0.0;
                avatar.distance_traveled = 0.0;
                avatar.last_ledge = Some(grab);
                return Ok(true);
            }
        }

        let body = avatar.body();
        if avatar.velocity.y <= 0.0 {
            let previous_bottom = avatar.previous_bottom();
            if let Some(landing) = find_landing(&body, previous_bottom, ctx.tiles.floors()) {
                avatar.set_state(sub_state(arc, Phase::Landing), direction, ctx.animations)?;
                let rect = avatar.body_rect();
                align_on_top(&mut avatar.position, &rect, &landing.tile);
                avatar.velocity.y = 0.0;
                avatar.y_fallen = 0.0;
                avatar.distance_traveled = 0.0;
                return Ok(true);
            }
        }

        let travel = if avatar.velocity.x < 0.0 {
            Direction::Left
        } else if avatar.velocity.x > 0.0 {
            Direction::Right
        } else {
            direction
        };
        if let Some(hit) = wall_collision(&body, ctx.tiles.walls(), travel) {
            let rect = avatar.body_rect();
            align_against(&mut avatar.position, &rect, &hit);
            avatar.last_wall = Some(hit);
            if arc != Arc::Vertical && avatar.command.is(CommandAction::Jumping) {
                let away = match hit.side {
                    CollisionSide::Left => Direction::Right,
                    _ => Direction::Left,
                };
                let mut vy = self.tuning.wall_jump.vy;
                if avatar.distance_traveled > self.tuning.wall_jump_boost_distance {
                    vy += self.tuning.wall_jump_boost_vy;
                }
                avatar.set_state(JumpingState::WallTakeoff, away, ctx.animations)?;
                avatar.velocity = Vec3::new(self.tuning.wall_jump.vx * away.sign(), vy, 0.0);
                avatar.distance_traveled = 0.0;
                avatar.clear_command();
                return Ok(true);
            }
            avatar.velocity.x = 0.0;
        }

        // Phase changes below depend on this tick's motion.
        if !avatar.is_fresh() {
            return Ok(false);
        }
        match phase {
            Phase::Rise if avatar.velocity.y <= 0.0 => {
                avatar.set_state(sub_state(arc, Phase::Fall), direction, ctx.animations)?;
                Ok(true)
            }
            Phase::Fall if avatar.y_fallen < self.tuning.fall_handoff_distance => {
                avatar.set_state(FallingState::DownFacing, direction, ctx.animations)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn landing_contacts(
        &self,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<bool, AvatarError> {
        let direction = avatar.state.direction;
        let body = avatar.body();
        if let Some(hit) = wall_collision(&body, ctx.tiles.walls(), direction) {
            let rect = avatar.body_rect();
            align_against(&mut avatar.position, &rect, &hit);
            avatar.velocity.x = 0.0;
            avatar.last_wall = Some(hit);
        }
        let body = avatar.body();
        if floor_support(&body, ctx.tiles.floors()).is_none() {
            avatar.set_state(JumpingState::GapArcFall, direction, ctx.animations)?;
            avatar.velocity.y = 0.0;
            return Ok(true);
        }
        Ok(false)
    }

    fn finish(
        &self,
        arc: Arc,
        phase: Phase,
        avatar: &mut Avatar,
        ctx: &RegimeContext<'_>,
    ) -> Result<(), AvatarError> {
        let direction = avatar.state.direction;
        match phase {
            Phase::Takeoff => {
                avatar.set_state(sub_state(arc, Phase::Rise), direction, ctx.animations)
            }
            Phase::Landing => match avatar.command.action {
                Some(CommandAction::Running) => {
                    let run_direction = avatar.command_direction();
                    let speed = if run_direction == direction {
                        avatar.speed()
                    } else {
                        0.0
                    };
                    avatar.set_state(
                        RunningState::StandingToRunning,
                        run_direction,
                        ctx.animations,
                    )?;
                    avatar.velocity = Vec3::new(speed * run_direction.sign(), 0.0, 0.0);
                    avatar.distance_traveled = 0.0;
                    avatar.clear_command();
                    Ok(())
                }
                Some(CommandAction::Jumping) => {
                    let vx = avatar
                        .command
                        .direction
                        .map_or(0.0, |d| self.tuning.repeat_jump.vx * d.sign());
                    let jump_direction = avatar.command_direction();
                    avatar.set_state(
                        JumpingState::VerticalTakeoff,
                        jump_direction,
                        ctx.animations,
                    )?;
                    avatar.velocity = Vec3::new(vx, self.tuning.repeat_jump.vy, 0.0);
                    avatar.clear_command();
                    Ok(())
                }
                _ => {
                    avatar.set_state(StandingState::Standing, direction, ctx.animations)?;
                    avatar.velocity = Vec3::ZERO;
                    avatar.distance_traveled = 0.0;
                    Ok(())
                }
            },
            // Rise and fall clips loop.
            Phase::Rise | Phase::Fall => Err(missing_transition(avatar)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContactKind;
    use crate::regimes::test_support::Fixture;
    use crate::state::Command;
    use crate::tilemap::TileDef;

    fn controller() -> JumpingController {
        JumpingController::new(JumpingTuning::default())
    }

    #[test]
    fn classification_round_trips() {
        for state in JumpingState::ALL {
            let (arc, phase) = classify(*state);
            assert_eq!(sub_state(arc, phase), *state);
        }
    }

    #[test]
    fn takeoff_holds_then_rises() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 256.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::GapTakeoff, Direction::Right, 40.0, 32.0);
        avatar.velocity = Vec3::new(7.0, 9.0, 0.0);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert!((avatar.position.x - 40.0).abs() < 0.01);
        avatar.begin_tick();
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::GapArcRise.into());
        assert!((avatar.velocity.y - 9.0).abs() < 0.01);
    }

    #[test]
    fn rise_turns_into_fall_at_apex() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 256.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::VerticalRise, Direction::Right, 40.0, 100.0);
        avatar.velocity.y = 0.3;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::VerticalFall.into());
    }

    #[test]
    fn arc_lands_on_floor_and_resets_fall() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 256.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::GapArcFall, Direction::Right, 40.0, 36.0);
        avatar.velocity = Vec3::new(3.0, -5.0, 0.0);
        avatar.y_fallen = -40.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::GapLanding.into());
        assert_eq!(avatar.y_fallen, 0.0);
        assert!((avatar.position.y - 32.0).abs() < 0.01);
        assert!((avatar.velocity.x - 3.0).abs() < 0.01);
    }

    #[test]
    fn long_fall_hands_off_to_falling() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 32.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::GapArcFall, Direction::Right, 400.0, 2000.0);
        avatar.y_fallen = -190.0;
        avatar.velocity.y = -4.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind.parent(), ParentState::Falling);
        assert_eq!(avatar.state.kind, FallingState::DownFacing.into());
    }

    #[test]
    fn pending_jump_at_wall_becomes_boosted_wall_jump() {
        let fx = Fixture::new(&[
            TileDef::floor(0.0, 0.0, 512.0, 32.0),
            TileDef::wall(100.0, 100.0, 32.0, 200.0),
        ]);
        let mut avatar = fx.avatar(JumpingState::GapArcRise, Direction::Right, 54.0, 150.0);
        avatar.velocity = Vec3::new(4.0, 3.0, 0.0);
        avatar.distance_traveled = 200.0;
        avatar.command = Command::jumping(None);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::WallTakeoff.into());
        assert_eq!(avatar.state.direction, Direction::Left);
        assert!((avatar.velocity.x + 4.0).abs() < 0.01);
        assert!((avatar.velocity.y - 12.0).abs() < 0.01);
        assert!((avatar.position.x - 56.0).abs() < 0.01);
        assert!(avatar.command.is_empty());
    }

    #[test]
    fn short_run_wall_jump_gets_no_boost_and_stays_flush() {
        let fx = Fixture::new(&[
            TileDef::floor(0.0, 0.0, 512.0, 32.0),
            TileDef::wall(100.0, 100.0, 32.0, 200.0),
        ]);
        let mut avatar = fx.avatar(JumpingState::WallArcRise, Direction::Right, 54.0, 150.0);
        avatar.velocity = Vec3::new(4.0, 3.0, 0.0);
        avatar.distance_traveled = 50.0;
        avatar.command = Command::jumping(Some(Direction::Right));
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::WallTakeoff.into());
        assert!((avatar.velocity.x + 4.0).abs() < 0.01);
        assert!((avatar.velocity.y - 9.0).abs() < 0.01);
        assert_eq!(avatar.distance_traveled, 0.0);

        avatar.position.x = 50.0;
        avatar.begin_tick();
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::WallTakeoff.into());
        assert!((avatar.position.x - 56.0).abs() < 0.01);
    }

    #[test]
    fn wall_takeoff_without_a_wall_contact_is_an_error() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 512.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::WallTakeoff, Direction::Left, 54.0, 150.0);
        let err = controller().run(&mut avatar, &fx.ctx()).unwrap_err();
        assert_eq!(
            err,
            AvatarError::NoSuchContact {
                contact: ContactKind::Wall
            }
        );
        assert!(!err.is_fatal());
    }

    #[test]
    fn wall_without_jump_command_snaps_and_stops_horizontal_motion() {
        let fx = Fixture::new(&[
            TileDef::floor(0.0, 0.0, 512.0, 32.0),
            TileDef::wall(100.0, 100.0, 32.0, 200.0),
        ]);
        let mut avatar = fx.avatar(JumpingState::GapArcRise, Direction::Right, 54.0, 150.0);
        avatar.velocity = Vec3::new(4.0, 3.0, 0.0);
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, JumpingState::GapArcRise.into());
        assert_eq!(avatar.velocity.x, 0.0);
        assert!((avatar.position.x - 56.0).abs() < 0.01);
    }

    #[test]
    fn rising_hand_grabs_ascending() {
        let fx = Fixture::new(&[TileDef::ledge(100.0, 200.0, 32.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::VerticalRise, Direction::Right, 56.0, 135.0);
        avatar.velocity.y = 5.0;
        controller().run(&mut avatar, &fx.ctx()).expect("tick");
        assert_eq!(avatar.state.kind, ClimbingState::GrabAscending.into());
        assert!((avatar.position.y - 142.0).abs() < 0.01);
        assert!(avatar.last_ledge.is_some());
    }

    #[test]
    fn landing_ends_in_queued_run() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 512.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::GapLanding, Direction::Right, 40.0, 32.0);
        avatar.velocity.x = 4.0;
        for _ in 0..4 {
            avatar.begin_tick();
            avatar.command = Command::running(Direction::Right);
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
        }
        assert_eq!(avatar.state.kind, RunningState::StandingToRunning.into());
        assert!((avatar.velocity.x - 2.0).abs() < 0.01);
    }

    #[test]
    fn landing_with_queued_jump_repeats_vertical_jump() {
        let fx = Fixture::new(&[TileDef::floor(0.0, 0.0, 512.0, 32.0)]);
        let mut avatar = fx.avatar(JumpingState::VerticalLanding, Direction::Left, 40.0, 32.0);
        for _ in 0..3 {
            avatar.begin_tick();
            avatar.command = Command::jumping(None);
            controller().run(&mut avatar, &fx.ctx()).expect("tick");
        }
        assert_eq!(avatar.state.kind, JumpingState::VerticalTakeoff.into());
        assert_eq!(avatar.state.direction, Direction::Left);
        assert!((avatar.velocity.y - 10.0).abs() < 0.01);
    }
}
