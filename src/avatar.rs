use bevy::math::{Vec2, Vec3};

use crate::animation::AnimationLibrary;
use crate::collision::{Aabb, Collision};
use crate::config::MIDDLEGROUND_Z;
use crate::error::AvatarError;
use crate::state::{
    AvatarState, Command, Direction, StandingState, State, BODY_BLOCK, HAND_BLOCK,
};

/// Body box used when a frame somehow carries no `"Avatar"` block.
pub const FALLBACK_BODY: Aabb = Aabb {
    min_x: 20.0,
    min_y: 0.0,
    max_x: 44.0,
    max_y: 80.0,
};

/// What was on screen at the start of the current tick.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSnapshot {
    pub state: State,
    pub position: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Avatar {
    pub position: Vec3,
    pub velocity: Vec3,
    pub state: State,
    pub command: Command,
    pub last_rendered: RenderSnapshot,
    /// 0 hides the avatar and suspends physics.
    pub transparency: f32,
    /// Downward displacement since the last landing or grab, never positive.
    pub y_fallen: f32,
    pub distance_traveled: f32,
    pub last_wall: Option<Collision>,
    pub last_ledge: Option<Collision>,
}

impl Avatar {
    pub fn new(spawn: Vec2, animations: &AnimationLibrary) -> Result<Self, AvatarError> {
        let mut avatar = Self::at(spawn);
        avatar.refresh_blocks(animations)?;
        Ok(avatar)
    }

    /// Standing avatar with no collision blocks yet; see [`Avatar::refresh_blocks`].
    pub fn at(spawn: Vec2) -> Self {
        let position = Vec3::new(spawn.x, spawn.y, MIDDLEGROUND_Z);
        let state = State::new(StandingState::Standing, Direction::Right);
        Self {
            position,
            velocity: Vec3::ZERO,
            last_rendered: RenderSnapshot {
                state: state.clone(),
                position,
            },
            state,
            command: Command::none(),
            transparency: 1.0,
            y_fallen: 0.0,
            distance_traveled: 0.0,
            last_wall: None,
            last_ledge: None,
        }
    }

    /// Re-derives the current frame's blocks, e.g. after new metadata loads.
    pub fn refresh_blocks(&mut self, animations: &AnimationLibrary) -> Result<(), AvatarError> {
        let frame = self.state.state_index;
        self.state.collision_blocks =
            blocks_for(animations, self.state.kind, frame, self.state.direction)?;
        self.last_rendered.state = self.state.clone();
        Ok(())
    }

    /// Enters `kind` at frame 0 and re-derives the collision blocks.
    pub fn set_state(
        &mut self,
        kind: impl Into<AvatarState>,
        direction: Direction,
        animations: &AnimationLibrary,
    ) -> Result<(), AvatarError> {
        let kind = kind.into();
        let blocks = blocks_for(animations, kind, 0, direction)?;
        self.state = State {
            kind,
            state_index: 0,
            direction,
            collision_blocks: blocks,
        };
        Ok(())
    }

    pub fn advance_frame(&mut self, animations: &AnimationLibrary) -> Result<(), AvatarError> {
        let clip = clip_for(animations, self.state.kind)?;
        let next = clip.next_frame(self.state.state_index);
        if next != self.state.state_index {
            self.state.state_index = next;
            self.state.collision_blocks = clip.blocks(next, self.state.direction).to_vec();
        }
        Ok(())
    }

    pub fn animation_finished(&self, animations: &AnimationLibrary) -> Result<bool, AvatarError> {
        Ok(clip_for(animations, self.state.kind)?.is_finished(self.state.state_index))
    }

    /// True until something changes the state during this tick.
    pub fn is_fresh(&self) -> bool {
        self.state == self.last_rendered.state
    }

    pub fn has_state_changed(&self) -> bool {
        self.state.kind != self.last_rendered.state.kind
    }

    pub fn begin_tick(&mut self) {
        self.last_rendered = RenderSnapshot {
            state: self.state.clone(),
            position: self.position,
        };
    }

    pub fn clear_command(&mut self) {
        self.command = Command::none();
    }

    /// Facing used for a command that may or may not name a direction.
    pub fn command_direction(&self) -> Direction {
        self.command.direction.unwrap_or(self.state.direction)
    }

    pub fn body_rect(&self) -> Aabb {
        self.state
            .block(BODY_BLOCK)
            .map_or(FALLBACK_BODY, |b| b.rect)
    }

    pub fn hand_rect(&self) -> Option<Aabb> {
        self.state.block(HAND_BLOCK).map(|b| b.rect)
    }

    pub fn body(&self) -> Aabb {
        self.body_rect().translated(self.position.truncate())
    }

    pub fn hand(&self) -> Option<Aabb> {
        self.hand_rect().map(|r| r.translated(self.position.truncate()))
    }

    /// Bottom edge of the body where it stood when the tick began.
    pub fn previous_bottom(&self) -> f32 {
        self.body_rect().min_y + self.last_rendered.position.y
    }

    pub fn speed(&self) -> f32 {
        self.velocity.x.abs()
    }

    pub fn hide(&mut self) {
        self.position = Vec3::new(0.0, 0.0, MIDDLEGROUND_Z);
        self.velocity = Vec3::ZERO;
    }
}

fn clip_for(
    animations: &AnimationLibrary,
    kind: AvatarState,
) -> Result<&crate::animation::AnimationClip, AvatarError> {
    animations
        .clip(kind)
        .ok_or(AvatarError::MissingAnimation {
            parent: kind.parent(),
            state: kind.label(),
        })
}

fn blocks_for(
    animations: &AnimationLibrary,
    kind: AvatarState,
    frame: u32,
    direction: Direction,
) -> Result<Vec<crate::state::CollisionBlock>, AvatarError> {
    Ok(clip_for(animations, kind)?.blocks(frame, direction).to_vec())
}
