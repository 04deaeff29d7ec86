use std::collections::HashMap;
use std::path::Path;

use bevy::log::{error, info};
use serde::{Deserialize, Serialize};

use crate::collision::Aabb;
use crate::error::AnimationError;
use crate::state::{
    AvatarState, ClimbingState, CollisionBlock, Direction, FallingState, JumpingState,
    RunningState, StandingState, BODY_BLOCK, HAND_BLOCK,
};

const EMBEDDED_ANIMATIONS: &str =
    include_str!(concat!(env!("OUT_DIR"), "/charlie_embedded_animations.json"));

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDef {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BlockDef {
    pub fn new(name: &str, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
            width,
            height,
        }
    }

    fn to_block(&self) -> CollisionBlock {
        CollisionBlock {
            name: self.name.clone(),
            rect: Aabb::from_corner(self.x, self.y, self.width, self.height),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameBlocksDef {
    #[serde(default)]
    pub right: Vec<BlockDef>,
    #[serde(default)]
    pub left: Option<Vec<BlockDef>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationClipDef {
    pub parent_state: String,
    pub state: String,
    pub frame_count: u32,
    #[serde(default)]
    pub repeatable: bool,
    /// One entry per frame; the last entry covers any remaining frames.
    #[serde(default)]
    pub frames: Vec<FrameBlocksDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationSetDef {
    pub frame_width: f32,
    pub clips: Vec<AnimationClipDef>,
}

#[derive(Clone, Debug, PartialEq)]
struct FrameBlocks {
    right: Vec<CollisionBlock>,
    left: Vec<CollisionBlock>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub frame_count: u32,
    pub repeatable: bool,
    frames: Vec<FrameBlocks>,
}

impl AnimationClip {
    pub fn blocks(&self, frame: u32, direction: Direction) -> &[CollisionBlock] {
        let Some(blocks) = self
            .frames
            .get(frame as usize)
            .or_else(|| self.frames.last())
        else {
            return &[];
        };
        match direction {
            Direction::Right => &blocks.right,
            Direction::Left => &blocks.left,
        }
    }

    pub fn last_frame(&self) -> u32 {
        self.frame_count.saturating_sub(1)
    }

    /// Frame that follows `frame`; repeatable clips wrap, others stop on the
    /// last frame.
    pub fn next_frame(&self, frame: u32) -> u32 {
        if frame + 1 < self.frame_count {
            frame + 1
        } else if self.repeatable {
            0
        } else {
            self.last_frame()
        }
    }

    pub fn is_finished(&self, frame: u32) -> bool {
        !self.repeatable && frame >= self.last_frame()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationLibrary {
    clips: HashMap<AvatarState, AnimationClip>,
}

impl AnimationLibrary {
    pub fn from_def(def: &AnimationSetDef) -> Result<Self, AnimationError> {
        let mut clips = HashMap::new();
        for clip_def in &def.clips {
            let state = AvatarState::from_labels(&clip_def.parent_state, &clip_def.state)
                .ok_or_else(|| AnimationError::UnknownState {
                    parent: clip_def.parent_state.clone(),
                    state: clip_def.state.clone(),
                })?;
            let (parent, label) = (state.parent().label(), state.label());
            if clip_def.frame_count == 0 {
                return Err(AnimationError::EmptyClip {
                    parent,
                    state: label,
                });
            }
            if clip_def.frames.is_empty() || clip_def.frames.len() > clip_def.frame_count as usize {
                return Err(AnimationError::FrameMismatch {
                    parent,
                    state: label,
                    frames: clip_def.frames.len(),
                    frame_count: clip_def.frame_count,
                });
            }
            let mut frames = Vec::with_capacity(clip_def.frames.len());
            for (frame, blocks) in clip_def.frames.iter().enumerate() {
                let right: Vec<CollisionBlock> =
                    blocks.right.iter().map(BlockDef::to_block).collect();
                let left: Vec<CollisionBlock> = match &blocks.left {
                    Some(left) => left.iter().map(BlockDef::to_block).collect(),
                    None => right
                        .iter()
                        .map(|b| CollisionBlock {
                            name: b.name.clone(),
                            rect: b.rect.mirrored(def.frame_width),
                        })
                        .collect(),
                };
                let has_body =
                    |blocks: &[CollisionBlock]| blocks.iter().any(|b| b.name == BODY_BLOCK);
                if !has_body(&right) || !has_body(&left) {
                    return Err(AnimationError::MissingBodyBlock {
                        parent,
                        state: label,
                        frame,
                    });
                }
                frames.push(FrameBlocks { right, left });
            }
            let clip = AnimationClip {
                frame_count: clip_def.frame_count,
                repeatable: clip_def.repeatable,
                frames,
            };
            if clips.insert(state, clip).is_some() {
                return Err(AnimationError::DuplicateClip {
                    parent,
                    state: label,
                });
            }
        }
        Ok(Self { clips })
    }

    pub fn from_json(contents: &str) -> Result<Self, AnimationError> {
        let def: AnimationSetDef = serde_json::from_str(contents)?;
        Self::from_def(&def)
    }

    pub fn read(path: &Path) -> Result<Self, AnimationError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Metadata baked in at build time through `CHARLIE_EMBED_ANIMATIONS_PATH`.
    pub fn embedded() -> Option<Result<Self, AnimationError>> {
        if EMBEDDED_ANIMATIONS.trim().is_empty() {
            return None;
        }
        Some(Self::from_json(EMBEDDED_ANIMATIONS))
    }

    pub fn clip(&self, state: AvatarState) -> Option<&AnimationClip> {
        self.clips.get(&state)
    }

    pub fn insert(&mut self, state: AvatarState, clip: AnimationClip) -> Option<AnimationClip> {
        self.clips.insert(state, clip)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// States the controllers can reach that have no clip.
    pub fn missing_states(&self) -> Vec<AvatarState> {
        AvatarState::all()
            .filter(|s| !self.clips.contains_key(s))
            .collect()
    }
}

/// Picks the animation source: an explicit file, then build-time embedded
/// metadata, then the built-in Charlie table.
pub fn resolve_animation_library(path: Option<&str>) -> Result<AnimationLibrary, AnimationError> {
    if let Some(path) = path {
        let library = AnimationLibrary::read(Path::new(path))?;
        info!("[Charlie avatar] Loaded {} animation clips from {path}", library.len());
        return Ok(library);
    }
    if let Some(embedded) = AnimationLibrary::embedded() {
        let library = embedded?;
        info!("[Charlie avatar] Loaded {} embedded animation clips", library.len());
        return Ok(library);
    }
    Ok(charlie_animation_library())
}

pub const CHARLIE_FRAME_WIDTH: f32 = 64.0;

#[derive(Clone, Copy)]
enum Pose {
    Upright,
    Reaching,
    Crouched,
    Lying,
}

impl Pose {
    fn blocks(self) -> FrameBlocksDef {
        let right = match self {
            Pose::Upright => vec![
                BlockDef::new(BODY_BLOCK, 20.0, 0.0, 24.0, 80.0),
                BlockDef::new(HAND_BLOCK, 44.0, 36.0, 12.0, 16.0),
            ],
            Pose::Reaching => vec![
                BlockDef::new(BODY_BLOCK, 20.0, 0.0, 24.0, 80.0),
                BlockDef::new(HAND_BLOCK, 40.0, 70.0, 14.0, 20.0),
            ],
            Pose::Crouched => vec![
                BlockDef::new(BODY_BLOCK, 20.0, 0.0, 24.0, 64.0),
                BlockDef::new(HAND_BLOCK, 44.0, 28.0, 12.0, 16.0),
            ],
            Pose::Lying => vec![BlockDef::new(BODY_BLOCK, 8.0, 0.0, 48.0, 24.0)],
        };
        FrameBlocksDef { right, left: None }
    }
}

fn clip_def(
    state: impl Into<AvatarState>,
    frame_count: u32,
    repeatable: bool,
    poses: &[Pose],
) -> AnimationClipDef {
    let state = state.into();
    AnimationClipDef {
        parent_state: state.parent().label().to_string(),
        state: state.label().to_string(),
        frame_count,
        repeatable,
        frames: poses.iter().map(|p| p.blocks()).collect(),
    }
}

/// The Charlie animation table in its on-disk form.
pub fn charlie_animation_set() -> AnimationSetDef {
    use Pose::*;
    let clips = vec![
        clip_def(StandingState::Standing, 8, true, &[Upright]),
        clip_def(StandingState::Looking, 6, true, &[Upright]),
        clip_def(RunningState::StandingToRunning, 6, false, &[Upright]),
        clip_def(RunningState::Running, 10, true, &[Upright]),
        clip_def(RunningState::RunningToStanding, 6, false, &[Upright]),
        clip_def(RunningState::MidSpeedImpactRise, 4, true, &[Upright]),
        clip_def(RunningState::MidSpeedImpactFall, 4, true, &[Upright]),
        clip_def(RunningState::MidSpeedImpactLand, 4, false, &[Crouched, Crouched, Upright]),
        clip_def(RunningState::HighSpeedImpactRise, 4, true, &[Upright]),
        clip_def(RunningState::HighSpeedImpactFall, 4, true, &[Upright]),
        clip_def(
            RunningState::HighSpeedImpactLand,
            6,
            false,
            &[Crouched, Crouched, Crouched, Upright],
        ),
        clip_def(FallingState::DownFacing, 4, true, &[Upright]),
        clip_def(FallingState::WallImpactLeft, 3, false, &[Upright]),
        clip_def(FallingState::WallImpactRight, 3, false, &[Upright]),
        clip_def(FallingState::ToDeathLeft, 8, false, &[Crouched, Crouched, Lying]),
        clip_def(FallingState::ToDeathRight, 8, false, &[Crouched, Crouched, Lying]),
        clip_def(FallingState::Dead, 1, true, &[Lying]),
        clip_def(JumpingState::VerticalTakeoff, 3, false, &[Crouched, Crouched, Upright]),
        clip_def(JumpingState::VerticalRise, 4, true, &[Reaching]),
        clip_def(JumpingState::VerticalFall, 4, true, &[Reaching]),
        clip_def(JumpingState::VerticalLanding, 3, false, &[Crouched, Upright]),
        clip_def(JumpingState::GapTakeoff, 2, false, &[Upright]),
        clip_def(JumpingState::GapArcRise, 4, true, &[Reaching]),
        clip_def(JumpingState::GapArcFall, 4, true, &[Reaching]),
        clip_def(JumpingState::GapLanding, 4, false, &[Crouched, Crouched, Upright]),
        clip_def(JumpingState::WallTakeoff, 2, false, &[Upright]),
        clip_def(JumpingState::WallArcRise, 4, true, &[Reaching]),
        clip_def(JumpingState::WallArcFall, 4, true, &[Reaching]),
        clip_def(JumpingState::WallLanding, 3, false, &[Crouched, Upright]),
        clip_def(ClimbingState::GrabAscending, 3, false, &[Reaching]),
        clip_def(ClimbingState::GrabDescending, 3, false, &[Reaching]),
        clip_def(ClimbingState::Grabbing, 2, false, &[Reaching]),
        clip_def(ClimbingState::Hanging, 6, true, &[Reaching]),
        clip_def(ClimbingState::HangingDrop, 3, false, &[Reaching]),
        clip_def(ClimbingState::ClimbingUp, 6, false, &[Reaching]),
        clip_def(ClimbingState::ClimbingToStanding, 4, false, &[Crouched, Crouched, Upright]),
    ];
    AnimationSetDef {
        frame_width: CHARLIE_FRAME_WIDTH,
        clips,
    }
}

pub fn charlie_animation_library() -> AnimationLibrary {
    match AnimationLibrary::from_def(&charlie_animation_set()) {
        Ok(library) => library,
        Err(e) => {
            error!("[Charlie avatar] Built-in animation table is invalid: {e}");
            AnimationLibrary::default()
        }
    }
}
