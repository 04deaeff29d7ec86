use std::collections::BTreeMap;

use bevy::log::{debug, error, info, warn};
use bevy::math::{Vec2, Vec3};
use bevy::prelude::Resource;
use serde::Serialize;

use crate::animation::{resolve_animation_library, AnimationLibrary};
use crate::avatar::Avatar;
use crate::config::{AvatarTuning, GameConfig, WorldConstants};
use crate::error::{AnimationError, AvatarError};
use crate::regimes::{Regime, RegimeContext};
use crate::state::{AvatarState, Command, ParentState, State};
use crate::tilemap::{Tile, TileChange, TileDef, TileGrid, TileId, TileRegistry};
use crate::timing::FrameClock;
use crate::transitions::{TransitionLog, TransitionRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TickOutcome {
    /// `chained` counts regime changes re-dispatched within the tick.
    Settled { chained: usize },
    Hidden,
}

/// Owns the avatar and everything it collides with, and routes each tick to
/// the regime matching the avatar's parent state.
#[derive(Resource)]
pub struct AvatarController {
    avatar: Avatar,
    tiles: TileRegistry,
    world: WorldConstants,
    tuning: AvatarTuning,
    animations: AnimationLibrary,
    regimes: BTreeMap<ParentState, Regime>,
    clock: FrameClock,
    transitions: TransitionLog,
    spawn: Vec2,
    chain_limit: usize,
    ready: bool,
}

impl AvatarController {
    pub fn new(config: &GameConfig, animations: AnimationLibrary) -> Self {
        let spawn = Vec2::new(config.spawn[0], config.spawn[1]);
        let avatar = spawn_avatar(spawn, &animations);
        Self {
            avatar,
            tiles: TileRegistry::default(),
            world: config.world,
            tuning: config.tuning.clone(),
            animations,
            regimes: BTreeMap::new(),
            clock: FrameClock::new(config.frame_rate, config.debug_step),
            transitions: TransitionLog::default(),
            spawn,
            chain_limit: config.max_chained_transitions,
            ready: false,
        }
    }

    /// Builds a controller with the animation source named by `config`.
    pub fn from_config(config: &GameConfig) -> Result<Self, AnimationError> {
        let animations = resolve_animation_library(config.animations_path.as_deref())?;
        Ok(Self::new(config, animations))
    }

    /// Advances the avatar by one frame.
    ///
    /// Not-ready and contact errors leave the avatar exactly as it was. Fatal
    /// errors do too, but the caller should stop ticking.
    pub fn tick(&mut self) -> Result<TickOutcome, AvatarError> {
        self.check_ready()?;

        if self.avatar.transparency <= 0.0 {
            self.avatar.hide();
            self.avatar.begin_tick();
            self.clock.mark_frame();
            return Ok(TickOutcome::Hidden);
        }

        let before = self.avatar.clone();
        match self.dispatch() {
            Ok(chained) => {
                self.clock.mark_frame();
                Ok(TickOutcome::Settled { chained })
            }
            Err(e) => {
                self.avatar = before;
                if !e.is_fatal() {
                    warn!("[Charlie avatar] Tick {} skipped: {e}", self.clock.frame());
                }
                Err(e)
            }
        }
    }

    /// Runs as many ticks as the frame clock says are due after `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Result<u32, AvatarError> {
        let due = self.clock.advance(dt);
        for _ in 0..due {
            self.tick()?;
        }
        Ok(due)
    }

    fn check_ready(&mut self) -> Result<(), AvatarError> {
        let reason = if self.animations.is_empty() {
            Some("animation metadata not loaded")
        } else if self.tiles.floor_count() == 0 {
            Some("no floor tiles registered")
        } else {
            None
        };
        match reason {
            Some(reason) => {
                if self.ready {
                    warn!("[Charlie avatar] Controller no longer ready: {reason}");
                }
                self.ready = false;
                Err(AvatarError::NotReady { reason })
            }
            None => {
                if !self.ready {
                    info!(
                        "[Charlie avatar] Controller ready: {} clips, {} tiles",
                        self.animations.len(),
                        self.tiles.len()
                    );
                }
                self.ready = true;
                Ok(())
            }
        }
    }

    fn dispatch(&mut self) -> Result<usize, AvatarError> {
        let frame = self.clock.frame();
        self.avatar.begin_tick();
        let mut records = Vec::new();
        let mut chained = 0;
        loop {
            let parent = self.avatar.state.parent();
            let from = self.avatar.state.kind;
            let tuning = &self.tuning;
            let regime = self.regimes.entry(parent).or_insert_with(|| {
                debug!("[Charlie avatar] Wiring {parent} controller");
                Regime::for_parent(parent, tuning)
            });
            let ctx = RegimeContext {
                tiles: &self.tiles,
                world: &self.world,
                animations: &self.animations,
            };
            regime.run(&mut self.avatar, &ctx)?;

            let to = self.avatar.state.kind;
            if to != from {
                debug!("[Charlie avatar] Frame {frame}: {from} -> {to}");
                records.push(TransitionRecord::new(frame, from, to, self.avatar.state.direction));
            }
            if self.avatar.state.parent() == parent {
                break;
            }
            chained += 1;
            chain_guard(chained, self.chain_limit, to)?;
        }
        for record in records {
            self.transitions.record(record);
        }
        Ok(chained)
    }

    pub fn apply_tile_change(&mut self, change: TileChange) -> Option<TileId> {
        let applied = self.tiles.apply(change);
        match (change, applied) {
            (TileChange::Add(def), Some(id)) => {
                debug!("[Charlie tiles] Added tile {} at ({}, {})", id.0, def.x, def.y)
            }
            (TileChange::Remove(_), Some(id)) => debug!("[Charlie tiles] Removed tile {}", id.0),
            (TileChange::Remove(id), None) => {
                warn!("[Charlie tiles] Ignoring removal of unknown tile {}", id.0)
            }
            (TileChange::Add(_), None) => {}
        }
        applied
    }

    /// Registers every tile of `level`, as a world sending one notification per
    /// tile would.
    pub fn load_level(&mut self, level: &TileGrid) -> Vec<TileId> {
        let ids = level.populate(&mut self.tiles);
        info!(
            "[Charlie tiles] Loaded {}x{} level ({} tiles)",
            level.width,
            level.height,
            ids.len()
        );
        ids
    }

    pub fn add_tile(&mut self, def: TileDef) -> TileId {
        self.tiles.add(def)
    }

    pub fn remove_tile(&mut self, id: TileId) -> Option<Tile> {
        self.tiles.remove(id)
    }

    pub fn set_command(&mut self, command: Command) {
        self.avatar.command = command;
    }

    pub fn set_transparency(&mut self, transparency: f32) {
        self.avatar.transparency = transparency.clamp(0.0, 1.0);
    }

    /// Swaps in new metadata and re-derives the current collision blocks.
    pub fn set_animations(&mut self, animations: AnimationLibrary) -> Result<(), AvatarError> {
        self.avatar.refresh_blocks(&animations)?;
        self.animations = animations;
        Ok(())
    }

    /// Recreates the avatar at its spawn point. Tiles are kept.
    pub fn reset_to_defaults(&mut self) {
        self.avatar = spawn_avatar(self.spawn, &self.animations);
        self.transitions.clear();
        self.clock.reset();
        info!("[Charlie avatar] Reset to spawn ({}, {})", self.spawn.x, self.spawn.y);
    }

    pub fn has_state_changed(&self) -> bool {
        self.avatar.has_state_changed()
    }

    pub fn avatar(&self) -> &Avatar {
        &self.avatar
    }

    pub fn avatar_mut(&mut self) -> &mut Avatar {
        &mut self.avatar
    }

    pub fn state(&self) -> &State {
        &self.avatar.state
    }

    pub fn position(&self) -> Vec3 {
        self.avatar.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.avatar.velocity
    }

    pub fn tiles(&self) -> &TileRegistry {
        &self.tiles
    }

    pub fn animations(&self) -> &AnimationLibrary {
        &self.animations
    }

    pub fn transitions(&self) -> &TransitionLog {
        &self.transitions
    }

    pub fn transitions_mut(&mut self) -> &mut TransitionLog {
        &mut self.transitions
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }
}

/// Metadata may arrive after the controller is built; until then the avatar
/// has no collision blocks and ticks report not-ready.
fn spawn_avatar(spawn: Vec2, animations: &AnimationLibrary) -> Avatar {
    Avatar::new(spawn, animations).unwrap_or_else(|e| {
        warn!("[Charlie avatar] {e}; spawning without collision blocks");
        Avatar::at(spawn)
    })
}

fn chain_guard(chained: usize, limit: usize, state: AvatarState) -> Result<(), AvatarError> {
    if chained > limit {
        error!(
            "[Charlie avatar] Transition chain did not settle within {limit} regime changes \
             (last {state})"
        );
        return Err(AvatarError::TransitionLimitExceeded {
            limit,
            parent: state.parent(),
            state: state.label(),
        });
    }
    Ok(())
}
