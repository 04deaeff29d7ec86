use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::collision::Aabb;

/// Stable tile handle. Ids are handed out by [`TileRegistry::add`] and never
/// reused by the same registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

/// A tile as announced by the world, before it has an id.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub is_floor: bool,
    #[serde(default)]
    pub is_wall: bool,
}

impl TileDef {
    pub fn floor(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            is_floor: true,
            is_wall: false,
        }
    }

    pub fn wall(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            is_floor: false,
            is_wall: true,
            ..Self::floor(x, y, width, height)
        }
    }

    pub fn ledge(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            is_floor: true,
            is_wall: true,
            ..Self::floor(x, y, width, height)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tile {
    pub id: TileId,
    /// Bottom-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub is_floor: bool,
    pub is_wall: bool,
}

impl Tile {
    pub fn is_ledge(&self) -> bool {
        self.is_floor && self.is_wall
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_corner(self.position.x, self.position.y, self.size.x, self.size.y)
    }
}

/// Tile membership change announced by the world between ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TileChange {
    Add(TileDef),
    Remove(TileId),
}

/// Arena of live tiles plus the floor/wall/ledge classification lists.
///
/// A tile flagged both floor and wall is a ledge; it stays in the floor and
/// wall lists as well so landing and wall tests see it.
#[derive(Clone, Debug, Default)]
pub struct TileRegistry {
    slots: Vec<Option<Tile>>,
    floor: Vec<TileId>,
    wall: Vec<TileId>,
    ledge: Vec<TileId>,
}

impl TileRegistry {
    pub fn add(&mut self, def: TileDef) -> TileId {
        let id = TileId(self.slots.len() as u32);
        let tile = Tile {
            id,
            position: Vec2::new(def.x, def.y),
            size: Vec2::new(def.width, def.height),
            is_floor: def.is_floor,
            is_wall: def.is_wall,
        };
        if tile.is_floor {
            self.floor.push(id);
        }
        if tile.is_wall {
            self.wall.push(id);
        }
        if tile.is_ledge() {
            self.ledge.push(id);
        }
        self.slots.push(Some(tile));
        id
    }

    pub fn remove(&mut self, id: TileId) -> Option<Tile> {
        let tile = self.slots.get_mut(id.0 as usize)?.take()?;
        self.floor.retain(|t| *t != id);
        self.wall.retain(|t| *t != id);
        self.ledge.retain(|t| *t != id);
        Some(tile)
    }

    /// Applies a world notification. Returns the id that was added or removed,
    /// or `None` when a removal named an unknown tile.
    pub fn apply(&mut self, change: TileChange) -> Option<TileId> {
        match change {
            TileChange::Add(def) => Some(self.add(def)),
            TileChange::Remove(id) => self.remove(id).map(|t| t.id),
        }
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn floors(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.floor.iter().filter_map(|id| self.get(*id))
    }

    pub fn walls(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.wall.iter().filter_map(|id| self.get(*id))
    }

    pub fn ledges(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.ledge.iter().filter_map(|id| self.get(*id))
    }

    pub fn floor_count(&self) -> usize {
        self.floor.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileCode {
    Empty = 0,
    Floor = 1,
    Wall = 2,
    Ledge = 3,
}

impl TileCode {
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => TileCode::Floor,
            2 => TileCode::Wall,
            3 => TileCode::Ledge,
            _ => TileCode::Empty,
        }
    }
}

/// Row-major tile grid, row 0 at the bottom. Builds the tile notifications a
/// level would send.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileGrid {
    pub width: usize,
    pub height: usize,
    pub tiles: Vec<u8>,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
}

fn default_tile_size() -> f32 {
    32.0
}

impl TileGrid {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tiles: vec![0u8; width * height],
            tile_size: default_tile_size(),
        }
    }

    pub fn get(&self, x: i32, y: i32) -> TileCode {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return TileCode::Empty;
        }
        self.tiles
            .get(y as usize * self.width + x as usize)
            .map_or(TileCode::Empty, |v| TileCode::from_u8(*v))
    }

    pub fn set(&mut self, x: i32, y: i32, code: TileCode) {
        if x >= 0 && y >= 0 && x < self.width as i32 && y < self.height as i32 {
            let idx = y as usize * self.width + x as usize;
            if let Some(slot) = self.tiles.get_mut(idx) {
                *slot = code as u8;
            }
        }
    }

    pub fn tile_defs(&self) -> Vec<TileDef> {
        let ts = self.tile_size;
        let mut defs = Vec::new();
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let (fx, fy) = (x as f32 * ts, y as f32 * ts);
                match self.get(x, y) {
                    TileCode::Empty => {}
                    TileCode::Floor => defs.push(TileDef::floor(fx, fy, ts, ts)),
                    TileCode::Wall => defs.push(TileDef::wall(fx, fy, ts, ts)),
                    TileCode::Ledge => defs.push(TileDef::ledge(fx, fy, ts, ts)),
                }
            }
        }
        defs
    }

    pub fn populate(&self, registry: &mut TileRegistry) -> Vec<TileId> {
        self.tile_defs().into_iter().map(|def| registry.add(def)).collect()
    }

    /// A small level for development: ground, a raised platform with ledge
    /// ends and a climbable wall.
    pub fn test_level() -> Self {
        let mut grid = Self::empty(40, 12);

        for x in 0..40 {
            grid.set(x, 0, TileCode::Floor);
        }

        // Platform at row 5, x=10..16, grabbable at both ends.
        for x in 10..16 {
            grid.set(x, 5, TileCode::Floor);
        }
        grid.set(10, 5, TileCode::Ledge);
        grid.set(15, 5, TileCode::Ledge);

        // Wall at x=30, rows 1..4, topped by a ledge.
        for y in 1..4 {
            grid.set(30, y, TileCode::Wall);
        }
        grid.set(30, 4, TileCode::Ledge);

        grid
    }
}
