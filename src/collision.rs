use bevy::math::{Vec2, Vec3};

use crate::error::{AvatarError, ContactKind};
use crate::state::Direction;
use crate::tilemap::Tile;

/// Vertical slack allowed when deciding whether the avatar rests on a floor.
pub const ADJACENCY_BAND: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn from_center(x: f32, y: f32, width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Self {
            min_x: x - hw,
            min_y: y - hh,
            max_x: x + hw,
            max_y: y + hh,
        }
    }

    pub fn from_corner(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width,
            max_y: y + height,
        }
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min_x: self.min_x + offset.x,
            min_y: self.min_y + offset.y,
            max_x: self.max_x + offset.x,
            max_y: self.max_y + offset.y,
        }
    }

    /// Mirror horizontally inside a sprite frame of `frame_width`.
    pub fn mirrored(&self, frame_width: f32) -> Self {
        Self {
            min_x: frame_width - self.max_x,
            min_y: self.min_y,
            max_x: frame_width - self.min_x,
            max_y: self.max_y,
        }
    }

    pub fn overlaps_x(&self, other: &Aabb) -> bool {
        self.max_x > other.min_x && self.min_x < other.max_x
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.overlaps_x(other) && self.max_y > other.min_y && self.min_y < other.max_y
    }

    pub fn contains_within(&self, point: Vec2, tolerance: f32) -> bool {
        point.x >= self.min_x - tolerance
            && point.x <= self.max_x + tolerance
            && point.y >= self.min_y - tolerance
            && point.y <= self.max_y + tolerance
    }
}

/// Side of the avatar that touched the tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionSide {
    Left,
    Right,
    Top,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    pub tile: Tile,
    pub side: CollisionSide,
}

/// Deterministic pick among qualifying tiles.
pub fn nearest_tile<'a>(
    reference: &Aabb,
    candidates: impl IntoIterator<Item = &'a Tile>,
) -> Option<&'a Tile> {
    let center = reference.center();
    candidates.into_iter().min_by(|a, b| {
        let da = a.aabb().center().distance_squared(center);
        let db = b.aabb().center().distance_squared(center);
        da.total_cmp(&db).then(a.id.cmp(&b.id))
    })
}

/// Floor tile whose top edge lies within [`ADJACENCY_BAND`] of the body's
/// bottom edge with overlapping horizontal ranges.
pub fn floor_support<'a>(
    body: &Aabb,
    floors: impl IntoIterator<Item = &'a Tile>,
) -> Option<&'a Tile> {
    nearest_tile(
        body,
        floors.into_iter().filter(|tile| {
            let t = tile.aabb();
            body.overlaps_x(&t) && (body.min_y - t.max_y).abs() <= ADJACENCY_BAND
        }),
    )
}

pub fn is_floor_adjacent<'a>(body: &Aabb, floors: impl IntoIterator<Item = &'a Tile>) -> bool {
    floor_support(body, floors).is_some()
}

pub fn floor_collision<'a>(
    body: &Aabb,
    floors: impl IntoIterator<Item = &'a Tile>,
) -> Option<Collision> {
    nearest_tile(body, floors.into_iter().filter(|tile| body.overlaps(&tile.aabb()))).map(|tile| {
        Collision {
            tile: *tile,
            side: CollisionSide::Top,
        }
    })
}

pub fn is_floor_colliding<'a>(body: &Aabb, floors: impl IntoIterator<Item = &'a Tile>) -> bool {
    floor_collision(body, floors).is_some()
}

/// Floor whose top edge the body's bottom crossed (or reached) while moving
/// down from `prev_bottom`. Floors are one-way: a body rising through a floor
/// from below never lands on it. The highest qualifying top wins.
pub fn find_landing<'a>(
    body: &Aabb,
    prev_bottom: f32,
    floors: impl IntoIterator<Item = &'a Tile>,
) -> Option<Collision> {
    let candidates: Vec<&Tile> = floors
        .into_iter()
        .filter(|tile| {
            let t = tile.aabb();
            body.overlaps_x(&t)
                && prev_bottom >= t.max_y - ADJACENCY_BAND
                && body.min_y <= t.max_y + ADJACENCY_BAND
        })
        .collect();
    let best_top = candidates
        .iter()
        .map(|tile| tile.aabb().max_y)
        .fold(None, |acc: Option<f32>, y| Some(acc.map_or(y, |v| v.max(y))))?;
    nearest_tile(
        body,
        candidates
            .into_iter()
            .filter(|tile| tile.aabb().max_y >= best_top),
    )
    .map(|tile| Collision {
        tile: *tile,
        side: CollisionSide::Top,
    })
}

/// Wall tile overlapping the body, reporting which side of the avatar hit it.
/// The side follows the tile centre; a tile centred exactly on the body is
/// attributed to the direction of travel.
pub fn wall_collision<'a>(
    body: &Aabb,
    walls: impl IntoIterator<Item = &'a Tile>,
    travel: Direction,
) -> Option<Collision> {
    let tile = nearest_tile(body, walls.into_iter().filter(|tile| body.overlaps(&tile.aabb())))?;
    let tile_x = tile.aabb().center().x;
    let body_x = body.center().x;
    let side = if tile_x > body_x {
        CollisionSide::Right
    } else if tile_x < body_x {
        CollisionSide::Left
    } else {
        match travel {
            Direction::Left => CollisionSide::Left,
            Direction::Right => CollisionSide::Right,
        }
    };
    Some(Collision { tile: *tile, side })
}

pub fn is_wall_colliding<'a>(
    body: &Aabb,
    walls: impl IntoIterator<Item = &'a Tile>,
    travel: Direction,
) -> bool {
    wall_collision(body, walls, travel).is_some()
}

/// Ledge whose outer top corner (the one facing the avatar) falls inside the
/// hand box, widened by `tolerance`. Full-body overlap is not required.
pub fn ledge_grab<'a>(
    hand: &Aabb,
    ledges: impl IntoIterator<Item = &'a Tile>,
    facing: Direction,
    tolerance: f32,
) -> Option<Collision> {
    let tile = nearest_tile(
        hand,
        ledges
            .into_iter()
            .filter(|tile| hand.contains_within(grab_corner(tile, facing), tolerance)),
    )?;
    let side = match facing {
        Direction::Left => CollisionSide::Left,
        Direction::Right => CollisionSide::Right,
    };
    Some(Collision { tile: *tile, side })
}

pub fn can_grab_a_ledge<'a>(
    hand: &Aabb,
    ledges: impl IntoIterator<Item = &'a Tile>,
    facing: Direction,
    tolerance: f32,
) -> bool {
    ledge_grab(hand, ledges, facing, tolerance).is_some()
}

fn grab_corner(tile: &Tile, facing: Direction) -> Vec2 {
    let t = tile.aabb();
    match facing {
        Direction::Right => Vec2::new(t.min_x, t.max_y),
        Direction::Left => Vec2::new(t.max_x, t.max_y),
    }
}

// Alignment. `body` and `hand` are the avatar-relative block rectangles; only
// the axis being aligned is written.

pub fn align_on_top(position: &mut Vec3, body: &Aabb, tile: &Tile) {
    position.y = tile.aabb().max_y - body.min_y;
}

/// Place the avatar to the left of `tile`, its right edge on the tile's left edge.
pub fn align_on_left(position: &mut Vec3, body: &Aabb, tile: &Tile) {
    position.x = tile.aabb().min_x - body.max_x;
}

/// Place the avatar to the right of `tile`, its left edge on the tile's right edge.
pub fn align_on_right(position: &mut Vec3, body: &Aabb, tile: &Tile) {
    position.x = tile.aabb().max_x - body.min_x;
}

pub fn align_against(position: &mut Vec3, body: &Aabb, collision: &Collision) {
    match collision.side {
        CollisionSide::Right => align_on_left(position, body, &collision.tile),
        CollisionSide::Left => align_on_right(position, body, &collision.tile),
        CollisionSide::Top => align_on_top(position, body, &collision.tile),
    }
}

pub fn align_on_last_wall(
    position: &mut Vec3,
    body: &Aabb,
    last_wall: Option<&Collision>,
) -> Result<(), AvatarError> {
    let collision = last_wall.ok_or(AvatarError::NoSuchContact {
        contact: ContactKind::Wall,
    })?;
    align_against(position, body, collision);
    Ok(())
}

/// Hang from `ledge`: hand top level with the ledge top, body flush with the
/// ledge face on the side the avatar is facing.
pub fn align_on_ledge(
    position: &mut Vec3,
    body: &Aabb,
    hand: &Aabb,
    ledge: &Tile,
    facing: Direction,
) {
    position.y = ledge.aabb().max_y - hand.max_y;
    match facing {
        Direction::Right => align_on_left(position, body, ledge),
        Direction::Left => align_on_right(position, body, ledge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tilemap::{TileDef, TileRegistry};

    fn body_at(x: f32, y: f32) -> Aabb {
        Aabb::from_corner(x, y, 24.0, 80.0)
    }

    fn registry(defs: &[TileDef]) -> TileRegistry {
        let mut tiles = TileRegistry::default();
        for def in defs {
            tiles.add(*def);
        }
        tiles
    }

    #[test]
    fn adjacency_tolerates_one_pixel_gap() {
        let tiles = registry(&[TileDef::floor(0.0, 0.0, 32.0, 32.0)]);
        assert!(is_floor_adjacent(&body_at(4.0, 32.0), tiles.floors()));
        assert!(is_floor_adjacent(&body_at(4.0, 32.9), tiles.floors()));
        assert!(!is_floor_adjacent(&body_at(4.0, 34.0), tiles.floors()));
    }

    #[test]
    fn adjacency_requires_horizontal_overlap() {
        let tiles = registry(&[TileDef::floor(0.0, 0.0, 32.0, 32.0)]);
        assert!(!is_floor_adjacent(&body_at(32.0, 32.0), tiles.floors()));
        assert!(is_floor_adjacent(&body_at(31.0, 32.0), tiles.floors()));
    }

    #[test]
    fn resting_body_does_not_collide_with_its_floor() {
        let tiles = registry(&[TileDef::ledge(0.0, 0.0, 32.0, 32.0)]);
        let body = body_at(4.0, 32.0);
        assert!(!is_floor_colliding(&body, tiles.floors()));
        assert!(!is_wall_colliding(&body, tiles.walls(), Direction::Right));
    }

    #[test]
    fn wall_side_follows_tile_center() {
        let tiles = registry(&[TileDef::wall(40.0, 0.0, 32.0, 96.0)]);
        let hit = wall_collision(&body_at(20.0, 10.0), tiles.walls(), Direction::Left)
            .expect("overlapping wall");
        assert_eq!(hit.side, CollisionSide::Right);

        let tiles = registry(&[TileDef::wall(0.0, 0.0, 32.0, 96.0)]);
        let hit = wall_collision(&body_at(20.0, 10.0), tiles.walls(), Direction::Right)
            .expect("overlapping wall");
        assert_eq!(hit.side, CollisionSide::Left);
    }

    #[test]
    fn nearest_tile_breaks_ties_by_id() {
        let tiles = registry(&[
            TileDef::wall(20.0, 0.0, 32.0, 32.0),
            TileDef::wall(-20.0, 0.0, 32.0, 32.0),
        ]);
        let reference = Aabb::from_center(16.0, 16.0, 8.0, 8.0);
        let picked = nearest_tile(&reference, tiles.walls()).expect("two candidates");
        assert_eq!(picked.id, crate::tilemap::TileId(0));
    }

    #[test]
    fn landing_ignores_floors_entered_from_below() {
        let tiles = registry(&[TileDef::floor(0.0, 64.0, 32.0, 32.0)]);
        // Bottom was below the floor top before moving, so no landing.
        let body = body_at(4.0, 70.0);
        assert!(find_landing(&body, 60.0, tiles.floors()).is_none());
        // Coming down from above, crossing the top edge.
        let body = body_at(4.0, 92.0);
        let landing = find_landing(&body, 100.0, tiles.floors()).expect("landing");
        assert_eq!(landing.side, CollisionSide::Top);
    }

    #[test]
    fn landing_prefers_highest_floor() {
        let tiles = registry(&[
            TileDef::floor(0.0, 0.0, 32.0, 32.0),
            TileDef::floor(16.0, 8.0, 32.0, 32.0),
        ]);
        let body = body_at(10.0, 30.0);
        let landing = find_landing(&body, 50.0, tiles.floors()).expect("landing");
        assert!((landing.tile.aabb().max_y - 40.0).abs() < 0.01);
    }

    #[test]
    fn ledge_grab_uses_corner_facing_the_avatar() {
        let tiles = registry(&[TileDef::ledge(100.0, 200.0, 32.0, 32.0)]);
        let hand = Aabb::from_corner(93.0, 222.0, 14.0, 20.0);
        assert!(can_grab_a_ledge(&hand, tiles.ledges(), Direction::Right, 6.0));
        // Facing away, the far corner is out of reach.
        assert!(!can_grab_a_ledge(&hand, tiles.ledges(), Direction::Left, 6.0));
    }

    #[test]
    fn ledge_grab_tolerance_band() {
        let tiles = registry(&[TileDef::ledge(100.0, 200.0, 32.0, 32.0)]);
        let hand = Aabb::from_corner(80.0, 236.0, 14.0, 20.0);
        assert!(can_grab_a_ledge(&hand, tiles.ledges(), Direction::Right, 6.0));
        assert!(!can_grab_a_ledge(&hand, tiles.ledges(), Direction::Right, 2.0));
    }

    #[test]
    fn alignment_is_idempotent() {
        let tiles = registry(&[TileDef::ledge(100.0, 200.0, 32.0, 32.0)]);
        let tile = tiles.ledges().next().copied().expect("ledge");
        let body = Aabb::from_corner(20.0, 0.0, 24.0, 80.0);
        let hand = Aabb::from_corner(40.0, 70.0, 14.0, 20.0);

        let mut pos = Vec3::new(53.0, 151.5, 10.0);
        align_on_ledge(&mut pos, &body, &hand, &tile, Direction::Right);
        let first = pos;
        align_on_ledge(&mut pos, &body, &hand, &tile, Direction::Right);
        assert_eq!(first, pos);
        assert!((pos.x - 56.0).abs() < 0.01);
        assert!((pos.y - 142.0).abs() < 0.01);
        assert_eq!(pos.z, 10.0);

        let mut pos = Vec3::new(3.0, 250.0, 10.0);
        align_on_top(&mut pos, &body, &tile);
        let first = pos;
        align_on_top(&mut pos, &body, &tile);
        assert_eq!(first, pos);
        assert!((pos.y - 232.0).abs() < 0.01);
        assert!((pos.x - 3.0).abs() < 0.01);
    }

    #[test]
    fn align_against_preserves_other_axis() {
        let tiles = registry(&[TileDef::wall(100.0, 0.0, 32.0, 96.0)]);
        let tile = *tiles.walls().next().expect("wall");
        let body = Aabb::from_corner(20.0, 0.0, 24.0, 80.0);
        let mut pos = Vec3::new(60.0, 17.0, 10.0);
        align_against(
            &mut pos,
            &body,
            &Collision {
                tile,
                side: CollisionSide::Right,
            },
        );
        assert!((pos.x - 56.0).abs() < 0.01);
        assert!((pos.y - 17.0).abs() < 0.01);
    }

    #[test]
    fn align_on_last_wall_without_contact_is_an_error() {
        let body = Aabb::from_corner(20.0, 0.0, 24.0, 80.0);
        let mut pos = Vec3::new(1.0, 2.0, 10.0);
        let err = align_on_last_wall(&mut pos, &body, None).unwrap_err();
        assert_eq!(
            err,
            AvatarError::NoSuchContact {
                contact: ContactKind::Wall
            }
        );
        assert_eq!(pos, Vec3::new(1.0, 2.0, 10.0));
    }
}
