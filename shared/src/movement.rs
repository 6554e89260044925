use crate::grid::{Room, Tile};
use serde::{Deserialize, Serialize};

/// A cell on the room grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        Self::new(self.row.saturating_add(dr), self.col.saturating_add(dc))
    }

    /// Adjacent means exactly one orthogonal step apart.
    pub fn is_adjacent_to(&self, other: &Position) -> bool {
        u64::from(self.row.abs_diff(other.row)) + u64::from(self.col.abs_diff(other.col)) == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Row and column offsets of a single step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    OutOfBounds,
    Unwalkable(Tile),
    InsideHouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Accepted(Position),
    Rejected(Rejection),
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Accepted(_))
    }
}

/// Checks a one-tile step from `from` against the room.
///
/// Rules apply in order: grid bounds, tile walkability, house footprints.
/// The first failing rule is reported.
pub fn validate_move(room: &Room, from: Position, direction: Direction) -> MoveOutcome {
    let target = from.step(direction);

    let tile = match room.tile(target) {
        Some(tile) => tile,
        None => return MoveOutcome::Rejected(Rejection::OutOfBounds),
    };

    if !tile.is_walkable() {
        return MoveOutcome::Rejected(Rejection::Unwalkable(tile));
    }

    if room.is_inside_house(target) {
        return MoveOutcome::Rejected(Rejection::InsideHouse);
    }

    MoveOutcome::Accepted(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_room() -> Room {
        Room::from_rows(&["WWWWW", "WGGGW", "WGHGW", "WGGGW", "WWWWW"]).unwrap()
    }

    #[test]
    fn test_step_and_adjacency() {
        let origin = Position::new(3, 3);
        assert_eq!(origin.step(Direction::Up), Position::new(2, 3));
        assert_eq!(origin.step(Direction::Down), Position::new(4, 3));
        assert_eq!(origin.step(Direction::Left), Position::new(3, 2));
        assert_eq!(origin.step(Direction::Right), Position::new(3, 4));

        for direction in Direction::ALL {
            assert!(origin.is_adjacent_to(&origin.step(direction)));
        }
        assert!(!origin.is_adjacent_to(&origin));
        assert!(!origin.is_adjacent_to(&Position::new(4, 4)));
        assert!(!origin.is_adjacent_to(&Position::new(3, 5)));
    }

    #[test]
    fn test_adjacency_at_extreme_coordinates() {
        let low = Position::new(i32::MIN, 0);
        let high = Position::new(i32::MAX, 0);

        assert!(!low.is_adjacent_to(&high));
        assert!(!high.is_adjacent_to(&low));
        assert!(!low.is_adjacent_to(&Position::new(1, 1)));
        assert!(low.is_adjacent_to(&Position::new(i32::MIN + 1, 0)));
        assert!(high.is_adjacent_to(&Position::new(i32::MAX, 1)));
        assert_eq!(high.step(Direction::Down), high);
    }

    #[test]
    fn test_open_field_accepts_every_direction() {
        let room = Room::from_rows(&["GGGGG", "GGGGG", "GGPGG", "GGGGG", "GGGGG"]).unwrap();
        let from = Position::new(2, 2);

        for direction in Direction::ALL {
            assert_eq!(
                validate_move(&room, from, direction),
                MoveOutcome::Accepted(from.step(direction))
            );
        }
    }

    #[test]
    fn test_bounds_checked_first() {
        let room = Room::from_rows(&["PG", "GG"]).unwrap();
        assert_eq!(
            validate_move(&room, Position::new(0, 0), Direction::Up),
            MoveOutcome::Rejected(Rejection::OutOfBounds)
        );
        assert_eq!(
            validate_move(&room, Position::new(0, 0), Direction::Left),
            MoveOutcome::Rejected(Rejection::OutOfBounds)
        );
        assert_eq!(
            validate_move(&room, Position::new(1, 1), Direction::Down),
            MoveOutcome::Rejected(Rejection::OutOfBounds)
        );
    }

    #[test]
    fn test_unwalkable_tiles_block() {
        let room = Room::from_rows(&["PTW", "GGG"]).unwrap();
        assert_eq!(
            validate_move(&room, Position::new(0, 0), Direction::Right),
            MoveOutcome::Rejected(Rejection::Unwalkable(Tile::Tree))
        );
        assert_eq!(
            validate_move(&room, Position::new(1, 2), Direction::Up),
            MoveOutcome::Rejected(Rejection::Unwalkable(Tile::Wall))
        );
    }

    #[test]
    fn test_house_blocks_walkable_tile() {
        let room = Room::from_rows(&[
            "GGGGGGG", "GHGGGGG", "GGGGGGG", "GGGGGGG", "GGGGGGG", "GGGGGGG", "PGGGGGG",
        ])
        .unwrap();

        // (2, 0) sits left of the footprint, (2, 1) is grass under the house.
        assert_eq!(
            validate_move(&room, Position::new(2, 0), Direction::Right),
            MoveOutcome::Rejected(Rejection::InsideHouse)
        );
        assert_eq!(
            validate_move(&room, Position::new(6, 3), Direction::Up),
            MoveOutcome::Rejected(Rejection::InsideHouse)
        );
        assert!(validate_move(&room, Position::new(6, 3), Direction::Right).is_accepted());
    }

    #[test]
    fn test_ring_room_walls_and_grass() {
        let room = ring_room();
        let spawn = room.spawn();

        assert_eq!(
            validate_move(&room, spawn, Direction::Up),
            MoveOutcome::Rejected(Rejection::Unwalkable(Tile::Wall))
        );
        assert_eq!(
            validate_move(&room, spawn, Direction::Left),
            MoveOutcome::Rejected(Rejection::Unwalkable(Tile::Wall))
        );
        assert_eq!(
            validate_move(&room, spawn, Direction::Right),
            MoveOutcome::Accepted(Position::new(1, 2))
        );
        assert_eq!(
            validate_move(&room, spawn, Direction::Down),
            MoveOutcome::Accepted(Position::new(2, 1))
        );
    }

    #[test]
    fn test_accepted_moves_always_land_on_open_cells() {
        let room = ring_room();

        for row in -1..=5 {
            for col in -1..=5 {
                let from = Position::new(row, col);
                for direction in Direction::ALL {
                    match validate_move(&room, from, direction) {
                        MoveOutcome::Accepted(to) => {
                            assert!(room.in_bounds(to));
                            assert!(room.tile(to).unwrap().is_walkable());
                            assert!(!room.is_inside_house(to));
                        }
                        MoveOutcome::Rejected(_) => assert!(!room.is_open(from.step(direction))),
                    }
                }
            }
        }
    }
}
