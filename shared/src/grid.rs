//! Room grids: tile codes, house footprints and the loader that turns the
//! fetched rows into a working grid.

use crate::movement::Position;
use std::fmt;

/// Side length of every house footprint, in tiles.
pub const HOUSE_SIZE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Grass,
    Tree,
    Wall,
    Path,
    HouseAnchor,
    PlayerSpawn,
}

impl Tile {
    pub fn from_code(code: char) -> Option<Tile> {
        match code {
            'G' => Some(Tile::Grass),
            'T' => Some(Tile::Tree),
            'W' => Some(Tile::Wall),
            'R' => Some(Tile::Path),
            'H' => Some(Tile::HouseAnchor),
            'P' => Some(Tile::PlayerSpawn),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Tile::Grass => 'G',
            Tile::Tree => 'T',
            Tile::Wall => 'W',
            Tile::Path => 'R',
            Tile::HouseAnchor => 'H',
            Tile::PlayerSpawn => 'P',
        }
    }

    /// Whether a player may stand on this tile, ignoring houses.
    pub fn is_walkable(self) -> bool {
        matches!(self, Tile::Grass | Tile::Path)
    }
}

/// A square footprint of `HOUSE_SIZE` tiles anchored at its top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct House {
    pub anchor: Position,
}

impl House {
    pub fn new(anchor: Position) -> Self {
        Self { anchor }
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row >= self.anchor.row
            && pos.row < self.anchor.row + HOUSE_SIZE
            && pos.col >= self.anchor.col
            && pos.col < self.anchor.col + HOUSE_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    Empty,
    EmptyRow,
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    UnknownTile {
        row: usize,
        col: usize,
        code: char,
    },
    SpawnBlocked(Position),
    NoSpawn,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Empty => write!(f, "room grid has no rows"),
            GridError::EmptyRow => write!(f, "room grid rows are empty"),
            GridError::RaggedRow {
                row,
                expected,
                found,
            } => write!(
                f,
                "row {} has {} tiles, expected {}",
                row, found, expected
            ),
            GridError::UnknownTile { row, col, code } => {
                write!(f, "unknown tile code {:?} at ({}, {})", code, row, col)
            }
            GridError::SpawnBlocked(pos) => {
                write!(f, "spawn at ({}, {}) lies inside a house", pos.row, pos.col)
            }
            GridError::NoSpawn => write!(f, "room has no free cell to spawn on"),
        }
    }
}

impl std::error::Error for GridError {}

/// A loaded room: the working grid with anchors and spawn extracted.
///
/// House anchors and the spawn marker are normalised to grass, so
/// [`Room::tile`] only ever reports grass, tree, wall or path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    tiles: Vec<Vec<Tile>>,
    houses: Vec<House>,
    spawn: Position,
}

impl Room {
    /// Builds a room from the rows served by the room endpoint.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, GridError> {
        if rows.is_empty() {
            return Err(GridError::Empty);
        }

        let width = rows[0].as_ref().chars().count();
        if width == 0 {
            return Err(GridError::EmptyRow);
        }

        let mut tiles = Vec::with_capacity(rows.len());
        let mut houses = Vec::new();
        let mut marked_spawn = None;

        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != width {
                return Err(GridError::RaggedRow {
                    row: r,
                    expected: width,
                    found,
                });
            }

            let mut line = Vec::with_capacity(width);
            for (c, code) in row.chars().enumerate() {
                let tile = Tile::from_code(code).ok_or(GridError::UnknownTile {
                    row: r,
                    col: c,
                    code,
                })?;
                let pos = Position::new(r as i32, c as i32);
                match tile {
                    Tile::HouseAnchor => {
                        houses.push(House::new(pos));
                        line.push(Tile::Grass);
                    }
                    Tile::PlayerSpawn => {
                        marked_spawn = Some(pos);
                        line.push(Tile::Grass);
                    }
                    other => line.push(other),
                }
            }
            tiles.push(line);
        }

        let mut room = Room {
            tiles,
            houses,
            spawn: Position::new(0, 0),
        };

        room.spawn = match marked_spawn {
            Some(pos) if room.is_inside_house(pos) => return Err(GridError::SpawnBlocked(pos)),
            Some(pos) => pos,
            None => room.first_free_cell().ok_or(GridError::NoSpawn)?,
        };

        Ok(room)
    }

    pub fn rows(&self) -> usize {
        self.tiles.len()
    }

    pub fn cols(&self) -> usize {
        self.tiles[0].len()
    }

    pub fn houses(&self) -> &[House] {
        &self.houses
    }

    pub fn spawn(&self) -> Position {
        self.spawn
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as usize) < self.rows()
            && (pos.col as usize) < self.cols()
    }

    pub fn tile(&self, pos: Position) -> Option<Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.tiles[pos.row as usize][pos.col as usize])
    }

    pub fn is_inside_house(&self, pos: Position) -> bool {
        self.houses.iter().any(|house| house.contains(pos))
    }

    /// True when a player may occupy `pos`.
    pub fn is_open(&self, pos: Position) -> bool {
        self.tile(pos).is_some_and(Tile::is_walkable) && !self.is_inside_house(pos)
    }

    /// Iterates the working grid row by row.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.iter().map(Vec::as_slice)
    }

    fn first_free_cell(&self) -> Option<Position> {
        (0..self.rows())
            .flat_map(|r| (0..self.cols()).map(move |c| Position::new(r as i32, c as i32)))
            .find(|pos| self.is_open(*pos))
    }
}
