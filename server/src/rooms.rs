//! Room grids served by `GET /api/room/{room_id}`.

use log::info;
use shared::{GridError, Room, DEFAULT_ROOM_ID};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The map every server starts with.
pub const DEFAULT_ROOM: [&str; 16] = [
    "WWWWWWWWWWWWWWWWWWWWWWWW",
    "WGGGGGGGGGGRGGGGGGGGGGGW",
    "WGHGGGGGGGGRGGGGGGHGGGGW",
    "WGGGGGGGTGGRGGTGGGGGGGGW",
    "WGGGGGGGGGGRGGGGGGGGGGGW",
    "WGGGGGGGGGGRGGGGGGGGGGGW",
    "WGGGGGGGGGGRGGGGGGGGGGGW",
    "WRRRRRRRRRRRRRRRRRRRRRRW",
    "WGGGGGGGGGGRGGGGGGGGGGGW",
    "WGGTGGGGGGGRGGGGGGGTGGGW",
    "WGGGGGGGGGGPGGGGGGGGGGGW",
    "WGGGGHGGGGGRGGGGGGGGGGGW",
    "WGGGGGGGGGGRGGGGTGGGGGGW",
    "WGGGGGGGGGGRGGGGGGGGGGGW",
    "WGGTGGGGGGGRGGGGGGGGTGGW",
    "WWWWWWWWWWWWWWWWWWWWWWWW",
];

#[derive(Debug)]
pub enum RoomStoreError {
    Io(std::io::Error),
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Grid {
        room_id: String,
        source: GridError,
    },
}

impl fmt::Display for RoomStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomStoreError::Io(err) => write!(f, "room io error: {}", err),
            RoomStoreError::Json { path, source } => {
                write!(f, "{} is not a list of rows: {}", path.display(), source)
            }
            RoomStoreError::Grid { room_id, source } => {
                write!(f, "room {} is invalid: {}", room_id, source)
            }
        }
    }
}

impl std::error::Error for RoomStoreError {}

impl From<std::io::Error> for RoomStoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Validated room grids indexed by room id.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, Vec<String>>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_room() -> Self {
        let mut store = Self::new();
        store.rooms.insert(
            DEFAULT_ROOM_ID.to_string(),
            DEFAULT_ROOM.iter().map(|row| row.to_string()).collect(),
        );
        store
    }

    /// Adds or replaces a room after checking it loads.
    pub fn insert(&mut self, room_id: &str, rows: Vec<String>) -> Result<(), RoomStoreError> {
        Room::from_rows(&rows).map_err(|source| RoomStoreError::Grid {
            room_id: room_id.to_string(),
            source,
        })?;
        self.rooms.insert(room_id.to_string(), rows);
        Ok(())
    }

    /// Loads every `<room_id>.json` file in `dir`. Returns how many were added.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, RoomStoreError> {
        let mut loaded = 0;

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(room_id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let text = std::fs::read_to_string(&path)?;
            let rows: Vec<String> =
                serde_json::from_str(&text).map_err(|source| RoomStoreError::Json {
                    path: path.clone(),
                    source,
                })?;

            self.insert(room_id, rows)?;
            info!("Loaded room {} from {}", room_id, path.display());
            loaded += 1;
        }

        Ok(loaded)
    }

    pub fn get(&self, room_id: &str) -> Option<&[String]> {
        self.rooms.get(room_id).map(Vec::as_slice)
    }

    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.keys().cloned().collect();
        ids.sort();
        ids
    }
}
