//! Authoritative player positions and adjacency tracking.

use shared::{Position, ProximityAction, WireMessage};
use std::collections::{HashMap, HashSet};

type PairKey = (String, String);

fn pair_key(a: &str, b: &str) -> PairKey {
    if a < b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Last reported cell of every player plus the set of pairs currently
/// adjacent to each other.
#[derive(Debug, Default)]
pub struct World {
    positions: HashMap<String, Position>,
    adjacent_pairs: HashSet<PairKey>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new position and returns the proximity events it causes.
    ///
    /// Each pair that becomes adjacent yields two `approach` events, one
    /// targeting each side; each pair that stops being adjacent yields two
    /// `leave` events.
    pub fn update_position(&mut self, username: &str, pos: Position) -> Vec<WireMessage> {
        self.positions.insert(username.to_string(), pos);

        let mut others: Vec<(&String, &Position)> = self
            .positions
            .iter()
            .filter(|(name, _)| name.as_str() != username)
            .collect();
        others.sort_by(|a, b| a.0.cmp(b.0));

        let mut events = Vec::new();
        let mut entered = Vec::new();
        let mut left = Vec::new();

        for (other, other_pos) in others {
            let key = pair_key(username, other);
            let adjacent_now = pos.is_adjacent_to(other_pos);
            let adjacent_before = self.adjacent_pairs.contains(&key);

            if adjacent_now && !adjacent_before {
                entered.push(key);
                events.push(WireMessage::proximity(username, other, ProximityAction::Approach));
                events.push(WireMessage::proximity(other, username, ProximityAction::Approach));
            } else if !adjacent_now && adjacent_before {
                left.push(key);
                events.push(WireMessage::proximity(username, other, ProximityAction::Leave));
                events.push(WireMessage::proximity(other, username, ProximityAction::Leave));
            }
        }

        for key in entered {
            self.adjacent_pairs.insert(key);
        }
        for key in left {
            self.adjacent_pairs.remove(&key);
        }

        events
    }

    /// Forgets a player and returns `leave` events for everyone who was
    /// adjacent to them.
    pub fn remove_player(&mut self, username: &str) -> Vec<WireMessage> {
        self.positions.remove(username);

        let mut neighbours: Vec<String> = self
            .adjacent_pairs
            .iter()
            .filter_map(|(a, b)| {
                if a == username {
                    Some(b.clone())
                } else if b == username {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect();
        neighbours.sort();

        neighbours
            .into_iter()
            .map(|other| {
                self.adjacent_pairs.remove(&pair_key(username, &other));
                WireMessage::proximity(username, &other, ProximityAction::Leave)
            })
            .collect()
    }

    pub fn position_of(&self, username: &str) -> Option<Position> {
        self.positions.get(username).copied()
    }

    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        self.adjacent_pairs.contains(&pair_key(a, b))
    }

    pub fn player_count(&self) -> usize {
        self.positions.len()
    }
}
