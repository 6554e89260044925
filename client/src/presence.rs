//! Known peers and the cell each of them last reported.

use shared::{Identity, Position};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What happens to peers that stop sending positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeerExpiry {
    /// Silent peers stay frozen on their last cell.
    #[default]
    Never,
    /// Peers not heard from for this long are dropped on the next sweep.
    After(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub position: Position,
    pub last_seen: Instant,
}

#[derive(Debug, Default)]
pub struct PeerMap {
    peers: HashMap<String, Peer>,
    expiry: PeerExpiry,
}

impl PeerMap {
    pub fn new(expiry: PeerExpiry) -> Self {
        Self {
            peers: HashMap::new(),
            expiry,
        }
    }

    /// Snaps `username` to `position`.
    ///
    /// Returns false, and records nothing, when the report is our own echo.
    pub fn apply(
        &mut self,
        local: &Identity,
        username: &str,
        position: Position,
        now: Instant,
    ) -> bool {
        if *local == *username {
            return false;
        }

        self.peers.insert(
            username.to_string(),
            Peer {
                position,
                last_seen: now,
            },
        );
        true
    }

    /// Drops peers silent for longer than the expiry policy allows and
    /// returns their names.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let PeerExpiry::After(timeout) = self.expiry else {
            return Vec::new();
        };

        let mut expired: Vec<String> = self
            .peers
            .iter()
            .filter(|(_, peer)| now.saturating_duration_since(peer.last_seen) > timeout)
            .map(|(name, _)| name.clone())
            .collect();
        expired.sort();

        for name in &expired {
            self.peers.remove(name);
        }
        expired
    }

    pub fn get(&self, username: &str) -> Option<&Peer> {
        self.peers.get(username)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Peer)> {
        self.peers.iter().map(|(name, peer)| (name.as_str(), peer))
    }

    pub fn expiry(&self) -> PeerExpiry {
        self.expiry
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
