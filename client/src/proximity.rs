//! The single "who am I standing next to" slot.
//!
//! Adjacency is decided by the server; this only applies the events that
//! target the local player.

use shared::{Identity, ProximityAction};

/// What a proximity event did to the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProximityChange {
    Unchanged,
    Approached(String),
    Left(String),
}

#[derive(Debug, Default)]
pub struct ProximityDetector {
    adjacent: Option<String>,
}

impl ProximityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(
        &mut self,
        local: &Identity,
        username: &str,
        target: &str,
        action: ProximityAction,
    ) -> ProximityChange {
        if *local != *target {
            return ProximityChange::Unchanged;
        }

        match action {
            ProximityAction::Approach => {
                self.adjacent = Some(username.to_string());
                ProximityChange::Approached(username.to_string())
            }
            ProximityAction::Leave => {
                if self.adjacent.as_deref() == Some(username) {
                    self.adjacent = None;
                    ProximityChange::Left(username.to_string())
                } else {
                    ProximityChange::Unchanged
                }
            }
        }
    }

    pub fn adjacent(&self) -> Option<&str> {
        self.adjacent.as_deref()
    }

    /// Empties the slot, e.g. after the connection drops.
    pub fn clear(&mut self) -> Option<String> {
        self.adjacent.take()
    }
}
