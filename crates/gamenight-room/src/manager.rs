//! Room directory: hands out room codes and finds rooms by code.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::time::Duration;

use gamenight_protocol::{RoomCode, RoomId};
use rand::Rng;
use tokio::time::Instant;

use crate::room::next_room_id;
use crate::{GameSession, Room, RoomError, RoomInfo};

/// Lowest room code.
pub const MIN_CODE: u16 = 1000;
/// Highest room code.
pub const MAX_CODE: u16 = 9999;
/// How many distinct codes exist.
pub const CODE_SPACE: usize = (MAX_CODE - MIN_CODE + 1) as usize;

/// All live rooms, keyed by their 4-digit code.
///
/// A code names at most one room at a time. Once a room is swept its code
/// may be handed out again, so code lookups on behalf of a player are
/// always paired with the [`RoomId`] the player remembers (see
/// [`resolve`](Self::resolve)).
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomCode, Room>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a room under a fresh random code.
    ///
    /// # Errors
    /// [`RoomError::DirectoryFull`] if every code is taken.
    pub fn create_room(
        &mut self,
        game_type: &str,
        game: Box<dyn GameSession>,
    ) -> Result<&mut Room, RoomError> {
        if self.rooms.len() >= CODE_SPACE {
            return Err(RoomError::DirectoryFull);
        }

        let mut rng = rand::rng();
        let code = loop {
            let candidate = RoomCode::new(rng.random_range(MIN_CODE..=MAX_CODE).to_string());
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let id = next_room_id();
        tracing::info!(room_code = %code, room_id = %id, game_type, "room created");
        let info = RoomInfo::new(id, code.clone(), game_type);
        match self.rooms.entry(code) {
            Entry::Vacant(slot) => Ok(slot.insert(Room::new(info, game))),
            // The loop above only breaks on a free code.
            Entry::Occupied(_) => Err(RoomError::DirectoryFull),
        }
    }

    pub fn get(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &RoomCode) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Looks up a room by code for a player who remembers joining room `id`.
    ///
    /// # Errors
    /// [`RoomError::Expired`] if the code is free or now names a different
    /// room.
    pub fn resolve(&mut self, id: RoomId, code: &RoomCode) -> Result<&mut Room, RoomError> {
        match self.rooms.get_mut(code) {
            Some(room) if room.id() == id => Ok(room),
            _ => Err(RoomError::Expired),
        }
    }

    /// Finds a room by id alone.
    pub fn find_by_id(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.values_mut().find(|room| room.id() == id)
    }

    /// Removes every room idle for longer than `threshold` as of `now`.
    ///
    /// The removed rooms are returned so the caller can clean up their
    /// players. Dropping a room aborts its pending turn timer.
    pub fn sweep_idle(&mut self, now: Instant, threshold: Duration) -> Vec<Room> {
        let expired: Vec<RoomCode> = self
            .rooms
            .iter()
            .filter(|(_, room)| {
                now.saturating_duration_since(room.info().last_interaction()) > threshold
            })
            .map(|(code, _)| code.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|code| {
                let room = self.rooms.remove(&code)?;
                tracing::info!(room_code = %code, room_id = %room.id(), "idle room swept");
                Some(room)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &RoomCode> {
        self.rooms.keys()
    }
}
