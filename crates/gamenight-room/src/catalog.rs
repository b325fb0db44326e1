//! Game catalog: which game types the hub can create.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::{GameSession, RoomError};

/// Builds a fresh session for a new room.
pub type GameFactory = Arc<dyn Fn() -> Box<dyn GameSession> + Send + Sync>;

/// Registered game types, keyed by the name clients send in
/// `create-game`.
#[derive(Clone, Default)]
pub struct GameCatalog {
    factories: BTreeMap<String, GameFactory>,
}

impl GameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `game_type`, replacing any previous one.
    pub fn register<F>(&mut self, game_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn GameSession> + Send + Sync + 'static,
    {
        self.factories.insert(game_type.into(), Arc::new(factory));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, game_type: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn GameSession> + Send + Sync + 'static,
    {
        self.register(game_type, factory);
        self
    }

    /// A new session of the given type.
    ///
    /// # Errors
    /// [`RoomError::UnknownGameType`] if nothing is registered under it.
    pub fn create(&self, game_type: &str) -> Result<Box<dyn GameSession>, RoomError> {
        self.factories
            .get(game_type)
            .map(|factory| factory())
            .ok_or_else(|| RoomError::UnknownGameType(game_type.to_owned()))
    }

    pub fn contains(&self, game_type: &str) -> bool {
        self.factories.contains_key(game_type)
    }

    /// Registered game types, sorted.
    pub fn game_types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl fmt::Debug for GameCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.game_types()).finish()
    }
}
