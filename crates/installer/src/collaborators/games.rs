//! Game session information

use std::collections::HashMap;

/// What the application knows about games
pub trait GameCatalog: Send + Sync {
    /// The game currently being managed, if any
    fn active_game(&self) -> Option<String>;

    /// Whether the game was found installed on this system
    fn is_discovered(&self, game_id: &str) -> bool;

    /// Display name, falling back to the id
    fn game_name(&self, game_id: &str) -> String;
}

/// Fixed catalog, configured up front
#[derive(Debug, Clone, Default)]
pub struct StaticGameCatalog {
    active: Option<String>,
    games: HashMap<String, String>,
}

impl StaticGameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a discovered game with its display name
    pub fn with_game<I: Into<String>, N: Into<String>>(mut self, game_id: I, name: N) -> Self {
        self.games.insert(game_id.into(), name.into());
        self
    }

    pub fn with_active<I: Into<String>>(mut self, game_id: I) -> Self {
        self.active = Some(game_id.into());
        self
    }
}

impl GameCatalog for StaticGameCatalog {
    fn active_game(&self) -> Option<String> {
        self.active.clone()
    }

    fn is_discovered(&self, game_id: &str) -> bool {
        self.games.contains_key(game_id)
    }

    fn game_name(&self, game_id: &str) -> String {
        self.games
            .get(game_id)
            .cloned()
            .unwrap_or_else(|| game_id.to_string())
    }
}
