//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::sprites::SpriteSet;
use crate::game::RoundRegistry;
use crate::matchmaking::LobbyService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sprites: Arc<SpriteSet>,
    pub lobby: LobbyService,
    pub round_registry: Arc<RoundRegistry>,
}

impl AppState {
    /// Build the state and start the lobby task
    pub fn new(config: Config, sprites: SpriteSet) -> Self {
        let config = Arc::new(config);
        let sprites = Arc::new(sprites);

        let round_registry = Arc::new(RoundRegistry::new());

        // The lobby task runs until every handle is dropped
        let (lobby, _lobby_task) = LobbyService::spawn(
            config.rounds.clone(),
            Arc::clone(&round_registry),
            Arc::clone(&sprites),
        );

        Self {
            config,
            sprites,
            lobby,
            round_registry,
        }
    }
}
