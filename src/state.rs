// src/state.rs

use axum::extract::FromRef;

use crate::{config::Config, player::PlayerRegistry, store::Stores};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub config: Config,
    pub players: PlayerRegistry,
}

impl FromRef<AppState> for Stores {
    fn from_ref(state: &AppState) -> Self {
        state.stores.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for PlayerRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.players.clone()
    }
}
