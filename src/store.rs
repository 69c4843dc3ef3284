use crate::connection::Connection;
use crate::error::GameError;
use crate::sampler::Sampler;
use crate::session::{Seat, Session};
use crate::utils::new_token;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub player_token: String,
    pub opponent: String,
}

/// Every live game, keyed by session token.
///
/// Mutations go through `get_mut`, so the entry stays exclusively locked for
/// the whole read-modify-write. Nothing in here awaits while holding it.
pub struct SessionStore {
    games: DashMap<String, Session>,
    chart_count: usize,
    card_count: usize,
}

impl SessionStore {
    pub fn new(chart_count: usize, card_count: usize) -> Self {
        Self {
            games: DashMap::new(),
            chart_count,
            card_count,
        }
    }

    /// Opens a game for `player_name`. Returns `(session_token, player_token)`.
    pub fn create(&self, player_name: &str) -> Result<(String, String), GameError> {
        let session_token = new_token()?;
        let player_token = new_token()?;
        let session = Session::new(
            player_name.to_owned(),
            player_token.clone(),
            Sampler::for_deck(self.chart_count),
            Sampler::for_deck(self.card_count),
        );
        self.games.insert(session_token.clone(), session);
        info!(session = %session_token, "game created");
        Ok((session_token, player_token))
    }

    pub fn join(&self, session_token: &str, player_name: &str) -> Result<Joined, GameError> {
        if session_token.is_empty() {
            return Err(GameError::InvalidArgument("gameID".into()));
        }
        if player_name.is_empty() {
            return Err(GameError::InvalidArgument("name".into()));
        }
        let mut game = self.games.get_mut(session_token).ok_or(GameError::NotFound)?;
        if game.has_guest() {
            return Err(GameError::SessionFull);
        }
        let player_token = new_token()?;
        game.seat_guest(player_name.to_owned(), player_token.clone());
        info!(session = %session_token, "second player joined");
        Ok(Joined {
            player_token,
            opponent: game.player(Seat::First).name.clone(),
        })
    }

    pub fn submit(&self, session_token: &str, player_token: &str, card: u32) -> Result<(), GameError> {
        let mut game = self.games.get_mut(session_token).ok_or(GameError::NotFound)?;
        match game.submit(player_token, card) {
            Some(seat) => debug!(session = %session_token, ?seat, card, "card submitted"),
            None => debug!(session = %session_token, "submit from unknown player ignored"),
        }
        Ok(())
    }

    pub fn advance_round(&self, session_token: &str) -> Result<usize, GameError> {
        let mut game = self.games.get_mut(session_token).ok_or(GameError::NotFound)?;
        Ok(game.advance_round())
    }

    pub fn draw_card(&self, session_token: &str) -> Result<usize, GameError> {
        let mut game = self.games.get_mut(session_token).ok_or(GameError::NotFound)?;
        Ok(game.draw_card())
    }

    /// Binds a push channel to a seat. Unknown sessions or players are ignored.
    pub fn bind_connection(&self, session_token: &str, player_token: &str, conn: Arc<Connection>) {
        let id = conn.id();
        let Some(mut game) = self.games.get_mut(session_token) else {
            debug!(id, "join frame for unknown game");
            return;
        };
        match game.bind(player_token, conn) {
            Some(seat) => info!(id, session = %session_token, ?seat, "push channel bound"),
            None => debug!(id, session = %session_token, "join frame for unknown player"),
        }
    }

    /// Which seats currently have a push channel bound.
    pub fn bound_slots(&self, session_token: &str) -> Option<(bool, bool)> {
        self.games.get(session_token).map(|game| game.bound())
    }

    pub fn submitted(&self, session_token: &str) -> Option<(bool, bool)> {
        self.games.get(session_token).map(|game| game.submitted())
    }

    pub fn session_count(&self) -> usize {
        self.games.len()
    }
}
