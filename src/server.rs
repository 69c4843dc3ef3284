// src/server.rs

use crate::common::{BoxError, Config};
use crate::connection;
use crate::error::GameError;
use crate::hub::Hub;
use crate::store::SessionStore;
use crate::transport::split_websocket;
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection, ws::WebSocketUpgrade},
    response::Response,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Notify, task::JoinHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub hub: Hub,
    pub queue_capacity: usize,
}

#[derive(Deserialize)]
struct NewGameParams {
    name: Option<String>,
}

#[derive(Serialize)]
struct NewGameReply {
    #[serde(rename = "gameID")]
    session_token: String,
    #[serde(rename = "userID")]
    player_token: String,
}

#[derive(Deserialize)]
struct JoinParams {
    name: Option<String>,
    #[serde(rename = "gameID")]
    session_token: Option<String>,
}

#[derive(Serialize)]
struct JoinReply {
    #[serde(rename = "userID")]
    player_token: String,
    opponent: String,
}

#[derive(Deserialize)]
struct SubmitParams {
    #[serde(rename = "gameID")]
    session_token: Option<String>,
    #[serde(rename = "userID")]
    player_token: Option<String>,
    card: Option<u32>,
}

#[derive(Deserialize)]
struct GameParams {
    #[serde(rename = "gameID")]
    session_token: Option<String>,
}

#[derive(Deserialize)]
struct CardParams {
    #[serde(alias = "gameID")]
    id: Option<String>,
}

#[derive(Serialize)]
struct ValueReply {
    id: usize,
}

fn required(value: Option<String>, field: &'static str) -> Result<String, GameError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GameError::InvalidArgument(field.into()))
}

/// POST /newgame?name=
async fn new_game(
    State(state): State<AppState>,
    query: Result<Query<NewGameParams>, QueryRejection>,
) -> Result<Json<NewGameReply>, GameError> {
    let Query(params) = query?;
    let name = params.name.unwrap_or_default();
    let (session_token, player_token) = state.store.create(&name)?;
    Ok(Json(NewGameReply {
        session_token,
        player_token,
    }))
}

/// POST /joingame?name=&gameID=
async fn join_game(
    State(state): State<AppState>,
    query: Result<Query<JoinParams>, QueryRejection>,
) -> Result<Json<JoinReply>, GameError> {
    let Query(params) = query?;
    let name = required(params.name, "name")?;
    let session_token = required(params.session_token, "gameID")?;
    let joined = state.store.join(&session_token, &name)?;
    Ok(Json(JoinReply {
        player_token: joined.player_token,
        opponent: joined.opponent,
    }))
}

/// POST /submitcard?gameID=&userID=&card=
async fn submit_card(
    State(state): State<AppState>,
    query: Result<Query<SubmitParams>, QueryRejection>,
) -> Result<Json<serde_json::Value>, GameError> {
    let Query(params) = query?;
    let session_token = required(params.session_token, "gameID")?;
    let player_token = required(params.player_token, "userID")?;
    let card = params
        .card
        .ok_or_else(|| GameError::InvalidArgument("card".into()))?;
    state.store.submit(&session_token, &player_token, card)?;
    Ok(Json(serde_json::json!({})))
}

/// GET /chart?gameID=
async fn chart(
    State(state): State<AppState>,
    query: Result<Query<GameParams>, QueryRejection>,
) -> Result<Json<ValueReply>, GameError> {
    let Query(params) = query?;
    let session_token = required(params.session_token, "gameID")?;
    let id = state.store.advance_round(&session_token)?;
    Ok(Json(ValueReply { id }))
}

/// GET /card?id=
async fn card(
    State(state): State<AppState>,
    query: Result<Query<CardParams>, QueryRejection>,
) -> Result<Json<ValueReply>, GameError> {
    let Query(params) = query?;
    let session_token = required(params.id, "id")?;
    let id = state.store.draw_card(&session_token)?;
    Ok(Json(ValueReply { id }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "connections": state.hub.connection_count().await,
        "sessions": state.store.session_count(),
    }))
}

/// GET /ws: upgrades to a push channel.
async fn push_channel(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        let (reader, writer) = split_websocket(socket);
        connection::serve(reader, writer, state.hub, state.store, state.queue_capacity).await;
    })
}

pub struct Server {
    cfg: Config,
    state: AppState,
    hub_loop: JoinHandle<()>,
    stop_accept_sig: Arc<Notify>,
}

impl Server {
    /// Must be called from within a tokio runtime; starts the hub loop.
    pub fn new(cfg: Config) -> Self {
        let (hub, hub_loop) = Hub::spawn();
        let state = AppState {
            store: Arc::new(SessionStore::new(cfg.chart_count, cfg.card_count)),
            hub,
            queue_capacity: cfg.queue_capacity,
        };
        Self {
            cfg,
            state,
            hub_loop,
            stop_accept_sig: Arc::new(Notify::new()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/newgame", post(new_game))
            .route("/joingame", post(join_game))
            .route("/submitcard", post(submit_card))
            .route("/chart", get(chart))
            .route("/card", get(card))
            .route("/health", get(health))
            .route("/ws", get(push_channel));
        if let Some(dir) = &self.cfg.static_dir {
            router = router
                .nest_service("/charts", ServeDir::new(dir.join("charts")))
                .nest_service("/cards", ServeDir::new(dir.join("cards")));
        }
        router
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub fn stop_accept(&self) {
        self.stop_accept_sig.notify_one();
    }

    /// Serves until `stop_accept` or Ctrl-C, then closes every push channel.
    pub async fn run(self) -> Result<(), BoxError> {
        let listener = TcpListener::bind(&self.cfg.addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        let stop = self.stop_accept_sig.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = stop.notified() => {},
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            tracing::error!("ctrl-c listener failed: {}", e);
                        }
                    },
                }
            })
            .await?;
        info!("shutting down");
        self.state.hub.shutdown();
        self.hub_loop.await?;
        Ok(())
    }
}
