//! HTTP Game Server
//!
//! axum router over a [`GameService`]. Every endpoint answers `200 OK` with
//! a JSON [`ResponseEnvelope`]; failures are reported inside the envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, JsonRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::core::ids::{GameId, PlayerToken};
use crate::game::map::HalfMap;
use crate::game::player::PlayerRegistration;
use crate::game::state::GameState;
use crate::network::env_var;
use crate::network::protocol::{GameIdView, PlayerIdView, ResponseEnvelope};
use crate::network::registry::{GameRegistry, RegistryConfig};
use crate::network::service::{GameService, ServiceConfig, ServiceError};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Registry limits and seed.
    pub registry: RegistryConfig,
    /// Request handling.
    pub service: ServiceConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            registry: RegistryConfig::default(),
            service: ServiceConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_var("TREASURE_BIND_ADDR").unwrap_or(defaults.bind_addr),
            registry: RegistryConfig::from_env(),
            service: ServiceConfig::from_env(),
            version: defaults.version,
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[source] std::io::Error),

    /// The server stopped with an I/O error.
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// The game server.
pub struct GameServer {
    config: ServerConfig,
    service: GameService,
}

impl GameServer {
    /// Create a server with a fresh registry.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(GameRegistry::new(config.registry.clone()));
        let service = GameService::new(registry, config.service.clone());
        Self { config, service }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The service behind the routes.
    pub fn service(&self) -> &GameService {
        &self.service
    }

    /// Run the server until it fails.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(GameServerError::BindFailed)?;
        info!(
            version = %self.config.version,
            "Game server listening on {}",
            self.config.bind_addr
        );

        axum::serve(listener, router(self.service.clone()))
            .await
            .map_err(GameServerError::Serve)
    }
}

/// Build the HTTP routes.
pub fn router(service: GameService) -> Router {
    Router::new()
        .route("/games", get(new_game))
        .route("/games/{game_id}/players", post(register_player))
        .route("/games/{game_id}/halfmaps", post(submit_half_map))
        .route("/games/{game_id}/states/{player_id}", get(game_state))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn rejected<T>(rejection: JsonRejection) -> Json<ResponseEnvelope<T>> {
    Json(ServiceError::InvalidRequest(rejection.body_text()).into_envelope())
}

async fn new_game(State(service): State<GameService>) -> Json<ResponseEnvelope<GameIdView>> {
    Json(service.new_game().await)
}

async fn register_player(
    State(service): State<GameService>,
    Path(game_id): Path<String>,
    body: Result<Json<PlayerRegistration>, JsonRejection>,
) -> Json<ResponseEnvelope<PlayerIdView>> {
    match body {
        Ok(Json(registration)) => Json(
            service
                .register_player(&GameId::new(game_id), registration)
                .await,
        ),
        Err(rejection) => rejected(rejection),
    }
}

// Parsed by hand so that a body naming its sender still disqualifies that
// sender when the tiles do not parse.
async fn submit_half_map(
    State(service): State<GameService>,
    Path(game_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ResponseEnvelope<GameState>> {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            return Json(ServiceError::InvalidRequest(rejection.body_text()).into_envelope());
        }
    };
    let game_id = GameId::new(game_id);

    match serde_json::from_slice::<HalfMap>(&body) {
        Ok(half_map) => Json(service.submit_half_map(&game_id, half_map).await),
        Err(err) => Json(
            service
                .reject_half_map(&game_id, claimed_sender(&body), err.to_string())
                .await,
        ),
    }
}

/// The `player_id` of a half-map body that does not parse as a whole.
fn claimed_sender(body: &[u8]) -> Option<PlayerToken> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("player_id")?.as_str().map(PlayerToken::from)
}

async fn game_state(
    State(service): State<GameService>,
    Path((game_id, player_id)): Path<(String, String)>,
) -> Json<ResponseEnvelope<GameState>> {
    Json(
        service
            .game_state(&GameId::new(game_id), &PlayerToken::new(player_id))
            .await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::game::fixtures::{self, MAP_A, MAP_B};

    fn app(seed: u64) -> Router {
        let config = ServerConfig {
            registry: RegistryConfig {
                seed: Some(seed),
                ..Default::default()
            },
            ..Default::default()
        };
        router(GameServer::new(config).service().clone())
    }

    async fn send(app: &Router, request: Request<Body>) -> Value {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn create_game(app: &Router) -> String {
        let value = send(app, get_request("/games")).await;
        assert_eq!(value["state"], "okay");
        value["data"]["game_id"].as_str().unwrap().to_string()
    }

    async fn register(app: &Router, game_id: &str, name: &str) -> String {
        let body = serde_json::json!({
            "first_name": name,
            "last_name": "Student",
            "student_id": format!("{}-1", name),
        });
        let value = send(
            app,
            post_json(&format!("/games/{}/players", game_id), body.to_string()),
        )
        .await;
        assert_eq!(value["state"], "okay", "{}", value);
        value["data"]["player_id"].as_str().unwrap().to_string()
    }

    async fn state(app: &Router, game_id: &str, player_id: &str) -> Value {
        send(
            app,
            get_request(&format!("/games/{}/states/{}", game_id, player_id)),
        )
        .await
    }

    #[tokio::test]
    async fn test_create_game() {
        let app = app(1);
        let game_id = create_game(&app).await;
        assert_eq!(game_id.len(), 5);
    }

    #[tokio::test]
    async fn test_register_and_query() {
        let app = app(2);
        let game_id = create_game(&app).await;
        let player = register(&app, &game_id, "ada").await;

        let value = state(&app, &game_id, &player).await;
        assert_eq!(value["state"], "okay");
        assert_eq!(value["data"]["players"][0]["player_id"], player.as_str());
        assert_eq!(value["data"]["players"][0]["state"], "ShouldWait");
    }

    #[tokio::test]
    async fn test_unknown_game_is_enveloped() {
        let app = app(3);
        let value = state(&app, "zzzzz", "nobody").await;

        assert_eq!(value["state"], "error");
        assert_eq!(value["error_name"], "not_found");
        assert!(value["error_message"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_body_is_enveloped() {
        let app = app(4);
        let game_id = create_game(&app).await;

        let value = send(
            &app,
            post_json(&format!("/games/{}/players", game_id), "{not json".to_string()),
        )
        .await;
        assert_eq!(value["error_name"], "invalid_request");

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/games/{}/halfmaps", game_id))
            .body(Body::from("{}"))
            .unwrap();
        let value = send(&app, request).await;
        assert_eq!(value["error_name"], "invalid_request");
    }

    #[tokio::test]
    async fn test_full_game_over_http() {
        let app = app(5);
        let game_id = create_game(&app).await;
        let first = register(&app, &game_id, "first").await;
        let second = register(&app, &game_id, "second").await;

        let first_state = state(&app, &game_id, &first).await;
        let (active, waiting) = if first_state["data"]["players"][0]["state"] == "ShouldActNext" {
            (first, second)
        } else {
            (second, first)
        };

        let uri = format!("/games/{}/halfmaps", game_id);
        let map = fixtures::half_map(PlayerToken::new(active.clone()), MAP_A);
        let value = send(&app, post_json(&uri, serde_json::to_string(&map).unwrap())).await;
        assert_eq!(value["state"], "okay", "{}", value);

        let map = fixtures::half_map(PlayerToken::new(waiting.clone()), MAP_B);
        let value = send(&app, post_json(&uri, serde_json::to_string(&map).unwrap())).await;
        assert_eq!(value["state"], "okay", "{}", value);

        let value = state(&app, &game_id, &active).await;
        let tiles = value["data"]["full_map"]["tiles"].as_array().unwrap();
        assert_eq!(tiles.len(), 64);

        // The opponent's real token never leaves the server
        assert!(!value.to_string().contains(&waiting));
    }

    #[tokio::test]
    async fn test_out_of_turn_over_http() {
        let app = app(6);
        let game_id = create_game(&app).await;
        let first = register(&app, &game_id, "first").await;
        let second = register(&app, &game_id, "second").await;

        let first_state = state(&app, &game_id, &first).await;
        let waiting = if first_state["data"]["players"][0]["state"] == "ShouldWait" {
            first
        } else {
            second
        };

        let map = fixtures::half_map(PlayerToken::new(waiting.clone()), MAP_A);
        let value = send(
            &app,
            post_json(
                &format!("/games/{}/halfmaps", game_id),
                serde_json::to_string(&map).unwrap(),
            ),
        )
        .await;
        assert_eq!(value["error_name"], "turn_order_violation");

        let value = state(&app, &game_id, &waiting).await;
        let me = value["data"]["players"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["player_id"] == waiting.as_str())
            .cloned()
            .unwrap();
        assert_eq!(me["state"], "Lost");
    }

    #[tokio::test]
    async fn test_unparsable_tiles_disqualify_sender() {
        let app = app(7);
        let game_id = create_game(&app).await;
        let first = register(&app, &game_id, "first").await;
        let second = register(&app, &game_id, "second").await;

        let body = serde_json::json!({
            "player_id": first,
            "tiles": [{ "x": -1, "y": 0, "terrain": "Lava", "fortress": false }],
        });
        let value = send(
            &app,
            post_json(&format!("/games/{}/halfmaps", game_id), body.to_string()),
        )
        .await;
        assert_eq!(value["error_name"], "half_map_rejected", "{}", value);

        let value = state(&app, &game_id, &second).await;
        let players = value["data"]["players"].as_array().unwrap();
        let me = players.iter().find(|p| p["player_id"] == second.as_str()).unwrap();
        assert_eq!(me["state"], "Won");
    }

    #[test]
    fn test_claimed_sender() {
        assert_eq!(
            claimed_sender(br#"{"player_id":"tok","tiles":7}"#),
            Some(PlayerToken::new("tok"))
        );
        assert_eq!(claimed_sender(b"{}"), None);
        assert_eq!(claimed_sender(b"{not json"), None);
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.registry.capacity, 999);
        assert_eq!(config.service.freshness_window.as_secs(), 5);
    }
}
