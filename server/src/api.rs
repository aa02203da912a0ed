use crate::board::{Board, BoardError};
use crate::store::MemoryStore;
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State as AxumState,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use flipboard_types::{
    api::{CreateBet, ErrorBody, UpdateBet},
    Bet, BetId, BetStatus,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};

/// HTTP and WebSocket surface of the board.
pub struct Api {
    board: Arc<Board<MemoryStore>>,
}

impl Api {
    pub fn new(board: Arc<Board<MemoryStore>>) -> Self {
        Self { board }
    }

    pub fn router(&self) -> Router {
        // Configure CORS
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE]);

        // Configure rate limiting, keyed by peer IP
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(50)
                .burst_size(200)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .unwrap(),
        );

        Router::new()
            .route("/bets", get(list_bets).post(create_bet))
            .route(
                "/bets/:id",
                get(get_bet).put(update_bet).delete(delete_bet),
            )
            .route("/updates", get(updates_ws))
            .layer(cors)
            .layer(GovernorLayer {
                config: governor_conf,
            })
            .with_state(self.board.clone())
    }
}

struct ApiError(BoardError);

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            BoardError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            BoardError::NotFound(id) => {
                (StatusCode::NOT_FOUND, format!("bet {id} not found"))
            }
            BoardError::InvalidTransition(message) => (StatusCode::CONFLICT, message),
            BoardError::Store(err) => {
                error!("store failure: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

fn validation(message: &str) -> ApiError {
    ApiError(BoardError::Validation(message.to_string()))
}

fn parse_id(raw: &str) -> Result<BetId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError(BoardError::Validation(format!("invalid bet id: {raw}"))))
}

// Bodies are decoded by hand so a malformed payload is a plain 400 with a
// message, not a framework rejection.
fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError(BoardError::Validation(format!("invalid request body: {err}"))))
}

async fn list_bets(
    AxumState(board): AxumState<Arc<Board<MemoryStore>>>,
) -> Result<Json<Vec<Bet>>, ApiError> {
    Ok(Json(board.list()?))
}

async fn create_bet(
    AxumState(board): AxumState<Arc<Board<MemoryStore>>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: CreateBet = parse_body(&body)?;
    let bet = board.create(request)?;
    Ok((StatusCode::CREATED, Json(bet)))
}

async fn get_bet(
    AxumState(board): AxumState<Arc<Board<MemoryStore>>>,
    Path(raw): Path<String>,
) -> Result<Json<Bet>, ApiError> {
    let id = parse_id(&raw)?;
    Ok(Json(board.get(&id)?))
}

async fn update_bet(
    AxumState(board): AxumState<Arc<Board<MemoryStore>>>,
    Path(raw): Path<String>,
    body: Bytes,
) -> Result<Json<Bet>, ApiError> {
    let id = parse_id(&raw)?;
    let update: UpdateBet = parse_body(&body)?;
    let bet = if let Some(status) = update.status {
        match status {
            BetStatus::Accepted => {
                let opponent = update
                    .opponent
                    .ok_or_else(|| validation("opponent is required to accept a bet"))?;
                board.accept(&id, &opponent)?
            }
            BetStatus::Resolved => {
                let winner = update
                    .winner
                    .ok_or_else(|| validation("winner is required to resolve a bet"))?;
                board.resolve(&id, &winner)?
            }
            BetStatus::Open => return Err(validation("a bet cannot be reopened")),
        }
    } else if let Some(played) = update.game_played {
        if !played {
            return Err(validation("gamePlayed can only be set to true"));
        }
        board.play(&id)?
    } else {
        return Err(validation("invalid update"));
    };
    Ok(Json(bet))
}

async fn delete_bet(
    AxumState(board): AxumState<Arc<Board<MemoryStore>>>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw)?;
    board.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn updates_ws(
    AxumState(board): AxumState<Arc<Board<MemoryStore>>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_updates_ws(socket, board))
}

async fn handle_updates_ws(socket: WebSocket, board: Arc<Board<MemoryStore>>) {
    info!("updates WebSocket connected");
    let (mut sender, mut receiver) = socket.split();
    let mut updates = board.subscribe();

    loop {
        tokio::select! {
            // Handle incoming WebSocket messages (ping/pong/close)
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) => {
                        debug!("client closed WebSocket connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            warn!("failed to send pong, client disconnected");
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        warn!("WebSocket error: {err:?}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                    _ => {} // Ignore other message types
                }
            }
            // Fan out committed events
            event = updates.recv() => {
                match event {
                    Ok(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(err) => {
                                error!("failed to encode {} event: {err}", event.kind());
                                continue;
                            }
                        };
                        if sender.send(Message::Text(payload)).await.is_err() {
                            warn!("failed to send update, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // The subscriber self-heals with a full fetch.
                        warn!("WebSocket client lagged behind, skipped {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("event channel closed");
                        break;
                    }
                }
            }
        }
    }
    debug!("updates WebSocket handler exiting");
    let _ = sender.close().await;
}
