//! HTTP/WebSocket handlers — the route table from SPEC_FULL §6.2.

use std::str::FromStr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use poker_core::message::Role;
use poker_core::query::QuerySurface;
use poker_core::room::RoomId;
use poker_core::session::Session;

use poker_transport::WebSocketChannel;

use crate::error::ApiError;
use crate::state::AppState;

fn parse_room_id(raw: &str) -> Result<RoomId, ApiError> {
    RoomId::from_str(raw).map_err(|_| ApiError::BadRoomId)
}

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    creator: String,
}

#[derive(Serialize)]
struct IdResponse {
    id: String,
}

pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomRequest>,
) -> Response {
    let handle = state.registry.create(body.creator).await;
    (
        StatusCode::CREATED,
        Json(IdResponse {
            id: handle.id().to_string(),
        }),
    )
        .into_response()
}

#[derive(Deserialize, Default)]
pub struct AuthenticateRequest {
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

/// Body is read leniently: a missing, empty, or malformed body is
/// treated as an empty password rather than a 400/422, so a known room
/// always answers `200 {ok:false}` and an unknown room always answers
/// `403`, regardless of what the caller sent as a body.
pub async fn authenticate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: axum::body::Bytes,
) -> Response {
    let Ok(room_id) = parse_room_id(&id) else {
        return ApiError::BadRoomId.into_response();
    };
    let password = serde_json::from_slice::<AuthenticateRequest>(&body)
        .map(|b| b.password)
        .unwrap_or_default();

    let query = QuerySurface::new(&state.registry);
    match query
        .authenticate(&room_id, &password, state.verifier.as_ref())
        .await
    {
        Some(ok) => (StatusCode::OK, Json(OkResponse { ok })).into_response(),
        None => (StatusCode::FORBIDDEN, Json(OkResponse { ok: false })).into_response(),
    }
}

#[derive(Deserialize)]
pub struct NameQuery {
    name: String,
}

async fn upgrade_session(
    state: AppState,
    id: String,
    name: String,
    role: Role,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let room_id = parse_room_id(&id)?;
    let query = QuerySurface::new(&state.registry);
    query.admit(&room_id, &name).await?;

    let handle = state
        .registry
        .find(&room_id)
        .await
        .ok_or(ApiError::RoomNotFound)?;
    let session = Session::new(name, role, handle, state.session_config);

    Ok(ws.on_upgrade(move |socket| async move {
        session.run(Box::new(WebSocketChannel::new(socket))).await;
    }))
}

pub async fn join_as_product_owner(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NameQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match upgrade_session(state, id, query.name, Role::ProductOwner, ws).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

pub async fn join_as_developer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NameQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match upgrade_session(state, id, query.name, Role::Developer, ws).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

#[derive(Serialize)]
struct ExistsResponse {
    exists: bool,
}

pub async fn user_exists(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NameQuery>,
) -> Response {
    let Ok(room_id) = parse_room_id(&id) else {
        return ApiError::BadRoomId.into_response();
    };
    let surface = QuerySurface::new(&state.registry);
    let exists = surface.user_in_room(&room_id, &query.name).await;
    let status = if exists {
        StatusCode::CONFLICT
    } else {
        StatusCode::OK
    };
    (status, Json(ExistsResponse { exists })).into_response()
}

#[derive(Serialize)]
struct MemberResponse {
    name: String,
    role: Role,
    #[serde(rename = "isDone", skip_serializing_if = "Option::is_none")]
    is_done: Option<bool>,
}

pub async fn list_users(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(room_id) = parse_room_id(&id) else {
        return ApiError::BadRoomId.into_response();
    };
    let surface = QuerySurface::new(&state.registry);
    let members = surface
        .members(&room_id)
        .await
        .into_iter()
        .map(|m| MemberResponse {
            name: m.name,
            role: m.role,
            is_done: m.is_done,
        })
        .collect::<Vec<_>>();
    (StatusCode::OK, Json(members)).into_response()
}

#[derive(Serialize)]
struct RoomStateResponse {
    #[serde(rename = "inProgress")]
    in_progress: bool,
    #[serde(rename = "isLocked")]
    is_locked: bool,
}

pub async fn room_state(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(room_id) = parse_room_id(&id) else {
        return ApiError::BadRoomId.into_response();
    };
    let surface = QuerySurface::new(&state.registry);
    let state = surface.room_state(&room_id).await;
    (
        StatusCode::OK,
        Json(RoomStateResponse {
            in_progress: state.in_progress,
            is_locked: state.is_locked,
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct RoomPermissions {
    #[serde(rename = "canLock")]
    can_lock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

#[derive(Serialize)]
struct PermissionsResponse {
    permissions: PermissionsBody,
}

#[derive(Serialize)]
struct PermissionsBody {
    room: RoomPermissions,
}

pub async fn permissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<NameQuery>,
) -> Response {
    let Ok(room_id) = parse_room_id(&id) else {
        return ApiError::BadRoomId.into_response();
    };
    let surface = QuerySurface::new(&state.registry);
    match surface.permissions(&room_id, &query.name).await {
        None => ApiError::RoomNotFound.into_response(),
        Some(poker_core::query::Permissions::Creator { key }) => (
            StatusCode::OK,
            Json(PermissionsResponse {
                permissions: PermissionsBody {
                    room: RoomPermissions {
                        can_lock: true,
                        key: Some(key.to_string()),
                    },
                },
            }),
        )
            .into_response(),
        Some(poker_core::query::Permissions::NotCreator) => (
            StatusCode::OK,
            Json(PermissionsResponse {
                permissions: PermissionsBody {
                    room: RoomPermissions {
                        can_lock: false,
                        key: None,
                    },
                },
            }),
        )
            .into_response(),
    }
}

pub async fn room_exists(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Ok(room_id) = parse_room_id(&id) else {
        return ApiError::BadRoomId.into_response();
    };
    let exists = state.registry.exists(&room_id).await;
    (StatusCode::OK, Json(ExistsResponse { exists })).into_response()
}

#[derive(Serialize)]
struct RoomSummaryResponse {
    id: String,
    #[serde(rename = "playerCount")]
    player_count: usize,
}

#[derive(Serialize)]
struct RoomListResponse {
    rooms: Vec<RoomSummaryResponse>,
}

pub async fn list_rooms(State(state): State<AppState>) -> Response {
    let surface = QuerySurface::new(&state.registry);
    let rooms = surface
        .list_active()
        .await
        .into_iter()
        .map(|r| RoomSummaryResponse {
            id: r.id.to_string(),
            player_count: r.player_count,
        })
        .collect();
    (StatusCode::OK, Json(RoomListResponse { rooms })).into_response()
}

pub async fn possible_guesses(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(&state.guesses.options)).into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Response {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}
