use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/health", get(handlers::health))
        .route("/room", post(handlers::create_room))
        .route("/room/{id}/authenticate", post(handlers::authenticate))
        .route(
            "/room/{id}/product-owner",
            get(handlers::join_as_product_owner),
        )
        .route("/room/{id}/developer", get(handlers::join_as_developer))
        .route("/room/{id}/users/exists", get(handlers::user_exists))
        .route("/room/{id}/users", get(handlers::list_users))
        .route("/room/{id}/state", get(handlers::room_state))
        .route("/room/{id}/permissions", get(handlers::permissions))
        .route("/room/{id}/exists", get(handlers::room_exists))
        .route("/rooms", get(handlers::list_rooms))
        .route("/possible-guesses", get(handlers::possible_guesses));

    Router::new().nest("/v1", v1).with_state(state)
}
