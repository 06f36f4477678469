use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use domain::value_objects::UserId;

use crate::{state::AppState, websocket};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/presence/{user_id}", get(presence))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize)]
struct PresenceResponse {
    online: bool,
    connections: usize,
}

/// 在线状态只读查询，供运维和其他服务探测
async fn presence(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Json<PresenceResponse> {
    let user_id = UserId::from(user_id);
    Json(PresenceResponse {
        online: state.presence.is_online(user_id),
        connections: state.presence.connection_count(user_id),
    })
}
