//! HTTP 传输绑定

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use super::{DelResponse, GetResponse, Pong, ReloadResponse, SessionService, SetResponse};

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub uid: i64,
}

/// 构建服务路由
pub fn router(service: Arc<SessionService>) -> Router {
    Router::new()
        .route("/v1/session", post(set_session))
        .route("/v1/session/{token}", get(get_session).delete(del_session))
        .route("/v1/reload", post(reload))
        .route("/ping", get(ping))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

async fn set_session(
    State(service): State<Arc<SessionService>>,
    Json(req): Json<SetRequest>,
) -> Json<SetResponse> {
    Json(service.set(req.uid).await)
}

async fn get_session(
    State(service): State<Arc<SessionService>>,
    Path(token): Path<String>,
) -> Json<GetResponse> {
    Json(service.get(&token).await)
}

async fn del_session(
    State(service): State<Arc<SessionService>>,
    Path(token): Path<String>,
) -> Json<DelResponse> {
    Json(service.del(&token).await)
}

async fn reload(State(service): State<Arc<SessionService>>) -> Json<ReloadResponse> {
    Json(service.reload().await)
}

async fn ping(State(service): State<Arc<SessionService>>) -> Json<Pong> {
    Json(service.ping().await)
}
