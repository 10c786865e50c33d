use crate::application::scoring::{DemoData, ScoreResponse};
use crate::interfaces::http::state::AppState;
use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};
use serde_json::{Value, json};

pub async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true }))
}

pub async fn score(State(state): State<AppState>) -> Json<ScoreResponse> {
    Json(state.scoring.score().await)
}

pub async fn demo_data(State(state): State<AppState>) -> Json<DemoData> {
    Json(state.scoring.demo_data().await)
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        state.metrics.render(),
    )
}
