use axum::{extract::State, Json};
use serde::Serialize;

use crate::compare::CompareMode;
use crate::dispatch::ForwardErrorPolicy;
use crate::http::server::AppState;
use crate::stats::DiffStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub mode: CompareMode,
    pub control: String,
    pub experiment: String,
    pub on_forward_error: ForwardErrorPolicy,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let dispatcher = &state.dispatcher;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        mode: dispatcher.comparator().mode(),
        control: dispatcher.control().to_string(),
        experiment: dispatcher.experiment().to_string(),
        on_forward_error: state.config.dispatch.on_forward_error,
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<DiffStats> {
    Json(state.dispatcher.aggregator().snapshot())
}
