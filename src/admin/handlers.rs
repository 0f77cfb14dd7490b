use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::routing::ToolRegistration;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub auth_enabled: bool,
    pub ws_proxy_port: u16,
}

#[derive(Serialize)]
pub struct ToolStatus {
    #[serde(flatten)]
    pub registration: ToolRegistration,
    /// Current value from the auth-settings cache.
    pub centralized_auth: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let config = &state.inner.config;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        auth_enabled: config.auth.enabled,
        ws_proxy_port: config.websocket.port,
    })
}

async fn tool_status(state: &AppState, registration: ToolRegistration) -> ToolStatus {
    let settings = state.inner.gate.settings().await;
    let uses_own_login = settings
        .get(&registration.slug)
        .copied()
        .unwrap_or(registration.uses_own_login);
    ToolStatus {
        centralized_auth: state.inner.config.auth.enabled && !uses_own_login,
        registration,
    }
}

pub async fn get_tools(State(state): State<AppState>) -> Json<Vec<ToolStatus>> {
    let registrations = state.inner.resolver.registrations().await;
    let mut tools = Vec::with_capacity(registrations.len());
    for registration in registrations.iter() {
        tools.push(tool_status(&state, registration.clone()).await);
    }
    Json(tools)
}

pub async fn get_tool(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ToolStatus>, StatusCode> {
    let registration = state
        .inner
        .resolver
        .resolve(&slug)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(tool_status(&state, registration).await))
}
