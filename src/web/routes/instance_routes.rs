use axum::{
    extract::{Extension, State},
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use std::sync::Arc;

use crate::web::{
    models::{AuthenticatedUser, DisconnectResponse, InstanceStatusResponse},
    AppError, AppState,
};

pub fn create_instance_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", post(check_instance_status))
        .route("/", delete(disconnect_instance))
}

async fn check_instance_status(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let reconciled = app_state.instance_service.reconcile(auth_user.id).await?;

    Ok(Json(InstanceStatusResponse {
        success: true,
        status: reconciled.status,
        phone_number: reconciled.phone_number,
        instance: reconciled.instance,
    }))
}

async fn disconnect_instance(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    app_state.instance_service.disconnect(auth_user.id).await?;

    Ok(Json(DisconnectResponse {
        success: true,
        message: "WhatsApp disconnected successfully".to_string(),
    }))
}
