use axum::{
    extract::{Extension, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::web::{models::AuthenticatedUser, AppError, AppState};

pub fn create_subscription_router() -> Router<Arc<AppState>> {
    Router::new().route("/check", post(check_subscription))
}

async fn check_subscription(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = app_state
        .subscription_service
        .check(auth_user.id, auth_user.email.as_deref())
        .await?;
    Ok(Json(snapshot))
}
