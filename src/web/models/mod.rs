use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::entities::whatsapp_instance;
use crate::db::enums::InstanceStatus;

// JWT claims issued by the auth provider
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid, // User id
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

/// Struct to hold authenticated user details, to be passed as a request extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatusResponse {
    pub success: bool,
    pub status: InstanceStatus,
    pub phone_number: Option<String>,
    pub instance: whatsapp_instance::Model,
}

#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}
