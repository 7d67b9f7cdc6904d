//! Client side of the third-party WhatsApp gateway (an Evolution API server).

use async_trait::async_trait;
use thiserror::Error;

pub mod evolution;
pub mod payload;

pub use evolution::EvolutionClient;
pub use payload::{ConnectionState, GatewayState, InstanceMetadata};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Gateway returned an unreadable payload: {0}")]
    InvalidPayload(String),
}

/// Operations this service needs from the gateway. Every call carries the credential to use.
#[async_trait]
pub trait WhatsappGateway: Send + Sync {
    /// Live connection state of a session.
    async fn connection_state(
        &self,
        instance_name: &str,
        api_key: &str,
    ) -> Result<ConnectionState, GatewayError>;

    /// Richer session metadata from the instance listing.
    async fn fetch_instance(
        &self,
        instance_name: &str,
        api_key: &str,
    ) -> Result<InstanceMetadata, GatewayError>;

    async fn logout(&self, instance_name: &str, api_key: &str) -> Result<(), GatewayError>;

    async fn delete_instance(&self, instance_name: &str, api_key: &str) -> Result<(), GatewayError>;
}
