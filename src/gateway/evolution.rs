use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::payload::{ConnectionState, InstanceMetadata};
use super::{GatewayError, WhatsappGateway};

/// HTTP client for an Evolution API server.
pub struct EvolutionClient {
    client: Client,
    base_url: String,
}

impl EvolutionClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, path: &str, api_key: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", api_key)
    }

    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl WhatsappGateway for EvolutionClient {
    async fn connection_state(
        &self,
        instance_name: &str,
        api_key: &str,
    ) -> Result<ConnectionState, GatewayError> {
        let path = format!(
            "/instance/connectionState/{}",
            urlencoding::encode(instance_name)
        );
        let response = self.request(Method::GET, &path, api_key).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // A JSON body is used regardless of status; the gateway reports some states with error codes.
        match serde_json::from_str::<Value>(&body) {
            Ok(payload) => {
                if !status.is_success() {
                    warn!(instance = %instance_name, status = %status, "Connection state returned non-success status with a JSON body.");
                }
                debug!(instance = %instance_name, payload = %payload, "Connection state payload.");
                Ok(ConnectionState::from_payload(&payload))
            }
            Err(_) if !status.is_success() => Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(GatewayError::InvalidPayload(e.to_string())),
        }
    }

    async fn fetch_instance(
        &self,
        instance_name: &str,
        api_key: &str,
    ) -> Result<InstanceMetadata, GatewayError> {
        let response = self
            .request(Method::GET, "/instance/fetchInstances", api_key)
            .query(&[("instanceName", instance_name)])
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;
        Ok(InstanceMetadata::from_payload(&payload))
    }

    async fn logout(&self, instance_name: &str, api_key: &str) -> Result<(), GatewayError> {
        let path = format!("/instance/logout/{}", urlencoding::encode(instance_name));
        let response = self.request(Method::DELETE, &path, api_key).send().await?;
        Self::error_for_status(response).await?;
        Ok(())
    }

    async fn delete_instance(&self, instance_name: &str, api_key: &str) -> Result<(), GatewayError> {
        let path = format!("/instance/delete/{}", urlencoding::encode(instance_name));
        let response = self.request(Method::DELETE, &path, api_key).send().await?;
        Self::error_for_status(response).await?;
        Ok(())
    }
}
