use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{BillingError, BillingProvider, Customer, Subscription};

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

pub struct StripeClient {
    client: Client,
    api_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn with_api_url(api_url: &str, secret_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    async fn list_first<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, BillingError> {
        let response = self
            .client
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(BillingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let list: ListResponse<T> = response.json().await?;
        Ok(list.data.into_iter().next())
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, BillingError> {
        self.list_first("/v1/customers", &[("email", email), ("limit", "1")])
            .await
    }

    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        self.list_first(
            "/v1/subscriptions",
            &[("customer", customer_id), ("status", "active"), ("limit", "1")],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_find_customer_by_email() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1/customers"))
            .and(matchers::query_param("email", "ana@example.com"))
            .and(matchers::query_param("limit", "1"))
            .and(matchers::header("authorization", "Bearer sk_test_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{"id": "cus_123", "email": "ana@example.com"}]
            })))
            .mount(&server)
            .await;

        let client = StripeClient::with_api_url(&server.uri(), "sk_test_abc");
        let customer = client.find_customer_by_email("ana@example.com").await.unwrap();
        assert_eq!(customer.map(|c| c.id).as_deref(), Some("cus_123"));
    }

    #[tokio::test]
    async fn test_empty_customer_list() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = StripeClient::with_api_url(&server.uri(), "sk_test_abc");
        assert_eq!(client.find_customer_by_email("nobody@example.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_active_subscription_without_period() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/v1/subscriptions"))
            .and(matchers::query_param("customer", "cus_123"))
            .and(matchers::query_param("status", "active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "id": "sub_1",
                    "status": "active",
                    "items": {"data": [{"price": {"id": "price_premium", "product": "prod_1"}}]}
                }]
            })))
            .mount(&server)
            .await;

        let client = StripeClient::with_api_url(&server.uri(), "sk_test_abc");
        let subscription = client
            .find_active_subscription("cus_123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subscription.id, "sub_1");
        assert_eq!(subscription.first_price_id(), Some("price_premium"));
        assert_eq!(subscription.current_period_end, None);
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Invalid API Key provided"}
            })))
            .mount(&server)
            .await;

        let client = StripeClient::with_api_url(&server.uri(), "sk_wrong");
        let result = client.find_customer_by_email("ana@example.com").await;
        assert!(matches!(result, Err(BillingError::Status { status: 401, .. })));
    }
}
