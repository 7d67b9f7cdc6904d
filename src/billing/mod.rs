//! Client side of the payments provider (Stripe).

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod stripe;

pub use stripe::StripeClient;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("Billing request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Billing provider returned status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    /// Unix seconds. Newer API versions may omit these at the top level.
    #[serde(default)]
    pub current_period_start: Option<i64>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl Subscription {
    pub fn first_price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SubscriptionItem {
    pub price: Price,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Price {
    pub id: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, BillingError>;

    async fn find_active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>, BillingError>;
}
