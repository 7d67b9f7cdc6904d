use chrono::{DateTime, Duration, Utc};
use sea_orm::DbErr;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::billing::{BillingError, BillingProvider, Subscription};
use crate::db::entities::user_subscription;
use crate::db::enums::SubscriptionStatus;
use crate::db::services::SubscriptionStore;

#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("STRIPE_SECRET_KEY is not set")]
    NotConfigured,
    #[error("User not authenticated or email not available")]
    MissingEmail,
    #[error("{0}")]
    Upstream(#[from] BillingError),
    #[error("Failed to persist subscription: {0}")]
    Persistence(#[from] DbErr),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionSnapshot {
    pub subscribed: bool,
    pub subscription_end: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub trial_active: bool,
    pub trial_days_left: i64,
}

impl SubscriptionSnapshot {
    fn new(
        subscribed: bool,
        subscription_end: Option<DateTime<Utc>>,
        trial_ends_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let remaining = trial_ends_at
            .map(|ends| (ends - now).num_seconds())
            .filter(|secs| *secs > 0);
        let trial_active = !subscribed && remaining.is_some();
        let trial_days_left = match remaining {
            Some(secs) if trial_active => (secs + 86_399) / 86_400,
            _ => 0,
        };
        Self {
            subscribed,
            subscription_end,
            trial_ends_at,
            trial_active,
            trial_days_left,
        }
    }
}

fn from_unix(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|s| DateTime::from_timestamp(s, 0))
}

pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    billing: Option<Arc<dyn BillingProvider>>,
    trial_days: i64,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        billing: Option<Arc<dyn BillingProvider>>,
        trial_days: i64,
    ) -> Self {
        Self {
            store,
            billing,
            trial_days,
        }
    }

    fn new_record(&self, user_id: Uuid, now: DateTime<Utc>) -> user_subscription::Model {
        user_subscription::Model {
            id: Uuid::new_v4(),
            user_id,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            stripe_price_id: None,
            status: SubscriptionStatus::Inactive,
            current_period_start: None,
            current_period_end: None,
            trial_ends_at: Some(now + Duration::days(self.trial_days)),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refreshes the user's mirrored billing state from the payments provider.
    pub async fn check(
        &self,
        user_id: Uuid,
        email: Option<&str>,
    ) -> Result<SubscriptionSnapshot, SubscriptionError> {
        let billing = self.billing.as_ref().ok_or(SubscriptionError::NotConfigured)?;
        let email = email
            .filter(|e| !e.is_empty())
            .ok_or(SubscriptionError::MissingEmail)?;

        let now = Utc::now();
        let mut record = match self.store.find_by_user(user_id).await? {
            Some(existing) => existing,
            None => self.new_record(user_id, now),
        };
        record.updated_at = now;

        let Some(customer) = billing.find_customer_by_email(email).await? else {
            info!(user_id = %user_id, "No billing customer found.");
            record.status = SubscriptionStatus::Inactive;
            let trial_ends_at = record.trial_ends_at;
            self.store_inactive(record).await;
            return Ok(SubscriptionSnapshot::new(false, None, trial_ends_at, now));
        };
        info!(user_id = %user_id, customer_id = %customer.id, "Found billing customer.");

        record.stripe_customer_id = Some(customer.id.clone());

        match billing.find_active_subscription(&customer.id).await? {
            Some(subscription) => {
                let subscription_end = from_unix(subscription.current_period_end);
                Self::apply_active(&mut record, &subscription);
                let trial_ends_at = record.trial_ends_at;
                self.store.upsert(record).await?;
                info!(user_id = %user_id, subscription_id = %subscription.id, "Active subscription mirrored.");
                Ok(SubscriptionSnapshot::new(true, subscription_end, trial_ends_at, now))
            }
            None => {
                info!(user_id = %user_id, "No active subscription found.");
                record.status = SubscriptionStatus::Inactive;
                let trial_ends_at = record.trial_ends_at;
                self.store_inactive(record).await;
                Ok(SubscriptionSnapshot::new(false, None, trial_ends_at, now))
            }
        }
    }

    fn apply_active(record: &mut user_subscription::Model, subscription: &Subscription) {
        if subscription.current_period_start.is_none() || subscription.current_period_end.is_none() {
            warn!(subscription_id = %subscription.id, "Subscription is missing period timestamps.");
        }
        record.stripe_subscription_id = Some(subscription.id.clone());
        record.stripe_price_id = subscription.first_price_id().map(str::to_string);
        record.status = SubscriptionStatus::Active;
        record.current_period_start = from_unix(subscription.current_period_start);
        record.current_period_end = from_unix(subscription.current_period_end);
    }

    // Inactive mirrors are best-effort; the answer to the caller does not depend on them.
    async fn store_inactive(&self, record: user_subscription::Model) {
        let user_id = record.user_id;
        if let Err(e) = self.store.upsert(record).await {
            warn!(user_id = %user_id, error = %e, "Failed to store inactive subscription.");
        }
    }
}
