use chrono::Utc;
use sea_orm::DbErr;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::entities::whatsapp_instance;
use crate::db::enums::InstanceStatus;
use crate::db::services::InstanceStore;
use crate::gateway::payload::resolve_phone_number;
use crate::gateway::{GatewayError, GatewayState, InstanceMetadata, WhatsappGateway};

#[derive(Error, Debug)]
pub enum InstanceError {
    #[error("No instance found")]
    NotFound,
    #[error("{0}")]
    Upstream(#[from] GatewayError),
    #[error("Failed to persist instance: {0}")]
    Persistence(#[from] DbErr),
}

/// Outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledInstance {
    pub status: InstanceStatus,
    pub phone_number: Option<String>,
    pub instance: whatsapp_instance::Model,
}

/// Local status for a gateway state. `None` means the stored status is kept.
pub fn local_status(state: &GatewayState) -> Option<InstanceStatus> {
    match state {
        GatewayState::Open => Some(InstanceStatus::Connected),
        GatewayState::Close => Some(InstanceStatus::Disconnected),
        GatewayState::Connecting => Some(InstanceStatus::Pending),
        GatewayState::Other(_) => None,
    }
}

pub struct InstanceService {
    store: Arc<dyn InstanceStore>,
    gateway: Arc<dyn WhatsappGateway>,
    default_api_key: String,
}

impl InstanceService {
    pub fn new(
        store: Arc<dyn InstanceStore>,
        gateway: Arc<dyn WhatsappGateway>,
        default_api_key: String,
    ) -> Self {
        Self {
            store,
            gateway,
            default_api_key,
        }
    }

    fn api_key_for<'a>(&'a self, instance: &'a whatsapp_instance::Model) -> &'a str {
        instance
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .unwrap_or(&self.default_api_key)
    }

    /// Refreshes the stored status of the user's instance from the gateway's live state.
    pub async fn reconcile(&self, user_id: Uuid) -> Result<ReconciledInstance, InstanceError> {
        let instance = self
            .store
            .find_by_user(user_id)
            .await?
            .ok_or(InstanceError::NotFound)?;
        let api_key = self.api_key_for(&instance);

        let (primary, enrichment) = tokio::join!(
            self.gateway.connection_state(&instance.instance_name, api_key),
            self.gateway.fetch_instance(&instance.instance_name, api_key),
        );
        let primary = primary?;

        let enrichment: Option<InstanceMetadata> = match enrichment {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(user_id = %user_id, instance = %instance.instance_name, error = %e, "Instance enrichment unavailable, using connection state only.");
                None
            }
        };

        let gateway_state = primary.gateway_state();
        debug!(user_id = %user_id, instance = %instance.instance_name, state = ?gateway_state, "Derived gateway state.");

        let status = local_status(&gateway_state).unwrap_or(instance.status);
        let mut phone_number = instance.phone_number.clone();
        if status == InstanceStatus::Connected {
            if let Some(phone) = resolve_phone_number(enrichment.as_ref(), &primary) {
                phone_number = Some(phone);
            }
        }

        let updated = self
            .store
            .update_status(instance.id, status, phone_number.clone(), Utc::now())
            .await
            .map_err(|e| match e {
                // Removed by a concurrent disconnect after the read.
                DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => InstanceError::NotFound,
                other => InstanceError::Persistence(other),
            })?;

        if updated.status != instance.status {
            info!(user_id = %user_id, instance = %instance.instance_name, from = %instance.status, to = %status, "Instance status changed.");
        }

        Ok(ReconciledInstance {
            status,
            phone_number,
            instance: updated,
        })
    }

    /// Logs out and deletes the gateway session, then removes the local row.
    /// Gateway failures are tolerated independently of each other.
    pub async fn disconnect(&self, user_id: Uuid) -> Result<(), InstanceError> {
        let instance = self
            .store
            .find_by_user(user_id)
            .await?
            .ok_or(InstanceError::NotFound)?;
        let api_key = self.api_key_for(&instance);

        info!(user_id = %user_id, instance = %instance.instance_name, "Disconnecting instance.");

        match self.gateway.logout(&instance.instance_name, api_key).await {
            Ok(()) => info!(instance = %instance.instance_name, "Instance logged out from gateway."),
            Err(e) => warn!(instance = %instance.instance_name, error = %e, "Failed to log out instance from gateway."),
        }

        match self.gateway.delete_instance(&instance.instance_name, api_key).await {
            Ok(()) => info!(instance = %instance.instance_name, "Instance deleted from gateway."),
            Err(e) => warn!(instance = %instance.instance_name, error = %e, "Failed to delete instance from gateway."),
        }

        let removed = self.store.delete_by_user(user_id).await?;
        info!(user_id = %user_id, rows = removed, "Instance removed.");
        Ok(())
    }

    /// Reconciles every stored instance once. Returns how many succeeded.
    pub async fn reconcile_all(&self) -> Result<usize, InstanceError> {
        let user_ids = self.store.list_user_ids().await?;
        let mut reconciled = 0;
        for user_id in &user_ids {
            match self.reconcile(*user_id).await {
                Ok(_) => reconciled += 1,
                // Deleted between listing and reconciling.
                Err(InstanceError::NotFound) => {}
                Err(e) => warn!(user_id = %user_id, error = %e, "Reconciliation failed."),
            }
        }
        debug!(total = user_ids.len(), reconciled, "Reconciliation sweep finished.");
        Ok(reconciled)
    }

    pub async fn run_periodic_reconciliation(self: Arc<Self>, period_seconds: u64) {
        info!(
            interval_seconds = period_seconds,
            "Instance reconciliation sweep started."
        );
        let mut interval = interval(Duration::from_secs(period_seconds));
        loop {
            interval.tick().await;
            if let Err(e) = self.reconcile_all().await {
                error!(error = %e, "Error during reconciliation sweep.");
            }
        }
    }
}
