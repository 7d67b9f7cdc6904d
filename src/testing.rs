//! In-memory stores and scripted remote services shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sea_orm::DbErr;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::billing::{BillingError, BillingProvider, Customer, Subscription};
use crate::db::entities::{user_subscription, whatsapp_instance};
use crate::db::enums::InstanceStatus;
use crate::db::services::{InstanceStore, SubscriptionStore};
use crate::gateway::{ConnectionState, GatewayError, InstanceMetadata, WhatsappGateway};

pub fn instance_row(status: InstanceStatus, phone_number: Option<&str>) -> whatsapp_instance::Model {
    let user_id = Uuid::new_v4();
    let created = Utc::now() - Duration::hours(1);
    whatsapp_instance::Model {
        id: Uuid::new_v4(),
        user_id,
        instance_name: format!("user-{}", user_id.simple()),
        api_key: None,
        status,
        phone_number: phone_number.map(str::to_string),
        created_at: created,
        updated_at: created,
    }
}

#[derive(Default)]
pub struct MemoryInstanceStore {
    rows: Mutex<HashMap<Uuid, whatsapp_instance::Model>>,
    fail_writes: AtomicBool,
    vanish_after_read: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryInstanceStore {
    pub fn with_rows(rows: Vec<whatsapp_instance::Model>) -> Self {
        let store = Self::default();
        store
            .rows
            .lock()
            .unwrap()
            .extend(rows.into_iter().map(|row| (row.id, row)));
        store
    }

    pub fn get(&self, id: Uuid) -> Option<whatsapp_instance::Model> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// The next lookup returns the row and then drops it, like a disconnect landing mid-reconcile.
    pub fn vanish_after_read(&self) {
        self.vanish_after_read.store(true, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceStore for MemoryInstanceStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<whatsapp_instance::Model>, DbErr> {
        let mut rows = self.rows.lock().unwrap();
        let found = rows.values().find(|row| row.user_id == user_id).cloned();
        if let Some(row) = &found {
            if self.vanish_after_read.swap(false, Ordering::SeqCst) {
                rows.remove(&row.id);
            }
        }
        Ok(found)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: InstanceStatus,
        phone_number: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<whatsapp_instance::Model, DbErr> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("write rejected".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        // sea-orm reports an update that matched no row this way.
        let row = rows.get_mut(&id).ok_or(DbErr::RecordNotUpdated)?;
        row.status = status;
        row.phone_number = phone_number;
        row.updated_at = updated_at;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(row.clone())
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("write rejected".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|_, row| row.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, DbErr> {
        Ok(self.rows.lock().unwrap().values().map(|row| row.user_id).collect())
    }
}

#[derive(Default)]
pub struct MemorySubscriptionStore {
    rows: Mutex<HashMap<Uuid, user_subscription::Model>>,
    fail_writes: AtomicBool,
}

impl MemorySubscriptionStore {
    pub fn insert(&self, record: user_subscription::Model) {
        self.rows.lock().unwrap().insert(record.user_id, record);
    }

    pub fn get(&self, user_id: Uuid) -> Option<user_subscription::Model> {
        self.rows.lock().unwrap().get(&user_id).cloned()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<user_subscription::Model>, DbErr> {
        Ok(self.get(user_id))
    }

    async fn upsert(&self, record: user_subscription::Model) -> Result<user_subscription::Model, DbErr> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbErr::Custom("write rejected".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let stored = match rows.get(&record.user_id) {
            Some(existing) => user_subscription::Model {
                id: existing.id,
                created_at: existing.created_at,
                ..record
            },
            None => record,
        };
        rows.insert(stored.user_id, stored.clone());
        Ok(stored)
    }
}

/// Gateway fake answering from canned payloads and recording `(operation, api_key)` pairs.
pub struct ScriptedGateway {
    primary: Option<Value>,
    enrichment: Value,
    fail_enrichment: AtomicBool,
    fail_teardown: AtomicBool,
    failing_instances: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    /// `None` makes every connection-state call fail.
    pub fn new(primary: Option<Value>) -> Self {
        Self {
            primary,
            enrichment: json!([]),
            fail_enrichment: AtomicBool::new(false),
            fail_teardown: AtomicBool::new(false),
            failing_instances: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_enrichment(mut self, enrichment: Value) -> Self {
        self.enrichment = enrichment;
        self
    }

    pub fn fail_enrichment(&self) {
        self.fail_enrichment.store(true, Ordering::SeqCst);
    }

    pub fn fail_teardown(&self) {
        self.fail_teardown.store(true, Ordering::SeqCst);
    }

    pub fn fail_primary_for(&self, instance_name: &str) {
        self.failing_instances
            .lock()
            .unwrap()
            .insert(instance_name.to_string());
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, api_key: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), api_key.to_string()));
    }

    fn unavailable() -> GatewayError {
        GatewayError::Status {
            status: 503,
            body: "gateway unavailable".to_string(),
        }
    }
}

#[async_trait]
impl WhatsappGateway for ScriptedGateway {
    async fn connection_state(
        &self,
        instance_name: &str,
        api_key: &str,
    ) -> Result<ConnectionState, GatewayError> {
        self.record("state", api_key);
        if self.failing_instances.lock().unwrap().contains(instance_name) {
            return Err(Self::unavailable());
        }
        self.primary
            .as_ref()
            .map(ConnectionState::from_payload)
            .ok_or_else(Self::unavailable)
    }

    async fn fetch_instance(
        &self,
        _instance_name: &str,
        api_key: &str,
    ) -> Result<InstanceMetadata, GatewayError> {
        self.record("fetch", api_key);
        if self.fail_enrichment.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(InstanceMetadata::from_payload(&self.enrichment))
    }

    async fn logout(&self, _instance_name: &str, api_key: &str) -> Result<(), GatewayError> {
        self.record("logout", api_key);
        if self.fail_teardown.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }

    async fn delete_instance(&self, _instance_name: &str, api_key: &str) -> Result<(), GatewayError> {
        self.record("delete", api_key);
        if self.fail_teardown.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedBilling {
    pub customer: Option<Customer>,
    pub subscription: Option<Subscription>,
    pub fail: bool,
}

#[async_trait]
impl BillingProvider for ScriptedBilling {
    async fn find_customer_by_email(&self, _email: &str) -> Result<Option<Customer>, BillingError> {
        if self.fail {
            return Err(BillingError::Status {
                status: 500,
                body: "billing unavailable".to_string(),
            });
        }
        Ok(self.customer.clone())
    }

    async fn find_active_subscription(
        &self,
        _customer_id: &str,
    ) -> Result<Option<Subscription>, BillingError> {
        Ok(self.subscription.clone())
    }
}
