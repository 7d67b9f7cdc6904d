use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QuerySelect,
    Set,
};
use uuid::Uuid;

use crate::db::entities::prelude::{WhatsappInstance, WhatsappInstanceActiveModel, WhatsappInstanceColumn};
use crate::db::entities::whatsapp_instance;
use crate::db::enums::InstanceStatus;

/// Persistence for per-user messaging sessions.
#[async_trait]
pub trait InstanceStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<whatsapp_instance::Model>, DbErr>;

    /// Unconditional write of the reconciled fields, keyed by row id.
    async fn update_status(
        &self,
        id: Uuid,
        status: InstanceStatus,
        phone_number: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<whatsapp_instance::Model, DbErr>;

    /// Returns the number of rows removed.
    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, DbErr>;

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, DbErr>;
}

#[derive(Clone)]
pub struct DbInstanceStore {
    db: DatabaseConnection,
}

impl DbInstanceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InstanceStore for DbInstanceStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<whatsapp_instance::Model>, DbErr> {
        WhatsappInstance::find()
            .filter(WhatsappInstanceColumn::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: InstanceStatus,
        phone_number: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> Result<whatsapp_instance::Model, DbErr> {
        let active_model = WhatsappInstanceActiveModel {
            id: Set(id),
            status: Set(status),
            phone_number: Set(phone_number),
            updated_at: Set(updated_at),
            ..Default::default()
        };
        active_model.update(&self.db).await
    }

    async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, DbErr> {
        let result = WhatsappInstance::delete_many()
            .filter(WhatsappInstanceColumn::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn list_user_ids(&self) -> Result<Vec<Uuid>, DbErr> {
        WhatsappInstance::find()
            .select_only()
            .column(WhatsappInstanceColumn::UserId)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
    }
}
