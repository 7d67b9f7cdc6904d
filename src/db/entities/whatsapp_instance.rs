use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::InstanceStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "whatsapp_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)] // One instance per user
    pub user_id: Uuid,
    pub instance_name: String,
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub status: InstanceStatus,
    pub phone_number: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
