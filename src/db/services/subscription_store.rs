use async_trait::async_trait;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    QueryFilter,
};
use uuid::Uuid;

use crate::db::entities::prelude::{UserSubscription, UserSubscriptionColumn};
use crate::db::entities::user_subscription;

/// Local mirror of each user's billing state.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<user_subscription::Model>, DbErr>;

    /// Inserts the record, or overwrites the mutable columns of the row with the same `user_id`.
    async fn upsert(&self, record: user_subscription::Model) -> Result<user_subscription::Model, DbErr>;
}

#[derive(Clone)]
pub struct DbSubscriptionStore {
    db: DatabaseConnection,
}

impl DbSubscriptionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionStore for DbSubscriptionStore {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<user_subscription::Model>, DbErr> {
        UserSubscription::find()
            .filter(UserSubscriptionColumn::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    async fn upsert(&self, record: user_subscription::Model) -> Result<user_subscription::Model, DbErr> {
        let on_conflict = OnConflict::column(UserSubscriptionColumn::UserId)
            .update_columns([
                UserSubscriptionColumn::StripeCustomerId,
                UserSubscriptionColumn::StripeSubscriptionId,
                UserSubscriptionColumn::StripePriceId,
                UserSubscriptionColumn::Status,
                UserSubscriptionColumn::CurrentPeriodStart,
                UserSubscriptionColumn::CurrentPeriodEnd,
                UserSubscriptionColumn::TrialEndsAt,
                UserSubscriptionColumn::UpdatedAt,
            ])
            .to_owned();

        UserSubscription::insert(record.into_active_model().reset_all())
            .on_conflict(on_conflict)
            .exec_with_returning(&self.db)
            .await
    }
}
