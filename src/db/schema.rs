use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::prelude::{UserSubscription, WhatsappInstance};

/// Creates the service's tables when they do not exist yet.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table_if_missing(db, WhatsappInstance).await?;
    create_table_if_missing(db, UserSubscription).await?;
    Ok(())
}

async fn create_table_if_missing<E>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(backend.build(&statement)).await?;
    info!(table = entity.table_name(), "Table ensured.");
    Ok(())
}
