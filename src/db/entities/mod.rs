//! SeaORM entities mapping the two tables this service owns.

pub mod user_subscription;
pub mod whatsapp_instance;

pub mod prelude {
    pub use super::whatsapp_instance::Entity as WhatsappInstance;
    pub use super::whatsapp_instance::Model as WhatsappInstanceModel;
    pub use super::whatsapp_instance::ActiveModel as WhatsappInstanceActiveModel;
    pub use super::whatsapp_instance::Column as WhatsappInstanceColumn;

    pub use super::user_subscription::Entity as UserSubscription;
    pub use super::user_subscription::Model as UserSubscriptionModel;
    pub use super::user_subscription::ActiveModel as UserSubscriptionActiveModel;
    pub use super::user_subscription::Column as UserSubscriptionColumn;
}
