pub mod instance_store;
pub mod subscription_store;

pub use instance_store::{DbInstanceStore, InstanceStore};
pub use subscription_store::{DbSubscriptionStore, SubscriptionStore};
