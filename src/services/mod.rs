pub mod instance_service;
pub mod subscription_service;

pub use instance_service::{InstanceError, InstanceService, ReconciledInstance};
pub use subscription_service::{SubscriptionError, SubscriptionService, SubscriptionSnapshot};
