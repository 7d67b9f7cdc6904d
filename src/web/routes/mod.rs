pub mod instance_routes;
pub mod subscription_routes;
