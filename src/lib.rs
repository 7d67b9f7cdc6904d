pub mod billing;
pub mod db;
pub mod gateway;
pub mod server;
pub mod services;
pub mod web;

#[cfg(test)]
mod testing;
