pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod router;
pub mod server;
pub mod session;
