pub mod api;
pub mod bootstrap;
pub mod config;
pub mod contacts;
pub mod database;
pub mod error;
pub mod friend_requests;
pub mod posts;
pub mod telemetry;
pub mod users;
pub mod utils;
