pub mod api;
pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod ws;
