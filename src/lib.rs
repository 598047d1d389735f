pub mod bybit;
pub mod chat;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod session;
