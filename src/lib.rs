//! pitchdesk - terminal startup consultant with specialist bots

pub mod bots;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod relevance;
pub mod render;
pub mod routing;
pub mod session;
pub mod telemetry;
pub mod template;
