//! Process wiring: configuration from the environment and the service graph
//! the headless binary drives.

pub mod config;
pub mod services;

pub use config::AppConfig;
pub use services::{AppServices, build_services};
