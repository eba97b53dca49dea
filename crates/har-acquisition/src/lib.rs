pub mod acquisition;
pub mod config;
pub mod error;
pub mod telemetry;
