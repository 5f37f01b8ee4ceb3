pub mod config;
pub mod error;
pub mod ranking;
pub mod sources;
pub mod telemetry;
pub mod trends;

pub use error::AppError;
