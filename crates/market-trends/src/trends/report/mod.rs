mod insights;
mod summary;
pub mod views;

pub use summary::{TrendEngine, TrendReport};

pub(crate) use insights::generate_insights;
