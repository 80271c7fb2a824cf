pub mod error;
pub mod loader;
pub mod metrics;
pub mod progress;
pub mod retry;
pub mod state;
