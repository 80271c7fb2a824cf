pub mod file_task;
pub mod state;

pub use file_task::FileTask;
pub use state::BulkLoadState;
