pub mod info;

pub use info::{JobInfo, JobStatus};
