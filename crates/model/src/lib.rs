pub mod core;
pub mod job;
pub mod load;
