pub mod dispatch;
pub mod executor;
