pub mod error;
pub mod execution;
pub mod tasker;

#[cfg(test)]
mod tests;
