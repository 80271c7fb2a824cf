pub mod counter;
pub mod load;

pub use counter::InFlightCounter;
pub use load::LoadTasker;
