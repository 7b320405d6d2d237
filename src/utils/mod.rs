pub mod constants;
pub mod coordinates;
pub mod progress;
pub mod units;

pub use constants::*;
pub use coordinates::parse_coordinate;
pub use progress::ProgressReporter;
