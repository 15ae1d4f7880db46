#![forbid(unsafe_code)]

pub mod grading;
pub mod model;
pub mod session;
pub mod time;

pub use grading::{Grader, PlaceholderGrader, grade};
pub use time::Clock;
