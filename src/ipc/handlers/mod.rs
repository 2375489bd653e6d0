pub mod core;
pub mod donors;
pub mod merge;
pub mod reports;
pub mod students;
