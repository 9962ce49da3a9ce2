pub mod lifecycle;
pub mod matrix;
pub mod schedule;
pub mod summary;
