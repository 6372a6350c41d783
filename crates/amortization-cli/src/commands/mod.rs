pub mod resolver;
pub mod schedule;
