pub mod gen;
pub mod schedule;
