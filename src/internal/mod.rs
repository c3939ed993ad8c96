pub mod cache;
pub mod fixture;
pub mod sink;
