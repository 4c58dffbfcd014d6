pub mod batch;
pub mod candidate;
