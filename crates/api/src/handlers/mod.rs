pub mod evaluations;
pub mod jobs;
