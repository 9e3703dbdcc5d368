pub mod evaluation_repo;
pub mod job_sequence_repo;
pub mod job_status_repo;

pub use evaluation_repo::EvaluationRepo;
pub use job_sequence_repo::JobSequenceRepo;
pub use job_status_repo::JobStatusRepo;
