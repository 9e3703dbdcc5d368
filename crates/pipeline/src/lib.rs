//! Evaluation orchestration: the per-evaluation runner, the dispatcher that
//! runs it in the background, and the service facade callers use.

pub mod dispatcher;
pub mod runner;
pub mod service;

pub use dispatcher::Dispatcher;
pub use runner::{EvaluationRunner, RunOutcome, RunRequest};
pub use service::{Backends, EvaluationService, Submission};
