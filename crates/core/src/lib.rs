//! Domain logic for the fairscope evaluation lifecycle.
//!
//! Everything in this crate is free of database access: the lifecycle state
//! machine, status payloads, the config materializer, and the capability
//! traits (sequencer, stores, external computation) that the `db` and
//! `pipeline` crates implement and drive.

pub mod computation;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod job_status;
pub mod memory;
pub mod sequencer;
pub mod store;
pub mod tenant;
pub mod types;
