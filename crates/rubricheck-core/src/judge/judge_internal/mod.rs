//! Evaluator internals.
//!
//! - run.rs: per-criterion protocol (fast / full)
//! - batch.rs: single-call rubric evaluation
//! - prompt.rs: prompt builders and fixed instructions only
//! - client.rs: JSON recovery from raw oracle text
//! - validate.rs: judgment schema checks and evidence filtering

pub(crate) mod batch;
pub(crate) mod client;
pub(crate) mod prompt;
pub(crate) mod run;
pub(crate) mod validate;
