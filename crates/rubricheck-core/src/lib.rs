//! Multi-pass consensus grading of essays against rubrics.
//!
//! A [`Grader`] runs the criterion evaluator ([`judge::JudgeService`]) over every
//! rubric criterion through an injected [`judge::JudgeOracle`], then folds the
//! results through the pure functions in [`aggregate`].

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod errors;
pub mod essay;
pub mod judge;
pub mod model;
pub mod providers;
pub mod report;
pub mod rubric;

pub use config::GraderConfig;
pub use engine::Grader;
pub use errors::{GradeError, GradeErrorKind};
