mod judge_internal;
pub mod oracle;
pub mod reliability;

use crate::errors::GradeError;
use crate::model::{Criterion, CriterionResult, ProcessedEssay, Rubric};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use oracle::{JudgeOracle, LlmJudgeOracle};

/// Quotes must reach this many characters to count as evidence.
pub const DEFAULT_MIN_QUOTE_CHARS: usize = 11;
pub const DEFAULT_MAX_SPAN_CHARS: usize = 240;
pub const DEFAULT_SYNTHETIC_QUOTE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GradingMode {
    /// One oracle call per criterion, accepted as final.
    #[default]
    Fast,
    /// Dual sampling, tie-break and consistency self-check.
    Full,
}

impl GradingMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GradingMode::Fast => "fast",
            GradingMode::Full => "full",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Some(GradingMode::Fast),
            "full" => Some(GradingMode::Full),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JudgeRuntimeConfig {
    pub mode: GradingMode,
    /// Upper bound on evidence quote length; longer quotes are cut to this.
    pub max_span_chars: usize,
    /// Quotes shorter than this are dropped.
    pub min_quote_chars: usize,
    /// Length of the justification prefix used for a synthetic span.
    pub synthetic_quote_chars: usize,
}

impl Default for JudgeRuntimeConfig {
    fn default() -> Self {
        Self {
            mode: GradingMode::Fast,
            max_span_chars: DEFAULT_MAX_SPAN_CHARS,
            min_quote_chars: DEFAULT_MIN_QUOTE_CHARS,
            synthetic_quote_chars: DEFAULT_SYNTHETIC_QUOTE_CHARS,
        }
    }
}

/// Outcome of a batched rubric evaluation: results keyed to rubric position,
/// with a warning for every position the oracle left out.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: Vec<CriterionResult>,
    pub missing: Vec<String>,
    pub warnings: Vec<String>,
}

/// Criterion evaluator. Cheap to clone; holds the oracle capability.
#[derive(Clone)]
pub struct JudgeService {
    config: JudgeRuntimeConfig,
    oracle: Arc<dyn JudgeOracle>,
}

impl JudgeService {
    pub fn new(config: JudgeRuntimeConfig, oracle: Arc<dyn JudgeOracle>) -> Self {
        Self { config, oracle }
    }

    pub fn config(&self) -> &JudgeRuntimeConfig {
        &self.config
    }

    /// Run the configured protocol for one criterion.
    pub async fn evaluate(
        &self,
        criterion: &Criterion,
        essay: &ProcessedEssay,
    ) -> Result<CriterionResult, GradeError> {
        judge_internal::run::evaluate_impl(self, criterion, essay).await
    }

    /// Evaluate every criterion in one oracle call. No agreement, tie-break or
    /// consistency stage is run.
    pub async fn evaluate_batched(
        &self,
        rubric: &Rubric,
        essay: &ProcessedEssay,
    ) -> Result<BatchOutcome, GradeError> {
        judge_internal::batch::evaluate_batched_impl(self, rubric, essay).await
    }
}
