//! Error taxonomy for grading runs.
//!
//! Refusals and disagreements are not errors: they surface as normal
//! `CriterionResult`s. Everything here aborts the criterion (or the batched call).

/// Coarse classification used for exit codes and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeErrorKind {
    Transport,
    Timeout,
    Parse,
    SchemaViolation,
    InvalidInput,
    Config,
    Task,
}

#[derive(Debug, thiserror::Error)]
pub enum GradeError {
    /// The oracle transport failed before returning any text.
    #[error("judge transport error: {message}")]
    Transport { message: String },

    /// A single oracle call exceeded its deadline.
    #[error("judge call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Neither JSON recovery strategy produced an object.
    #[error("judge returned invalid JSON: {message}")]
    Parse { message: String, raw: String },

    /// Output parsed as JSON but broke the judgment contract.
    #[error("schema violation for criterion '{criterion_id}': {violation}")]
    SchemaViolation {
        criterion_id: String,
        violation: String,
        raw: serde_json::Value,
    },

    #[error("invalid rubric: {message}")]
    InvalidRubric { message: String },

    #[error("invalid essay: {message}")]
    InvalidEssay { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    /// A criterion task panicked or was cancelled.
    #[error("grading task failed: {message}")]
    Task { message: String },

    #[error("criterion '{criterion_id}' failed: {source}")]
    Criterion {
        criterion_id: String,
        #[source]
        source: Box<GradeError>,
    },
}

impl GradeError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }

    pub fn schema(
        criterion_id: impl Into<String>,
        violation: impl Into<String>,
        raw: serde_json::Value,
    ) -> Self {
        Self::SchemaViolation {
            criterion_id: criterion_id.into(),
            violation: violation.into(),
            raw,
        }
    }

    pub fn invalid_rubric(message: impl Into<String>) -> Self {
        Self::InvalidRubric {
            message: message.into(),
        }
    }

    pub fn invalid_essay(message: impl Into<String>) -> Self {
        Self::InvalidEssay {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Attach the failing criterion id. Already-wrapped errors are left as-is.
    pub fn for_criterion(self, criterion_id: &str) -> Self {
        match self {
            e @ Self::Criterion { .. } => e,
            other => Self::Criterion {
                criterion_id: criterion_id.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn kind(&self) -> GradeErrorKind {
        match self {
            Self::Transport { .. } => GradeErrorKind::Transport,
            Self::Timeout { .. } => GradeErrorKind::Timeout,
            Self::Parse { .. } => GradeErrorKind::Parse,
            Self::SchemaViolation { .. } => GradeErrorKind::SchemaViolation,
            Self::InvalidRubric { .. } | Self::InvalidEssay { .. } => GradeErrorKind::InvalidInput,
            Self::Config { .. } => GradeErrorKind::Config,
            Self::Task { .. } => GradeErrorKind::Task,
            Self::Criterion { source, .. } => source.kind(),
        }
    }

    /// Raw judgment attached to a schema violation, if any.
    pub fn raw_judgment(&self) -> Option<&serde_json::Value> {
        match self {
            Self::SchemaViolation { raw, .. } => Some(raw),
            Self::Criterion { source, .. } => source.raw_judgment(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_wrapper_keeps_inner_kind() {
        let err = GradeError::Timeout { seconds: 5 }.for_criterion("thesis");
        assert_eq!(err.kind(), GradeErrorKind::Timeout);
        assert!(err.to_string().contains("criterion 'thesis' failed"));
    }

    #[test]
    fn wrapping_twice_is_noop() {
        let err = GradeError::transport("boom")
            .for_criterion("a")
            .for_criterion("b");
        match err {
            GradeError::Criterion { criterion_id, .. } => assert_eq!(criterion_id, "a"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn raw_judgment_reachable_through_wrapper() {
        let raw = serde_json::json!({"level": "Stellar"});
        let err = GradeError::schema("thesis", "level not in valid_levels", raw.clone())
            .for_criterion("thesis");
        assert_eq!(err.raw_judgment(), Some(&raw));
    }
}
