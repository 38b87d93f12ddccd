//! Processed-essay loading.

use crate::errors::GradeError;
use crate::model::{EssayMetadata, ProcessedEssay};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ParagraphInput {
    Text(String),
    Object { text: String },
}

impl ParagraphInput {
    fn into_text(self) -> String {
        match self {
            ParagraphInput::Text(t) | ParagraphInput::Object { text: t } => t,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EssayDocument {
    paragraphs: Vec<ParagraphInput>,
    #[serde(default)]
    metadata: EssayMetadata,
    #[serde(default)]
    warnings: Vec<String>,
}

/// Parse a processed essay. Blank paragraphs are removed before indexing.
pub fn parse_essay(text: &str) -> Result<ProcessedEssay, GradeError> {
    let doc: EssayDocument = serde_json::from_str(text)
        .map_err(|e| GradeError::invalid_essay(format!("failed to parse essay JSON: {e}")))?;

    let paragraphs: Vec<String> = doc
        .paragraphs
        .into_iter()
        .map(ParagraphInput::into_text)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Err(GradeError::invalid_essay("essay has no non-empty paragraphs"));
    }

    let mut metadata = doc.metadata;
    if metadata.word_count == 0 {
        metadata.word_count = paragraphs.iter().map(|p| p.split_whitespace().count()).sum();
    }

    Ok(ProcessedEssay {
        paragraphs,
        metadata,
        warnings: doc.warnings,
    })
}

pub fn load_essay(path: &Path) -> Result<ProcessedEssay, GradeError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        GradeError::invalid_essay(format!("failed to read {}: {e}", path.display()))
    })?;
    let essay = parse_essay(&text)?;
    tracing::debug!(
        path = %path.display(),
        paragraphs = essay.paragraphs.len(),
        words = essay.metadata.word_count,
        "loaded essay"
    );
    Ok(essay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GradeErrorKind;

    #[test]
    fn mixed_paragraph_shapes_and_blanks() {
        let essay = parse_essay(
            r#"{
                "paragraphs": ["  First one. ", {"text": "Second one."}, "   ", {"text": ""}],
                "metadata": {"word_count": 4, "language": "en", "readability": 55.0,
                             "quote_char_ratio": 0.0, "section_count": 1},
                "warnings": ["pii redacted"]
            }"#,
        )
        .unwrap();
        assert_eq!(essay.paragraphs, vec!["First one.", "Second one."]);
        assert_eq!(essay.metadata.language, "en");
        assert_eq!(essay.warnings, vec!["pii redacted"]);
    }

    #[test]
    fn word_count_filled_when_absent() {
        let essay = parse_essay(r#"{"paragraphs": ["one two three", "four"]}"#).unwrap();
        assert_eq!(essay.metadata.word_count, 4);
    }

    #[test]
    fn empty_essay_rejected() {
        let err = parse_essay(r#"{"paragraphs": ["", "  "]}"#).unwrap_err();
        assert_eq!(err.kind(), GradeErrorKind::InvalidInput);
        assert!(parse_essay("not json").is_err());
    }
}
