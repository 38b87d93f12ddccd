//! Data contracts shared by the evaluator, the orchestrator and the aggregation engine.
//!
//! Inputs (`Criterion`, `Rubric`, `ProcessedEssay`) are produced by collaborators and
//! treated as immutable once handed to the core. Outputs (`CriterionResult`,
//! `GradeSummary`) are built once and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One dimension of a rubric with an ordered qualitative scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    pub id: String,
    pub name: String,
    /// Ordered best -> worst. Position is the tie-break order.
    pub valid_levels: Vec<String>,
    /// Level name -> descriptor text.
    #[serde(default)]
    pub descriptors: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_scale_note: Option<String>,
}

impl Criterion {
    /// Position of `level` on this criterion's scale (0 = best).
    pub fn rank_of(&self, level: &str) -> Option<usize> {
        self.valid_levels.iter().position(|l| l == level)
    }

    pub fn is_valid_level(&self, level: &str) -> bool {
        self.rank_of(level).is_some()
    }

    /// Descriptors in scale order, followed by any descriptor keyed by a level
    /// that is not on the scale.
    pub fn ordered_descriptors(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = self
            .valid_levels
            .iter()
            .filter_map(|l| {
                self.descriptors
                    .get(l)
                    .map(|d| (l.as_str(), d.as_str()))
            })
            .collect();
        for (k, v) in &self.descriptors {
            if !self.valid_levels.contains(k) {
                out.push((k.as_str(), v.as_str()));
            }
        }
        out
    }
}

/// Closed numeric interval mapped to a letter grade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LetterBand {
    pub min: f64,
    pub max: f64,
    pub letter: String,
}

impl LetterBand {
    pub fn new(min: f64, max: f64, letter: impl Into<String>) -> Self {
        Self {
            min,
            max,
            letter: letter.into(),
        }
    }

    pub fn contains(&self, score: f64) -> bool {
        self.min <= score && score <= self.max
    }
}

/// Grading configuration attached to a rubric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RubricGradingConfig {
    /// Compute the weighted numeric score (and letter).
    pub numeric: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub letter_bands: Vec<LetterBand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorical_points_map: Option<BTreeMap<String, f64>>,
    /// Also report the categorical average when `numeric` is on.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub categorical_alongside: bool,
    /// Level name -> numeric anchor. Replaces the built-in 100/85/70/55 table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_anchors: Option<BTreeMap<String, f64>>,
}

/// A parsed rubric: criteria in presentation order plus grading configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rubric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub grading: RubricGradingConfig,
}

impl Rubric {
    pub fn criterion(&self, id: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == id)
    }
}

/// Metadata computed by the essay preprocessor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EssayMetadata {
    pub word_count: usize,
    pub language: String,
    /// Flesch reading ease, when the preprocessor could compute it.
    pub readability: Option<f64>,
    /// Fraction of characters inside quotations, 0.0..=1.0.
    pub quote_char_ratio: f64,
    pub section_count: usize,
}

/// Paragraph-indexed essay. Indices are stable and referenced by evidence spans.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProcessedEssay {
    pub paragraphs: Vec<String>,
    #[serde(default)]
    pub metadata: EssayMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProcessedEssay {
    pub fn paragraph(&self, index: usize) -> Option<&str> {
        self.paragraphs.get(index).map(String::as_str)
    }

    /// Keep at most `max` paragraphs. Returns true when paragraphs were dropped.
    pub fn truncate_paragraphs(&mut self, max: usize) -> bool {
        if self.paragraphs.len() > max {
            self.paragraphs.truncate(max);
            true
        } else {
            false
        }
    }
}

/// Where an evidence quote came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceProvenance {
    /// Quoted by the judge against a paragraph index.
    #[default]
    Verbatim,
    /// Built from the justification because no quote survived validation.
    /// Not guaranteed to appear in the essay.
    Synthetic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceSpan {
    /// `None` for synthetic spans, whose location is unknown.
    pub paragraph_index: Option<usize>,
    pub quote: String,
    #[serde(default)]
    pub provenance: EvidenceProvenance,
}

impl EvidenceSpan {
    pub fn verbatim(paragraph_index: usize, quote: impl Into<String>) -> Self {
        Self {
            paragraph_index: Some(paragraph_index),
            quote: quote.into(),
            provenance: EvidenceProvenance::Verbatim,
        }
    }

    pub fn synthetic(quote: impl Into<String>) -> Self {
        Self {
            paragraph_index: None,
            quote: quote.into(),
            provenance: EvidenceProvenance::Synthetic,
        }
    }
}

/// Reliability signal summarizing whether independent judgments converged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgreementFlag {
    #[default]
    Ok,
    NeedsReview,
    TieBreak,
}

impl AgreementFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            AgreementFlag::Ok => "ok",
            AgreementFlag::NeedsReview => "needs_review",
            AgreementFlag::TieBreak => "tie_break",
        }
    }
}

/// Outcome of evaluating one criterion.
///
/// When `refuse` is false, `level` is always a member of `valid_levels`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionResult {
    pub criterion_id: String,
    pub valid_levels: Vec<String>,
    pub level: Option<String>,
    pub justification: Option<String>,
    pub evidence_spans: Vec<EvidenceSpan>,
    pub actionable_suggestion: Option<String>,
    pub refuse: bool,
    pub reason: Option<String>,
    pub low_confidence: bool,
    pub consistency_explanation: Option<String>,
    pub agreement_flag: AgreementFlag,
    pub tie_break_used: bool,
}

impl CriterionResult {
    pub fn has_synthetic_evidence(&self) -> bool {
        self.evidence_spans
            .iter()
            .any(|s| s.provenance == EvidenceProvenance::Synthetic)
    }
}

/// Reliability flags across all criteria. Informational only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReliabilityFlags {
    pub any_refusals: bool,
    pub any_low_confidence: bool,
    pub any_needs_review: bool,
}

impl ReliabilityFlags {
    pub fn any(&self) -> bool {
        self.any_refusals || self.any_low_confidence || self.any_needs_review
    }
}

/// Echo of the essay metadata the grade was produced against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EssayMetadataNote {
    pub essay_length: usize,
    pub language: String,
    pub readability_score: Option<f64>,
    pub quote_char_ratio: f64,
    pub section_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<&ProcessedEssay> for EssayMetadataNote {
    fn from(essay: &ProcessedEssay) -> Self {
        Self {
            essay_length: essay.metadata.word_count,
            language: essay.metadata.language.clone(),
            readability_score: essay.metadata.readability,
            quote_char_ratio: essay.metadata.quote_char_ratio,
            section_count: essay.metadata.section_count,
            warnings: essay.warnings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Provenance {
    pub mode: String,
    pub batched: bool,
    pub model: Option<String>,
    pub rubric_sha256: String,
    pub essay_sha256: String,
}

/// Notes bag attached to a summary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GradeNotes {
    #[serde(flatten)]
    pub flags: ReliabilityFlags,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essay_metadata: Option<EssayMetadataNote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Final grade for one essay against one rubric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GradeSummary {
    /// Same order as `rubric.criteria`; may be shorter in batched mode.
    pub per_criterion: Vec<CriterionResult>,
    pub numeric_score: Option<f64>,
    pub letter: Option<String>,
    pub categorical_points: Option<f64>,
    pub notes: GradeNotes,
}
