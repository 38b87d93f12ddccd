use crate::model::{AgreementFlag, Criterion};

/// Result of the scale-order fallback used on a three-way disagreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieBreakChoice {
    pub level: String,
    /// False when either level is missing from `valid_levels`; the first
    /// sample's level is kept and the choice is a data-quality problem.
    pub ranked: bool,
}

/// Prefer the better of two levels by position in `valid_levels` (lower index wins).
pub fn tie_break_choice(first: &str, second: &str, criterion: &Criterion) -> TieBreakChoice {
    match (criterion.rank_of(first), criterion.rank_of(second)) {
        (Some(a), Some(b)) => TieBreakChoice {
            level: if a <= b { first } else { second }.to_string(),
            ranked: true,
        },
        _ => TieBreakChoice {
            level: first.to_string(),
            ranked: false,
        },
    }
}

/// Flag exposed on a full-mode result.
///
/// `ok` only when the agreement stage resolved to `ok` and the result is
/// neither refused nor low-confidence. A disagreement always reads
/// `needs_review`; otherwise a refusal or low-confidence verdict reads
/// `tie_break` when the level came from the tie-break call, `needs_review` if not.
pub fn final_agreement_flag(
    stage: AgreementFlag,
    refused: bool,
    low_confidence: bool,
    tie_break_used: bool,
) -> AgreementFlag {
    if stage == AgreementFlag::NeedsReview {
        return AgreementFlag::NeedsReview;
    }
    if !refused && !low_confidence && stage == AgreementFlag::Ok {
        return AgreementFlag::Ok;
    }
    if tie_break_used {
        AgreementFlag::TieBreak
    } else {
        AgreementFlag::NeedsReview
    }
}
