//! Aggregation engine: criterion results + grading config -> score, letter, categorical average.
//!
//! Everything here is a pure function of its inputs.

use crate::model::{
    AgreementFlag, CriterionResult, LetterBand, ReliabilityFlags, Rubric, RubricGradingConfig,
};
use std::collections::BTreeMap;

/// Fallback numeric anchors, best tier first.
pub const DEFAULT_NUMERIC_ANCHORS: [(&str, f64); 4] =
    [("Excellent", 100.0), ("Good", 85.0), ("Fair", 70.0), ("Poor", 55.0)];

pub const DEFAULT_CATEGORICAL_POINTS: [(&str, f64); 4] =
    [("Excellent", 4.0), ("Good", 3.0), ("Fair", 2.0), ("Poor", 1.0)];

/// Numeric, letter and categorical outputs of one aggregation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Aggregate {
    pub numeric_score: Option<f64>,
    pub letter: Option<String>,
    pub categorical_points: Option<f64>,
    pub flags: ReliabilityFlags,
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn anchor_for(level: &str, grading: &RubricGradingConfig) -> Option<f64> {
    match &grading.numeric_anchors {
        Some(map) => map.get(level).copied(),
        None => DEFAULT_NUMERIC_ANCHORS
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, v)| *v),
    }
}

fn points_for(level: &str, grading: &RubricGradingConfig) -> Option<f64> {
    match &grading.categorical_points_map {
        Some(map) => map.get(level).copied(),
        None => DEFAULT_CATEGORICAL_POINTS
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, v)| *v),
    }
}

/// Per-criterion weights. If any criterion lacks a weight, every criterion weighs 1.0.
pub fn effective_weights(rubric: &Rubric) -> BTreeMap<&str, f64> {
    let all_weighted = rubric.criteria.iter().all(|c| c.weight.is_some());
    rubric
        .criteria
        .iter()
        .map(|c| {
            let w = if all_weighted {
                c.weight.unwrap_or(1.0)
            } else {
                1.0
            };
            (c.id.as_str(), w)
        })
        .collect()
}

/// Weighted mean of mapped anchors, rounded to 2 decimals.
///
/// Only criteria whose level maps to an anchor enter numerator and denominator.
/// `None` when nothing mapped.
pub fn weighted_numeric_score(results: &[CriterionResult], rubric: &Rubric) -> Option<f64> {
    let weights = effective_weights(rubric);
    let mut total = 0.0;
    let mut weight_sum = 0.0;

    for r in results {
        let Some(level) = r.level.as_deref() else {
            continue;
        };
        let Some(anchor) = anchor_for(level, &rubric.grading) else {
            tracing::debug!(criterion = %r.criterion_id, level, "level has no numeric anchor");
            continue;
        };
        let w = weights.get(r.criterion_id.as_str()).copied().unwrap_or(1.0);
        total += anchor * w;
        weight_sum += w;
    }

    (weight_sum > 0.0).then(|| round2(total / weight_sum))
}

/// First band whose inclusive range contains `score`. Bands are scanned in the given order.
pub fn letter_for(score: f64, bands: &[LetterBand]) -> Option<String> {
    bands
        .iter()
        .find(|b| b.contains(score))
        .map(|b| b.letter.clone())
}

/// Unweighted mean of mapped categorical points, rounded to 2 decimals.
pub fn categorical_average(
    results: &[CriterionResult],
    grading: &RubricGradingConfig,
) -> Option<f64> {
    let points: Vec<f64> = results
        .iter()
        .filter_map(|r| r.level.as_deref())
        .filter_map(|l| points_for(l, grading))
        .collect();
    if points.is_empty() {
        return None;
    }
    Some(round2(points.iter().sum::<f64>() / points.len() as f64))
}

pub fn reliability_flags(results: &[CriterionResult]) -> ReliabilityFlags {
    ReliabilityFlags {
        any_refusals: results.iter().any(|r| r.refuse),
        any_low_confidence: results.iter().any(|r| r.low_confidence),
        any_needs_review: results
            .iter()
            .any(|r| r.agreement_flag != AgreementFlag::Ok),
    }
}

pub fn aggregate(results: &[CriterionResult], rubric: &Rubric) -> Aggregate {
    let grading = &rubric.grading;

    let numeric_score = if grading.numeric {
        weighted_numeric_score(results, rubric)
    } else {
        None
    };
    let letter = numeric_score.and_then(|s| letter_for(s, &grading.letter_bands));
    let categorical_points = if !grading.numeric || grading.categorical_alongside {
        categorical_average(results, grading)
    } else {
        None
    };

    Aggregate {
        numeric_score,
        letter,
        categorical_points,
        flags: reliability_flags(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Criterion;

    fn criterion(id: &str, weight: Option<f64>) -> Criterion {
        Criterion {
            id: id.into(),
            name: id.into(),
            valid_levels: vec![
                "Excellent".into(),
                "Good".into(),
                "Fair".into(),
                "Poor".into(),
            ],
            descriptors: Default::default(),
            weight,
            level_scale_note: None,
        }
    }

    fn result(id: &str, level: Option<&str>) -> CriterionResult {
        CriterionResult {
            criterion_id: id.into(),
            valid_levels: vec![],
            level: level.map(str::to_string),
            justification: None,
            evidence_spans: vec![],
            actionable_suggestion: None,
            refuse: level.is_none(),
            reason: None,
            low_confidence: false,
            consistency_explanation: None,
            agreement_flag: AgreementFlag::Ok,
            tie_break_used: false,
        }
    }

    fn rubric(criteria: Vec<Criterion>, numeric: bool) -> Rubric {
        Rubric {
            title: None,
            criteria,
            grading: RubricGradingConfig {
                numeric,
                ..Default::default()
            },
        }
    }

    #[test]
    fn weighted_mean_uses_declared_weights() {
        let r = rubric(vec![criterion("a", Some(0.25)), criterion("b", Some(0.75))], true);
        let results = [result("a", Some("Excellent")), result("b", Some("Fair"))];
        assert_eq!(weighted_numeric_score(&results, &r), Some(77.5));
    }

    #[test]
    fn one_missing_weight_resets_all() {
        let r = rubric(vec![criterion("a", Some(0.25)), criterion("b", None)], true);
        let w = effective_weights(&r);
        assert_eq!(w["a"], 1.0);
        assert_eq!(w["b"], 1.0);

        let results = [result("a", Some("Excellent")), result("b", Some("Fair"))];
        assert_eq!(weighted_numeric_score(&results, &r), Some(85.0));
    }

    #[test]
    fn refused_and_unmapped_levels_do_not_count() {
        let r = rubric(vec![criterion("a", None), criterion("b", None), criterion("c", None)], true);
        let results = [
            result("a", Some("Good")),
            result("b", None),
            result("c", Some("Proficient")),
        ];
        assert_eq!(weighted_numeric_score(&results, &r), Some(85.0));

        let nothing = [result("a", None), result("c", Some("Proficient"))];
        assert_eq!(weighted_numeric_score(&nothing, &r), None);
    }

    #[test]
    fn letter_at_band_edge() {
        let bands = vec![LetterBand::new(90.0, 100.0, "A+"), LetterBand::new(0.0, 89.99, "B")];
        assert_eq!(letter_for(89.99, &bands).as_deref(), Some("B"));
        assert_eq!(letter_for(90.0, &bands).as_deref(), Some("A+"));
        assert_eq!(letter_for(89.995, &bands), None);
    }

    #[test]
    fn two_good_criteria_score_85() {
        let mut r = rubric(vec![criterion("a", Some(0.5)), criterion("b", Some(0.5))], true);
        r.grading.letter_bands = vec![
            LetterBand::new(90.0, 100.0, "A+"),
            LetterBand::new(85.0, 89.99, "A"),
            LetterBand::new(0.0, 84.99, "B"),
        ];
        let results = [result("a", Some("Good")), result("b", Some("Good"))];
        let agg = aggregate(&results, &r);
        assert_eq!(agg.numeric_score, Some(85.0));
        assert_eq!(agg.letter.as_deref(), Some("A"));
        assert_eq!(agg.categorical_points, None);
    }

    #[test]
    fn categorical_when_not_numeric() {
        let r = rubric(vec![criterion("a", None), criterion("b", None)], false);
        let results = [result("a", Some("Excellent")), result("b", Some("Fair"))];
        let agg = aggregate(&results, &r);
        assert_eq!(agg.numeric_score, None);
        assert_eq!(agg.letter, None);
        assert_eq!(agg.categorical_points, Some(3.0));
    }

    #[test]
    fn custom_maps_override_defaults() {
        let mut r = rubric(vec![criterion("a", None)], true);
        r.grading.numeric_anchors = Some([("Proficient".to_string(), 80.0)].into_iter().collect());
        r.grading.categorical_points_map =
            Some([("Proficient".to_string(), 3.0)].into_iter().collect());
        r.grading.categorical_alongside = true;
        let results = [result("a", Some("Proficient"))];
        let agg = aggregate(&results, &r);
        assert_eq!(agg.numeric_score, Some(80.0));
        assert_eq!(agg.categorical_points, Some(3.0));
    }

    #[test]
    fn flags_or_across_criteria() {
        let mut a = result("a", Some("Good"));
        a.low_confidence = true;
        let mut b = result("b", Some("Good"));
        b.agreement_flag = AgreementFlag::TieBreak;
        let flags = reliability_flags(&[a, b]);
        assert!(!flags.any_refusals);
        assert!(flags.any_low_confidence);
        assert!(flags.any_needs_review);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let r = rubric(vec![criterion("a", Some(1.0)), criterion("b", Some(2.0))], true);
        let results = [result("a", Some("Good")), result("b", Some("Poor"))];
        let first = aggregate(&results, &r);
        for _ in 0..5 {
            assert_eq!(aggregate(&results, &r), first);
        }
        assert_eq!(first.numeric_score, Some(65.0));
    }
}
