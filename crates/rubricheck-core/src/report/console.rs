use crate::model::{AgreementFlag, GradeSummary};
use crate::report::progress::{ProgressEvent, ProgressSink};
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Format a single progress line. Deterministic, unit-testable.
#[must_use]
pub fn format_progress_line(done: usize, total: usize) -> String {
    format!("Graded criterion {}/{}...", done, total)
}

/// Minimum interval between progress lines.
const PROGRESS_MIN_INTERVAL_MS: u64 = 200;

/// Progress sink that prints to stderr, throttled. Always emits the final event.
/// Returns `None` for single-criterion runs.
pub fn default_progress_sink(total: usize) -> Option<ProgressSink> {
    if total <= 1 {
        return None;
    }
    let last_emit: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));
    Some(Arc::new(move |ev: ProgressEvent| {
        let now = Instant::now();
        let should_emit = {
            let Ok(mut last) = last_emit.lock() else {
                return;
            };
            let interval_ok = last
                .map(|t| {
                    now.saturating_duration_since(t)
                        >= Duration::from_millis(PROGRESS_MIN_INTERVAL_MS)
                })
                .unwrap_or(true);
            let ok = ev.done == ev.total || interval_ok;
            if ok {
                *last = Some(now);
            }
            ok
        };
        if should_emit {
            eprintln!("{}", format_progress_line(ev.done, ev.total));
        }
    }))
}

fn flag_icon(flag: AgreementFlag, refused: bool) -> &'static str {
    if refused {
        return "⛔";
    }
    match flag {
        AgreementFlag::Ok => "✅",
        AgreementFlag::TieBreak => "⚖️ ",
        AgreementFlag::NeedsReview => "⚠️ ",
    }
}

/// Human-readable summary, one line per criterion plus a footer.
pub fn format_summary(summary: &GradeSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    for r in &summary.per_criterion {
        let level = r.level.as_deref().unwrap_or("REFUSED");
        let _ = write!(
            out,
            "{} {:<24} {:<12} [{}]",
            flag_icon(r.agreement_flag, r.refuse),
            r.criterion_id,
            level,
            r.agreement_flag.as_str()
        );
        if r.tie_break_used {
            let _ = write!(out, " (tie-break)");
        }
        if r.low_confidence {
            let _ = write!(out, " (low confidence)");
        }
        let _ = writeln!(out);
        if let Some(reason) = r.reason.as_deref().filter(|_| r.refuse) {
            let _ = writeln!(out, "    Reason: {reason}");
        }
        if let Some(s) = &r.actionable_suggestion {
            let _ = writeln!(out, "    Suggestion: {s}");
        }
        if r.has_synthetic_evidence() {
            let _ = writeln!(out, "    Evidence: synthetic (not quoted from the essay)");
        }
    }

    let _ = writeln!(out);
    match (summary.numeric_score, summary.letter.as_deref()) {
        (Some(score), Some(letter)) => {
            let _ = writeln!(out, "Score: {score:.2} ({letter})");
        }
        (Some(score), None) => {
            let _ = writeln!(out, "Score: {score:.2}");
        }
        _ => {}
    }
    if let Some(points) = summary.categorical_points {
        let _ = writeln!(out, "Categorical average: {points:.2}");
    }

    let flags = &summary.notes.flags;
    if flags.any() {
        let mut raised = Vec::new();
        if flags.any_refusals {
            raised.push("refusals");
        }
        if flags.any_low_confidence {
            raised.push("low confidence");
        }
        if flags.any_needs_review {
            raised.push("needs review");
        }
        let _ = writeln!(out, "Reliability: {}", raised.join(", "));
    }
    for w in &summary.notes.warnings {
        let _ = writeln!(out, "Warning: {w}");
    }
    out
}

pub fn print_summary(summary: &GradeSummary) {
    eprint!("{}", format_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CriterionResult, EvidenceSpan, GradeNotes, ReliabilityFlags};

    fn result(id: &str, level: Option<&str>, flag: AgreementFlag) -> CriterionResult {
        CriterionResult {
            criterion_id: id.into(),
            valid_levels: vec![],
            level: level.map(str::to_string),
            justification: None,
            evidence_spans: vec![],
            actionable_suggestion: Some("Add a counterargument.".into()),
            refuse: level.is_none(),
            reason: level.is_none().then(|| "ambiguous rubric".to_string()),
            low_confidence: false,
            consistency_explanation: None,
            agreement_flag: flag,
            tie_break_used: false,
        }
    }

    #[test]
    fn progress_line() {
        assert_eq!(format_progress_line(2, 5), "Graded criterion 2/5...");
        assert!(default_progress_sink(1).is_none());
        assert!(default_progress_sink(3).is_some());
    }

    #[test]
    fn summary_lists_criteria_and_flags() {
        let mut synthetic = result("evidence", Some("Fair"), AgreementFlag::NeedsReview);
        synthetic.evidence_spans.push(EvidenceSpan::synthetic("From the justification..."));
        let summary = GradeSummary {
            per_criterion: vec![
                result("thesis", Some("Good"), AgreementFlag::Ok),
                synthetic,
                result("style", None, AgreementFlag::NeedsReview),
            ],
            numeric_score: Some(77.5),
            letter: Some("B".into()),
            categorical_points: None,
            notes: GradeNotes {
                flags: ReliabilityFlags {
                    any_refusals: true,
                    any_low_confidence: false,
                    any_needs_review: true,
                },
                warnings: vec!["essay truncated to 50 paragraphs".into()],
                ..Default::default()
            },
        };
        let text = format_summary(&summary);
        assert!(text.contains("thesis"));
        assert!(text.contains("REFUSED"));
        assert!(text.contains("Reason: ambiguous rubric"));
        assert!(text.contains("Evidence: synthetic"));
        assert!(text.contains("Score: 77.50 (B)"));
        assert!(text.contains("Reliability: refusals, needs review"));
        assert!(text.contains("Warning: essay truncated"));
    }
}
