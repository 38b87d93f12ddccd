use crate::errors::GradeError;
use crate::judge::JudgeRuntimeConfig;
use crate::model::{Criterion, EvidenceSpan, ProcessedEssay};
use serde_json::Value;

pub(crate) const CRITERION_REQUIRED_KEYS: [&str; 8] = [
    "criterion_id",
    "valid_levels",
    "level",
    "justification",
    "evidence_spans",
    "actionable_suggestion",
    "refuse",
    "reason",
];

/// Batched items may omit `refuse` and `reason`.
pub(crate) const BATCH_REQUIRED_KEYS: [&str; 6] = [
    "criterion_id",
    "valid_levels",
    "level",
    "justification",
    "evidence_spans",
    "actionable_suggestion",
];

/// Justifications shorter than this never become a synthetic span.
const SYNTHETIC_MIN_JUSTIFICATION_CHARS: usize = 21;

/// One structurally valid judgment. `level` is not yet checked against the scale.
#[derive(Debug, Clone)]
pub(crate) struct Judgment {
    pub(crate) criterion_id: Option<String>,
    pub(crate) level: Option<String>,
    pub(crate) justification: Option<String>,
    pub(crate) evidence_spans: Vec<EvidenceSpan>,
    pub(crate) actionable_suggestion: Option<String>,
    pub(crate) refuse: bool,
    pub(crate) reason: Option<String>,
    pub(crate) raw: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct ConsistencyVerdict {
    pub(crate) low_confidence: bool,
    pub(crate) explanation: Option<String>,
}

fn opt_string(obj: &serde_json::Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(format!("'{key}' must be a string or null, got {other}")),
    }
}

/// Check the judgment envelope and filter its evidence.
pub(crate) fn parse_judgment(
    raw: Value,
    required: &[&str],
    criterion: &Criterion,
    essay: &ProcessedEssay,
    cfg: &JudgeRuntimeConfig,
) -> Result<Judgment, GradeError> {
    let violation = |msg: String, raw: &Value| GradeError::schema(&criterion.id, msg, raw.clone());

    let Some(obj) = raw.as_object() else {
        return Err(violation("judgment is not a JSON object".into(), &raw));
    };

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| !obj.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(violation(
            format!("missing required keys: {}", missing.join(", ")),
            &raw,
        ));
    }

    let refuse = match obj.get("refuse") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(violation(format!("'refuse' must be a boolean, got {other}"), &raw)),
    };

    let fields = (|| -> Result<_, String> {
        Ok((
            opt_string(obj, "criterion_id")?,
            opt_string(obj, "level")?,
            opt_string(obj, "justification")?,
            opt_string(obj, "actionable_suggestion")?,
            opt_string(obj, "reason")?,
        ))
    })();
    let (criterion_id, level, justification, actionable_suggestion, reason) =
        fields.map_err(|msg| violation(msg, &raw))?;

    if !refuse && level.is_none() {
        return Err(violation("'level' is null but 'refuse' is false".into(), &raw));
    }

    let spans = match obj.get("evidence_spans") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => {
            return Err(violation(
                format!("'evidence_spans' must be an array, got {other}"),
                &raw,
            ))
        }
    };

    let mut evidence_spans = filter_evidence(&spans, &criterion.id, essay, cfg);
    if evidence_spans.is_empty() {
        if let Some(span) = synthetic_span(justification.as_deref(), cfg.synthetic_quote_chars) {
            tracing::warn!(
                criterion = %criterion.id,
                "no evidence survived validation; using synthetic span from justification"
            );
            evidence_spans.push(span);
        }
    }

    Ok(Judgment {
        criterion_id,
        level,
        justification,
        evidence_spans,
        actionable_suggestion,
        refuse,
        reason,
        raw,
    })
}

/// Keep spans with an in-range paragraph index and a non-trivial quote.
/// Over-long quotes are cut to `max_span_chars`.
pub(crate) fn filter_evidence(
    spans: &[Value],
    criterion_id: &str,
    essay: &ProcessedEssay,
    cfg: &JudgeRuntimeConfig,
) -> Vec<EvidenceSpan> {
    let mut out = Vec::new();
    for span in spans {
        let index = span.get("paragraph_index").and_then(Value::as_u64);
        let quote = span.get("quote").and_then(Value::as_str).map(str::trim);
        let (Some(index), Some(quote)) = (index, quote) else {
            tracing::warn!(criterion = %criterion_id, span = %span, "dropping malformed evidence span");
            continue;
        };

        if quote.chars().count() < cfg.min_quote_chars {
            tracing::debug!(criterion = %criterion_id, quote, "dropping trivial evidence quote");
            continue;
        }

        let index = index as usize;
        if index >= essay.paragraphs.len() {
            tracing::warn!(
                criterion = %criterion_id,
                paragraph_index = index,
                paragraphs = essay.paragraphs.len(),
                "dropping evidence span with out-of-range paragraph index"
            );
            continue;
        }

        out.push(EvidenceSpan::verbatim(
            index,
            truncate_chars(quote, cfg.max_span_chars),
        ));
    }
    out
}

pub(crate) fn synthetic_span(justification: Option<&str>, cap: usize) -> Option<EvidenceSpan> {
    let text = justification?.trim();
    let len = text.chars().count();
    if len < SYNTHETIC_MIN_JUSTIFICATION_CHARS {
        return None;
    }
    let quote = if len > cap {
        format!("{}...", truncate_chars(text, cap))
    } else {
        text.to_string()
    };
    Some(EvidenceSpan::synthetic(quote))
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte, _)) => s[..byte].to_string(),
        None => s.to_string(),
    }
}

pub(crate) fn parse_consistency(raw: Value, criterion_id: &str) -> Result<ConsistencyVerdict, GradeError> {
    let low_confidence = match raw.get("low_confidence") {
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            let msg = format!("'low_confidence' must be a boolean, got {other}");
            return Err(GradeError::schema(criterion_id, msg, raw));
        }
        None => {
            return Err(GradeError::schema(
                criterion_id,
                "consistency check missing 'low_confidence'",
                raw,
            ))
        }
    };
    let explanation = raw
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(ConsistencyVerdict {
        low_confidence,
        explanation,
    })
}
