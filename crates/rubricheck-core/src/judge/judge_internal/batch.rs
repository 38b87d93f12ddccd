use super::prompt;
use super::run::{finalize, into_result};
use super::validate::{self, BATCH_REQUIRED_KEYS};
use crate::errors::GradeError;
use crate::judge::{BatchOutcome, JudgeService};
use crate::model::{ProcessedEssay, Rubric};
use serde_json::Value;
use tracing::Instrument;

/// Key under which the batched reply lists one item per criterion.
const RESULTS_KEY: &str = "criteria_results";

pub(crate) async fn evaluate_batched_impl(
    svc: &JudgeService,
    rubric: &Rubric,
    essay: &ProcessedEssay,
) -> Result<BatchOutcome, GradeError> {
    let span = tracing::info_span!("batched", criteria = rubric.criteria.len());
    async {
        let system = prompt::system_prompt(svc.config.max_span_chars);
        let user = prompt::batched_prompt(rubric, essay, svc.config.max_span_chars);
        let raw = svc.oracle.judge(&system, &user).await?;
        map_batched(svc, rubric, essay, raw)
    }
    .instrument(span)
    .await
}

/// Items map to criteria by position. Surplus items are ignored; missing
/// positions produce a warning and no result.
fn map_batched(
    svc: &JudgeService,
    rubric: &Rubric,
    essay: &ProcessedEssay,
    raw: Value,
) -> Result<BatchOutcome, GradeError> {
    let items = match raw.get(RESULTS_KEY) {
        Some(Value::Array(items)) => items.clone(),
        _ => {
            return Err(GradeError::schema(
                "*",
                format!("batched reply has no '{RESULTS_KEY}' array"),
                raw,
            ))
        }
    };

    let mut outcome = BatchOutcome::default();

    if items.len() > rubric.criteria.len() {
        let msg = format!(
            "batched reply had {} items for {} criteria; extra items ignored",
            items.len(),
            rubric.criteria.len()
        );
        tracing::warn!("{msg}");
        outcome.warnings.push(msg);
    }

    let mut items = items.into_iter();
    for criterion in &rubric.criteria {
        let Some(item) = items.next() else {
            let msg = format!("no batched result for criterion '{}'", criterion.id);
            tracing::warn!(criterion = %criterion.id, "missing from batched reply");
            outcome.missing.push(criterion.id.clone());
            outcome.warnings.push(msg);
            continue;
        };

        let judgment =
            validate::parse_judgment(item, &BATCH_REQUIRED_KEYS, criterion, essay, &svc.config)?;
        let result = finalize(criterion, into_result(criterion, judgment))?;
        outcome.results.push(result);
    }

    Ok(outcome)
}
