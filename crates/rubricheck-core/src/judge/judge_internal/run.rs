use super::prompt::{self, VARIANT_A, VARIANT_B, VARIANT_TIE_BREAK};
use super::validate::{self, Judgment, CRITERION_REQUIRED_KEYS};
use crate::errors::GradeError;
use crate::judge::{reliability, GradingMode, JudgeService};
use crate::model::{AgreementFlag, Criterion, CriterionResult, ProcessedEssay};
use serde_json::Value;
use tracing::Instrument;

pub(crate) async fn evaluate_impl(
    svc: &JudgeService,
    criterion: &Criterion,
    essay: &ProcessedEssay,
) -> Result<CriterionResult, GradeError> {
    let span = tracing::info_span!(
        "criterion",
        id = %criterion.id,
        mode = svc.config.mode.as_str(),
        level = tracing::field::Empty,
        agreement = tracing::field::Empty,
    );
    let fut = async {
        let result = match svc.config.mode {
            GradingMode::Fast => evaluate_fast(svc, criterion, essay).await,
            GradingMode::Full => evaluate_full(svc, criterion, essay).await,
        }?;
        let current = tracing::Span::current();
        current.record("level", result.level.as_deref().unwrap_or("-"));
        current.record("agreement", result.agreement_flag.as_str());
        Ok::<_, GradeError>(result)
    };
    fut.instrument(span)
        .await
        .map_err(|e| e.for_criterion(&criterion.id))
}

async fn sample(
    svc: &JudgeService,
    criterion: &Criterion,
    essay: &ProcessedEssay,
    system: &str,
    prompt: &str,
) -> Result<Judgment, GradeError> {
    let raw = svc.oracle.judge(system, prompt).await?;
    validate::parse_judgment(raw, &CRITERION_REQUIRED_KEYS, criterion, essay, &svc.config)
}

async fn evaluate_fast(
    svc: &JudgeService,
    criterion: &Criterion,
    essay: &ProcessedEssay,
) -> Result<CriterionResult, GradeError> {
    let system = prompt::system_prompt(svc.config.max_span_chars);
    let base = prompt::criterion_prompt(criterion, essay, svc.config.max_span_chars);
    let judgment = sample(svc, criterion, essay, &system, &base).await?;

    let mut result = into_result(criterion, judgment);
    result.agreement_flag = AgreementFlag::Ok;
    finalize(criterion, result)
}

async fn evaluate_full(
    svc: &JudgeService,
    criterion: &Criterion,
    essay: &ProcessedEssay,
) -> Result<CriterionResult, GradeError> {
    let system = prompt::system_prompt(svc.config.max_span_chars);
    let base = prompt::criterion_prompt(criterion, essay, svc.config.max_span_chars);

    let out1 = sample(svc, criterion, essay, &system, &prompt::variant_prompt(&base, VARIANT_A)).await?;
    let out2 = sample(svc, criterion, essay, &system, &prompt::variant_prompt(&base, VARIANT_B)).await?;

    let mut stage = AgreementFlag::Ok;
    let mut tie_break_used = false;

    let chosen = if out1.refuse || out2.refuse {
        tracing::info!(criterion = %criterion.id, "judge refused; skipping agreement stage");
        let reason = out1.reason.clone().or_else(|| out2.reason.clone());
        Judgment {
            refuse: true,
            reason,
            ..out1
        }
    } else if out1.level != out2.level {
        stage = AgreementFlag::NeedsReview;
        let lvl1 = out1.level.clone().unwrap_or_default();
        let lvl2 = out2.level.clone().unwrap_or_default();
        tracing::info!(criterion = %criterion.id, first = %lvl1, second = %lvl2, "samples disagree; running tie-break");

        let out3 = sample(
            svc,
            criterion,
            essay,
            &system,
            &prompt::variant_prompt(&base, VARIANT_TIE_BREAK),
        )
        .await?;

        // A refusing tie-break still settles on its level; the refusal rides along.
        let settles = matches!(out3.level.as_deref(), Some(l3) if l3 == lvl1 || l3 == lvl2);
        if settles {
            stage = AgreementFlag::Ok;
            tie_break_used = true;
            out3
        } else {
            let choice = reliability::tie_break_choice(&lvl1, &lvl2, criterion);
            if !choice.ranked {
                tracing::warn!(
                    criterion = %criterion.id,
                    first = %lvl1,
                    second = %lvl2,
                    "tie-break level not on the criterion scale; keeping first sample"
                );
            }
            Judgment {
                level: Some(choice.level),
                ..out1
            }
        }
    } else {
        out1
    };

    let evidence = serde_json::to_value(&chosen.evidence_spans)
        .map_err(|e| GradeError::schema(&criterion.id, e.to_string(), chosen.raw.clone()))?;
    let check_prompt = prompt::consistency_prompt(
        criterion,
        chosen.level.as_deref(),
        chosen.justification.as_deref(),
        &evidence,
    );
    let raw = svc
        .oracle
        .judge(prompt::VALIDATOR_SYSTEM_PROMPT, &check_prompt)
        .await?;
    let verdict = validate::parse_consistency(raw, &criterion.id)?;

    let mut result = into_result(criterion, chosen);
    result.low_confidence = verdict.low_confidence;
    result.consistency_explanation = verdict.explanation;
    result.tie_break_used = tie_break_used;
    result.agreement_flag =
        reliability::final_agreement_flag(stage, result.refuse, result.low_confidence, tie_break_used);
    finalize(criterion, result)
}

/// Identity comes from the rubric criterion, not from the judge's echo.
pub(crate) fn into_result(criterion: &Criterion, judgment: Judgment) -> CriterionResult {
    if let Some(echo) = judgment.criterion_id.as_deref() {
        if echo != criterion.id {
            tracing::warn!(criterion = %criterion.id, echoed = %echo, "judge echoed a different criterion_id");
        }
    }
    CriterionResult {
        criterion_id: criterion.id.clone(),
        valid_levels: criterion.valid_levels.clone(),
        level: judgment.level,
        justification: judgment.justification,
        evidence_spans: judgment.evidence_spans,
        actionable_suggestion: judgment.actionable_suggestion,
        refuse: judgment.refuse,
        reason: judgment.reason,
        low_confidence: false,
        consistency_explanation: None,
        agreement_flag: AgreementFlag::Ok,
        tie_break_used: false,
    }
}

/// Enforce scale membership on the level that will be reported.
pub(crate) fn finalize(
    criterion: &Criterion,
    mut result: CriterionResult,
) -> Result<CriterionResult, GradeError> {
    let off_scale = result
        .level
        .as_deref()
        .filter(|l| !criterion.is_valid_level(l))
        .map(str::to_string);

    match (off_scale, result.refuse) {
        (Some(_), true) => result.level = None,
        (Some(level), false) => {
            let raw = serde_json::to_value(&result)
                .map_err(|e| GradeError::schema(&criterion.id, e.to_string(), Value::Null))?;
            return Err(GradeError::schema(
                &criterion.id,
                format!("level '{level}' is not one of {:?}", criterion.valid_levels),
                raw,
            ));
        }
        (None, false) if result.level.is_none() => {
            return Err(GradeError::schema(
                &criterion.id,
                "no level and no refusal",
                Value::Null,
            ));
        }
        _ => {}
    }
    Ok(result)
}
