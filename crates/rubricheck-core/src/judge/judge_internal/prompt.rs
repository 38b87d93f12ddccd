use super::validate::{BATCH_REQUIRED_KEYS, CRITERION_REQUIRED_KEYS};
use crate::model::{Criterion, ProcessedEssay, Rubric};
use serde_json::json;
use std::fmt::Write as _;

pub(crate) const VARIANT_A: &str = "A";
pub(crate) const VARIANT_B: &str = "B";
pub(crate) const VARIANT_TIE_BREAK: &str = "TIE_BREAK";

pub(crate) const VALIDATOR_SYSTEM_PROMPT: &str = "You are a strict JSON validator.";

pub(crate) fn system_prompt(max_span_chars: usize) -> String {
    format!(
        "You are RubriCheck, an AI grader that provides detailed analysis with evidence spans.\n\
         Rules:\n\
         - Only quote text present in the essay. Do not fabricate citations.\n\
         - For evidence, find relevant excerpts (<= {max_span_chars} characters per excerpt) and include paragraph indices.\n\
         - Provide 2-4 evidence spans per criterion when possible, including both positive and negative evidence.\n\
         - Use complete sentences or meaningful phrases for evidence, not single words or fragments.\n\
         - If the rubric content for this criterion is ambiguous or self-contradictory, REFUSE with \"refuse\": true and a \"reason\", using the exact JSON schema.\n\
         - Provide specific justifications that reference the evidence spans.\n\
         - Give one concrete, actionable suggestion that addresses the evidence found.\n\
         - Output MUST be valid JSON with the exact keys specified, no extra keys, no prose outside JSON.\n"
    )
}

fn essay_block(essay: &ProcessedEssay) -> String {
    essay
        .paragraphs
        .iter()
        .enumerate()
        .map(|(i, p)| format!("[{i}] {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn metadata_block(essay: &ProcessedEssay) -> String {
    let m = &essay.metadata;
    let readability = m
        .readability
        .map(|r| format!("{r:.1} (Flesch Reading Ease)"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "ESSAY METADATA\n\
         - Word count: {}\n\
         - Language: {}\n\
         - Readability: {}\n\
         - Quote ratio: {:.1}%\n\
         - Sections: {}\n",
        m.word_count,
        if m.language.is_empty() { "unknown" } else { m.language.as_str() },
        readability,
        m.quote_char_ratio * 100.0,
        m.section_count
    )
}

fn descriptor_block(criterion: &Criterion) -> String {
    criterion
        .ordered_descriptors()
        .into_iter()
        .map(|(level, text)| format!("- {level}: {text}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn criterion_header(criterion: &Criterion) -> String {
    format!(
        "- criterion_id: {}\n\
         - name: {}\n\
         - valid_levels (choose EXACTLY one): {}\n\
         - level scale note: {}\n",
        criterion.id,
        criterion.name,
        json!(criterion.valid_levels),
        criterion.level_scale_note.as_deref().unwrap_or("")
    )
}

pub(crate) fn criterion_prompt(
    criterion: &Criterion,
    essay: &ProcessedEssay,
    max_span_chars: usize,
) -> String {
    format!(
        "You will grade ONE criterion only.\n\n\
         CRITERION\n{header}\n\
         DESCRIPTORS (for this criterion only)\n{descriptors}\n\n\
         {metadata}\n\
         ESSAY (paragraph-indexed)\n{essay}\n\n\
         REQUIREMENTS\n\
         1) Return STRICT JSON with EXACTLY these keys (no others):\n{keys}\n\
         2) \"valid_levels\": repeat the list above for transparency.\n\
         3) \"level\": MUST be one of valid_levels. If unsure or the rubric is ambiguous, set \"refuse\"=true and fill \"reason\".\n\
         4) \"justification\": 1-3 sentences explaining why the chosen level matches the descriptor.\n\
         5) \"evidence_spans\": array of objects, each with:\n\
         \x20  - \"paragraph_index\" (integer)\n\
         \x20  - \"quote\" (string, <= {max_span_chars} chars, must appear verbatim in that paragraph)\n\
         6) \"actionable_suggestion\": one concrete, specific improvement step for this criterion.\n\
         7) Never invent content; only quote from the essay paragraphs provided.\n\
         8) Consider the essay metadata in your evaluation.\n\n\
         Return ONLY the JSON object, no commentary.\n",
        header = criterion_header(criterion),
        descriptors = descriptor_block(criterion),
        metadata = metadata_block(essay),
        essay = essay_block(essay),
        keys = json!(CRITERION_REQUIRED_KEYS),
    )
}

/// Same semantics as `base`, with a trailing tag so repeated calls are not identical.
pub(crate) fn variant_prompt(base: &str, variant_tag: &str) -> String {
    format!(
        "{base}\n# variant_tag: {variant_tag}\n\
         Note: Verify factual quotes strictly; do not exceed span length.\n"
    )
}

/// Self-check prompt. Sees the descriptors and the chosen judgment, not the essay.
pub(crate) fn consistency_prompt(
    criterion: &Criterion,
    level: Option<&str>,
    justification: Option<&str>,
    evidence: &serde_json::Value,
) -> String {
    format!(
        "You are verifying rubric consistency for ONE criterion.\n\n\
         CRITERION DESCRIPTORS\n{descriptors}\n\n\
         MODEL CHOICE\n\
         - level: {level}\n\
         - justification: {justification}\n\
         - evidence_spans: {evidence}\n\n\
         TASK\n\
         Explain why (or why not) the chosen level matches the descriptor language.\n\
         If you find contradiction or weak alignment, set \"low_confidence\": true and explain briefly; else \"low_confidence\": false.\n\
         Output JSON ONLY with keys: [\"low_confidence\", \"explanation\"].\n",
        descriptors = descriptor_block(criterion),
        level = level.unwrap_or("null"),
        justification = justification.unwrap_or(""),
    )
}

pub(crate) fn batched_prompt(rubric: &Rubric, essay: &ProcessedEssay, max_span_chars: usize) -> String {
    let mut criteria = String::new();
    for (i, c) in rubric.criteria.iter().enumerate() {
        let _ = write!(
            criteria,
            "\nCRITERION {}\n{}\nDESCRIPTORS (for this criterion only)\n{}\n",
            i + 1,
            criterion_header(c),
            descriptor_block(c)
        );
    }

    format!(
        "You will grade ALL criteria for this essay in a single response.\n\
         {criteria}\n\
         {metadata}\n\
         ESSAY (paragraph-indexed)\n{essay}\n\n\
         REQUIREMENTS\n\
         1) Return STRICT JSON with an array called \"criteria_results\", one item per criterion, in the order listed above.\n\
         2) Each item must have EXACTLY these keys: {keys}, plus \"refuse\" (bool) and \"reason\" (string or null).\n\
         3) \"level\" must be one of that criterion's valid_levels.\n\
         4) \"evidence_spans\": 2-4 objects with \"paragraph_index\" (integer) and \"quote\" (string, <= {max_span_chars} chars, verbatim).\n\
         5) Include both positive and negative evidence; use complete sentences or meaningful phrases.\n\
         6) Never invent content; only quote from the essay paragraphs provided.\n\n\
         Return ONLY the JSON object, no commentary.\n",
        metadata = metadata_block(essay),
        essay = essay_block(essay),
        keys = json!(BATCH_REQUIRED_KEYS),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EssayMetadata;

    fn essay() -> ProcessedEssay {
        ProcessedEssay {
            paragraphs: vec!["First paragraph.".into(), "Second paragraph.".into()],
            metadata: EssayMetadata {
                word_count: 4,
                language: "en".into(),
                readability: Some(61.234),
                quote_char_ratio: 0.125,
                section_count: 1,
            },
            warnings: vec![],
        }
    }

    fn criterion() -> Criterion {
        Criterion {
            id: "thesis".into(),
            name: "Thesis & Focus".into(),
            valid_levels: vec!["Excellent".into(), "Poor".into()],
            descriptors: [
                ("Poor".to_string(), "No thesis".to_string()),
                ("Excellent".to_string(), "Clear thesis".to_string()),
            ]
            .into_iter()
            .collect(),
            weight: None,
            level_scale_note: Some("Excellent > Poor".into()),
        }
    }

    #[test]
    fn criterion_prompt_indexes_paragraphs_and_metadata() {
        let p = criterion_prompt(&criterion(), &essay(), 120);
        assert!(p.contains("[0] First paragraph."));
        assert!(p.contains("[1] Second paragraph."));
        assert!(p.contains("Readability: 61.2"));
        assert!(p.contains("Quote ratio: 12.5%"));
        assert!(p.contains("<= 120 chars"));
        assert!(p.contains(r#"["Excellent","Poor"]"#));
        // descriptors follow scale order, not map order
        let ex = p.find("- Excellent: Clear thesis").unwrap();
        let po = p.find("- Poor: No thesis").unwrap();
        assert!(ex < po);
    }

    #[test]
    fn variants_only_append() {
        let base = "BASE";
        let a = variant_prompt(base, VARIANT_A);
        let b = variant_prompt(base, VARIANT_B);
        assert!(a.starts_with(base) && b.starts_with(base));
        assert_ne!(a, b);
        assert!(variant_prompt(base, VARIANT_TIE_BREAK).contains("# variant_tag: TIE_BREAK"));
    }

    #[test]
    fn consistency_prompt_never_sees_essay() {
        let p = consistency_prompt(
            &criterion(),
            Some("Excellent"),
            Some("Strong thesis."),
            &serde_json::json!([]),
        );
        assert!(!p.contains("First paragraph."));
        assert!(p.contains("- level: Excellent"));
    }

    #[test]
    fn batched_prompt_lists_every_criterion() {
        let mut second = criterion();
        second.id = "evidence".into();
        let rubric = Rubric {
            title: None,
            criteria: vec![criterion(), second],
            grading: Default::default(),
        };
        let p = batched_prompt(&rubric, &essay(), 200);
        assert!(p.contains("CRITERION 1\n- criterion_id: thesis"));
        assert!(p.contains("CRITERION 2\n- criterion_id: evidence"));
        assert!(p.contains("criteria_results"));
    }
}
