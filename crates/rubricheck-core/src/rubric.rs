//! Rubric loading and validation.
//!
//! Two document shapes are accepted: the native `Rubric` shape and the shape
//! emitted by the rubric parser (`scale` + `criteria[].descriptor_by_level`).

use crate::errors::GradeError;
use crate::model::{Criterion, LetterBand, Rubric, RubricGradingConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Letter bands applied to rubrics converted from the parser shape.
pub fn default_letter_bands() -> Vec<LetterBand> {
    vec![
        LetterBand::new(90.0, 100.0, "A+"),
        LetterBand::new(85.0, 89.99, "A"),
        LetterBand::new(80.0, 84.99, "A-"),
        LetterBand::new(70.0, 79.99, "B"),
        LetterBand::new(60.0, 69.99, "C"),
        LetterBand::new(0.0, 59.99, "D or below"),
    ]
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ParserScale {
    #[serde(rename = "type")]
    kind: Option<String>,
    levels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ParserCriterion {
    #[serde(default)]
    name: String,
    /// Mapping keeps the declared level order.
    #[serde(default)]
    descriptor_by_level: serde_yaml::Mapping,
    #[serde(default)]
    weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ParserRubric {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    scale: ParserScale,
    #[serde(default)]
    criteria: Vec<ParserCriterion>,
}

/// `"Thesis & Focus"` -> `"thesis_and_focus"`.
pub fn slug_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "_").replace('&', "and")
}

fn yaml_key(v: &serde_yaml::Value) -> Option<String> {
    match v {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn convert_parser_rubric(parsed: ParserRubric) -> Result<Rubric, GradeError> {
    let mut criteria = Vec::with_capacity(parsed.criteria.len());
    for pc in parsed.criteria {
        let mut valid_levels = Vec::new();
        let mut descriptors = BTreeMap::new();
        for (k, v) in &pc.descriptor_by_level {
            let level = yaml_key(k).ok_or_else(|| {
                GradeError::invalid_rubric(format!(
                    "criterion '{}': descriptor level keys must be strings",
                    pc.name
                ))
            })?;
            let text = match v {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Null => String::new(),
                other => serde_yaml::to_string(other)
                    .map_err(|e| GradeError::invalid_rubric(e.to_string()))?
                    .trim()
                    .to_string(),
            };
            valid_levels.push(level.clone());
            descriptors.insert(level, text);
        }
        criteria.push(Criterion {
            id: slug_id(&pc.name),
            level_scale_note: Some(valid_levels.join(" > ")),
            name: pc.name,
            valid_levels,
            descriptors,
            weight: Some(pc.weight.unwrap_or(1.0)),
        });
    }

    let categorical = parsed.scale.kind.as_deref().unwrap_or("categorical") == "categorical";
    let categorical_points_map = (categorical && !parsed.scale.levels.is_empty()).then(|| {
        let n = parsed.scale.levels.len();
        parsed
            .scale
            .levels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), (n - i) as f64))
            .collect()
    });

    Ok(Rubric {
        title: parsed.title,
        criteria,
        grading: RubricGradingConfig {
            numeric: true,
            letter_bands: default_letter_bands(),
            categorical_points_map,
            ..Default::default()
        },
    })
}

fn is_parser_shape(doc: &serde_yaml::Value) -> bool {
    if doc.get("scale").is_some() {
        return true;
    }
    doc.get("criteria")
        .and_then(|c| c.as_sequence())
        .and_then(|items| items.first())
        .is_some_and(|first| first.get("descriptor_by_level").is_some())
}

/// Parse a rubric document (YAML or JSON) in either accepted shape.
pub fn parse_rubric(text: &str) -> Result<Rubric, GradeError> {
    let doc: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| GradeError::invalid_rubric(format!("failed to parse rubric: {e}")))?;

    let rubric = if is_parser_shape(&doc) {
        let parsed: ParserRubric = serde_yaml::from_value(doc)
            .map_err(|e| GradeError::invalid_rubric(format!("parser-shape rubric: {e}")))?;
        convert_parser_rubric(parsed)?
    } else {
        serde_yaml::from_value(doc)
            .map_err(|e| GradeError::invalid_rubric(format!("rubric: {e}")))?
    };
    Ok(rubric)
}

/// Load and validate a rubric file.
pub fn load_rubric(path: &Path) -> Result<Rubric, GradeError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        GradeError::invalid_rubric(format!("failed to read {}: {e}", path.display()))
    })?;
    let rubric = parse_rubric(&text)?;
    rubric.validate()?;
    tracing::debug!(path = %path.display(), criteria = rubric.criteria.len(), "loaded rubric");
    Ok(rubric)
}

impl Rubric {
    /// Structural checks the evaluator and aggregation rely on.
    pub fn validate(&self) -> Result<(), GradeError> {
        if self.criteria.is_empty() {
            return Err(GradeError::invalid_rubric("rubric has no criteria"));
        }

        let mut ids = HashSet::new();
        for c in &self.criteria {
            if c.id.trim().is_empty() {
                return Err(GradeError::invalid_rubric(format!(
                    "criterion '{}' has an empty id",
                    c.name
                )));
            }
            if !ids.insert(c.id.as_str()) {
                return Err(GradeError::invalid_rubric(format!(
                    "duplicate criterion id '{}'",
                    c.id
                )));
            }
            if c.valid_levels.is_empty() {
                return Err(GradeError::invalid_rubric(format!(
                    "criterion '{}' has no valid_levels",
                    c.id
                )));
            }
            let mut seen = HashSet::new();
            for level in &c.valid_levels {
                if !seen.insert(level.as_str()) {
                    return Err(GradeError::invalid_rubric(format!(
                        "criterion '{}' lists level '{level}' twice",
                        c.id
                    )));
                }
                if !c.descriptors.contains_key(level) {
                    return Err(GradeError::invalid_rubric(format!(
                        "criterion '{}' has no descriptor for level '{level}'",
                        c.id
                    )));
                }
            }
            if let Some(w) = c.weight {
                if !(w.is_finite() && w > 0.0) {
                    return Err(GradeError::invalid_rubric(format!(
                        "criterion '{}' has non-positive weight {w}",
                        c.id
                    )));
                }
            }
        }

        for band in &self.grading.letter_bands {
            if band.min > band.max {
                return Err(GradeError::invalid_rubric(format!(
                    "letter band '{}' has min {} > max {}",
                    band.letter, band.min, band.max
                )));
            }
        }
        Ok(())
    }
}
