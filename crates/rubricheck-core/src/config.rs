//! Grader configuration: YAML file, then `RUBRICHECK_*` environment overrides.

use crate::errors::GradeError;
use crate::judge::{
    GradingMode, JudgeRuntimeConfig, DEFAULT_MAX_SPAN_CHARS, DEFAULT_MIN_QUOTE_CHARS,
    DEFAULT_SYNTHETIC_QUOTE_CHARS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PARALLEL: usize = 4;
pub const DEFAULT_MAX_PARAGRAPHS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JudgeSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline for a single oracle call.
    pub timeout_seconds: u64,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2048,
            timeout_seconds: 300,
        }
    }
}

impl JudgeSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvidenceSettings {
    pub max_span_chars: usize,
    pub min_quote_chars: usize,
    pub synthetic_quote_chars: usize,
}

impl Default for EvidenceSettings {
    fn default() -> Self {
        Self {
            max_span_chars: DEFAULT_MAX_SPAN_CHARS,
            min_quote_chars: DEFAULT_MIN_QUOTE_CHARS,
            synthetic_quote_chars: DEFAULT_SYNTHETIC_QUOTE_CHARS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraderConfig {
    pub mode: GradingMode,
    /// Grade every criterion in one oracle call.
    pub batched: bool,
    /// Criteria evaluated concurrently.
    pub parallel: usize,
    /// Essays longer than this are truncated before grading.
    pub max_essay_paragraphs: usize,
    pub judge: JudgeSettings,
    pub evidence: EvidenceSettings,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            mode: GradingMode::Fast,
            batched: false,
            parallel: DEFAULT_PARALLEL,
            max_essay_paragraphs: DEFAULT_MAX_PARAGRAPHS,
            judge: JudgeSettings::default(),
            evidence: EvidenceSettings::default(),
        }
    }
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, GradeError> {
    raw.trim()
        .parse()
        .map_err(|_| GradeError::config(format!("{key}: cannot parse '{raw}'")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, GradeError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(GradeError::config(format!("{key}: expected a boolean, got '{raw}'"))),
    }
}

impl GraderConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, GradeError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GradeError::config(format!("failed to parse config YAML: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self, GradeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GradeError::config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// File (or defaults), then process environment, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, GradeError> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `RUBRICHECK_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), GradeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RUBRICHECK_MODE") {
            self.mode = GradingMode::parse(&v).ok_or_else(|| {
                GradeError::config(format!("RUBRICHECK_MODE: expected fast|full, got '{v}'"))
            })?;
        }
        if let Some(v) = lookup("RUBRICHECK_BATCHED") {
            self.batched = parse_bool("RUBRICHECK_BATCHED", &v)?;
        }
        if let Some(v) = lookup("RUBRICHECK_MODEL") {
            self.judge.model = v;
        }
        if let Some(v) = lookup("RUBRICHECK_TEMPERATURE") {
            self.judge.temperature = parse_env("RUBRICHECK_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("RUBRICHECK_MAX_TOKENS") {
            self.judge.max_tokens = parse_env("RUBRICHECK_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("RUBRICHECK_TIMEOUT") {
            self.judge.timeout_seconds = parse_env("RUBRICHECK_TIMEOUT", &v)?;
        }
        if let Some(v) = lookup("RUBRICHECK_MAX_EVIDENCE_SPAN") {
            self.evidence.max_span_chars = parse_env("RUBRICHECK_MAX_EVIDENCE_SPAN", &v)?;
        }
        if let Some(v) = lookup("RUBRICHECK_MAX_PARAGRAPHS") {
            self.max_essay_paragraphs = parse_env("RUBRICHECK_MAX_PARAGRAPHS", &v)?;
        }
        if let Some(v) = lookup("RUBRICHECK_PARALLEL") {
            self.parallel = parse_env("RUBRICHECK_PARALLEL", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), GradeError> {
        if self.parallel == 0 {
            return Err(GradeError::config("parallel must be at least 1"));
        }
        if self.judge.timeout_seconds == 0 {
            return Err(GradeError::config("judge.timeout_seconds must be positive"));
        }
        if self.max_essay_paragraphs == 0 {
            return Err(GradeError::config("max_essay_paragraphs must be at least 1"));
        }
        if self.evidence.min_quote_chars > self.evidence.max_span_chars {
            return Err(GradeError::config(format!(
                "evidence.min_quote_chars ({}) exceeds max_span_chars ({})",
                self.evidence.min_quote_chars, self.evidence.max_span_chars
            )));
        }
        if !(0.0..=2.0).contains(&self.judge.temperature) {
            return Err(GradeError::config(format!(
                "judge.temperature {} outside 0.0..=2.0",
                self.judge.temperature
            )));
        }
        Ok(())
    }

    pub fn runtime_config(&self) -> JudgeRuntimeConfig {
        JudgeRuntimeConfig {
            mode: self.mode,
            max_span_chars: self.evidence.max_span_chars,
            min_quote_chars: self.evidence.min_quote_chars,
            synthetic_quote_chars: self.evidence.synthetic_quote_chars,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GradeErrorKind;
    use serial_test::serial;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = GraderConfig::default();
        assert_eq!(cfg.mode, GradingMode::Fast);
        assert_eq!(cfg.judge.model, "gpt-4o-mini");
        assert_eq!(cfg.judge.max_tokens, 2048);
        assert_eq!(cfg.judge.timeout(), Duration::from_secs(300));
        assert_eq!(cfg.max_essay_paragraphs, 50);
        assert_eq!(cfg.evidence.min_quote_chars, 11);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = GraderConfig::from_yaml("mode: full\njudge:\n  model: gpt-4o\n").unwrap();
        assert_eq!(cfg.mode, GradingMode::Full);
        assert_eq!(cfg.judge.model, "gpt-4o");
        assert_eq!(cfg.judge.max_tokens, 2048);
        assert_eq!(cfg.parallel, DEFAULT_PARALLEL);
    }

    #[test]
    fn overrides_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("RUBRICHECK_MODE", "FULL"),
            ("RUBRICHECK_BATCHED", "yes"),
            ("RUBRICHECK_MAX_EVIDENCE_SPAN", "120"),
            ("RUBRICHECK_PARALLEL", "2"),
        ]
        .into_iter()
        .collect();
        let mut cfg = GraderConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.mode, GradingMode::Full);
        assert!(cfg.batched);
        assert_eq!(cfg.runtime_config().max_span_chars, 120);
        assert_eq!(cfg.parallel, 2);
    }

    #[test]
    fn bad_override_is_config_error() {
        let mut cfg = GraderConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "RUBRICHECK_TIMEOUT").then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), GradeErrorKind::Config);
    }

    #[test]
    fn validation_rules() {
        let mut cfg = GraderConfig::default();
        cfg.parallel = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = GraderConfig::default();
        cfg.evidence.min_quote_chars = 500;
        assert!(cfg.validate().is_err());

        let mut cfg = GraderConfig::default();
        cfg.judge.timeout_seconds = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    #[serial]
    fn load_reads_file_then_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rubricheck.yaml");
        std::fs::write(&path, "parallel: 8\njudge:\n  temperature: 0.0\n").unwrap();

        std::env::set_var("RUBRICHECK_MODEL", "gpt-4.1-mini");
        let cfg = GraderConfig::load(Some(&path));
        std::env::remove_var("RUBRICHECK_MODEL");

        let cfg = cfg.unwrap();
        assert_eq!(cfg.parallel, 8);
        assert_eq!(cfg.judge.temperature, 0.0);
        assert_eq!(cfg.judge.model, "gpt-4.1-mini");
    }
}
