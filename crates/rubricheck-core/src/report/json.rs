use crate::model::GradeSummary;
use crate::report::insights::EssayInsights;
use serde::Serialize;
use std::path::Path;

pub const SCHEMA_VERSION: u32 = 1;

/// Versioned JSON document written for one grading run.
#[derive(Debug, Clone, Serialize)]
pub struct GradeReport<'a> {
    pub schema_version: u32,
    pub graded_at: String,
    pub summary: &'a GradeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<&'a EssayInsights>,
}

impl<'a> GradeReport<'a> {
    pub fn new(summary: &'a GradeSummary, insights: Option<&'a EssayInsights>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            graded_at: chrono::Utc::now().to_rfc3339(),
            summary,
            insights,
        }
    }

    pub fn to_pretty_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub fn write_json(report: &GradeReport<'_>, out: &Path) -> anyhow::Result<()> {
    std::fs::write(out, report.to_pretty_json()?)?;
    Ok(())
}
