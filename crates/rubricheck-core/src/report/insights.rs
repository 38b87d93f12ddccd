//! Qualitative essay insights derived from preprocessing metadata only.

use crate::model::ProcessedEssay;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Assessment {
    pub level: &'static str,
    pub message: String,
}

impl Assessment {
    fn new(level: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QualityIndicators {
    pub indicators: Vec<String>,
    pub overall_assessment: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EssayInsights {
    pub length_assessment: Assessment,
    pub readability_assessment: Assessment,
    pub structure_assessment: Assessment,
    pub quote_usage: Assessment,
    pub language_notes: Assessment,
    pub overall_quality_indicators: QualityIndicators,
}

pub fn essay_insights(essay: &ProcessedEssay) -> EssayInsights {
    let m = &essay.metadata;
    EssayInsights {
        length_assessment: assess_length(m.word_count),
        readability_assessment: assess_readability(m.readability),
        structure_assessment: assess_structure(m.section_count, essay.paragraphs.len()),
        quote_usage: assess_quote_usage(m.quote_char_ratio),
        language_notes: assess_language(&m.language),
        overall_quality_indicators: assess_overall(essay),
    }
}

pub fn assess_length(word_count: usize) -> Assessment {
    match word_count {
        0..=199 => Assessment::new(
            "too_short",
            "Essay is quite short. Consider expanding your arguments with more detail and examples.",
        ),
        200..=499 => Assessment::new(
            "short",
            "Essay is on the shorter side. You could develop your ideas further.",
        ),
        500..=999 => Assessment::new("good", "Essay has a good length for developing your arguments."),
        1000..=1999 => Assessment::new(
            "long",
            "Essay is quite long. Consider tightening your arguments for clarity.",
        ),
        _ => Assessment::new(
            "very_long",
            "Essay is very long. Consider breaking into sections or tightening focus.",
        ),
    }
}

/// Bands over Flesch reading ease.
pub fn assess_readability(flesch: Option<f64>) -> Assessment {
    let Some(score) = flesch else {
        return Assessment::new("unknown", "Readability score not available.");
    };
    if score < 30.0 {
        Assessment::new(
            "very_difficult",
            "Essay is very difficult to read. Consider simplifying sentence structure.",
        )
    } else if score < 50.0 {
        Assessment::new(
            "difficult",
            "Essay is somewhat difficult to read. Consider using shorter sentences.",
        )
    } else if score < 70.0 {
        Assessment::new("standard", "Essay has standard readability for academic writing.")
    } else if score < 80.0 {
        Assessment::new("fairly_easy", "Essay is fairly easy to read.")
    } else {
        Assessment::new(
            "easy",
            "Essay is very easy to read. Consider adding more sophisticated vocabulary.",
        )
    }
}

pub fn assess_structure(section_count: usize, paragraph_count: usize) -> Assessment {
    if section_count == 0 && paragraph_count < 3 {
        Assessment::new(
            "poor",
            "Essay lacks clear structure. Consider adding an introduction, body paragraphs, and conclusion.",
        )
    } else if section_count == 0 && paragraph_count < 5 {
        Assessment::new(
            "basic",
            "Essay has basic structure but could benefit from more organization.",
        )
    } else {
        Assessment::new("good", "Essay shows good structural organization.")
    }
}

pub fn assess_quote_usage(ratio: f64) -> Assessment {
    if ratio < 0.05 {
        Assessment::new(
            "low",
            "Essay uses few quotes. Consider incorporating more evidence to support your arguments.",
        )
    } else if ratio < 0.15 {
        Assessment::new(
            "moderate",
            "Essay has moderate quote usage. Good balance of original analysis and evidence.",
        )
    } else if ratio < 0.30 {
        Assessment::new(
            "high",
            "Essay uses many quotes. Consider adding more original analysis.",
        )
    } else {
        Assessment::new(
            "very_high",
            "Essay relies heavily on quotes. Focus more on your own analysis and interpretation.",
        )
    }
}

pub fn assess_language(language: &str) -> Assessment {
    if language == "en" {
        Assessment::new(
            "english",
            "Essay is in English, which is appropriate for evaluation.",
        )
    } else {
        let shown = if language.is_empty() { "an unknown language" } else { language };
        Assessment::new(
            "non_english",
            format!("Essay is in {shown}. Consider providing an English translation for better evaluation."),
        )
    }
}

fn assess_overall(essay: &ProcessedEssay) -> QualityIndicators {
    let mut indicators = Vec::new();
    if !essay.warnings.is_empty() {
        indicators.push(format!("Processing warnings: {}", essay.warnings.len()));
    }
    if essay.paragraphs.len() < 3 {
        indicators.push("Very few paragraphs - may lack development".to_string());
    }
    if essay.metadata.quote_char_ratio > 0.0 {
        indicators.push("Contains quoted material".to_string());
    }
    let overall_assessment = if indicators.len() < 2 {
        "Good"
    } else {
        "Needs attention"
    };
    QualityIndicators {
        indicators,
        overall_assessment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EssayMetadata;

    #[test]
    fn band_edges() {
        assert_eq!(assess_length(199).level, "too_short");
        assert_eq!(assess_length(200).level, "short");
        assert_eq!(assess_length(2000).level, "very_long");
        assert_eq!(assess_readability(None).level, "unknown");
        assert_eq!(assess_readability(Some(50.0)).level, "standard");
        assert_eq!(assess_readability(Some(80.0)).level, "easy");
        assert_eq!(assess_quote_usage(0.15).level, "high");
        assert_eq!(assess_structure(0, 4).level, "basic");
        assert_eq!(assess_structure(2, 1).level, "good");
    }

    #[test]
    fn short_quoted_essay_needs_attention() {
        let essay = ProcessedEssay {
            paragraphs: vec!["One.".into(), "Two.".into()],
            metadata: EssayMetadata {
                word_count: 2,
                language: "fr".into(),
                quote_char_ratio: 0.2,
                ..Default::default()
            },
            warnings: vec![],
        };
        let insights = essay_insights(&essay);
        assert_eq!(insights.language_notes.level, "non_english");
        assert!(insights.language_notes.message.contains("fr"));
        assert_eq!(insights.overall_quality_indicators.indicators.len(), 2);
        assert_eq!(
            insights.overall_quality_indicators.overall_assessment,
            "Needs attention"
        );
    }
}
