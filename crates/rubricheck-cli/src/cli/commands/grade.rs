use crate::cli::args::{GradeArgs, JudgeArgs, JudgeKind, OutputFormat};
use crate::exit_codes;
use anyhow::Context;
use rubricheck_core::engine::build_oracle;
use rubricheck_core::essay::load_essay;
use rubricheck_core::providers::llm::fake::FakeClient;
use rubricheck_core::providers::llm::openai::OpenAIClient;
use rubricheck_core::providers::llm::LlmClient;
use rubricheck_core::report::console::{default_progress_sink, print_summary};
use rubricheck_core::report::insights::essay_insights;
use rubricheck_core::report::json::{write_json, GradeReport};
use rubricheck_core::rubric::load_rubric;
use rubricheck_core::{GradeError, Grader, GraderConfig};
use std::path::Path;
use std::sync::Arc;

pub async fn run(args: GradeArgs) -> anyhow::Result<i32> {
    let cfg = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => return Ok(report_error(&e)),
    };
    let rubric = match load_rubric(&args.rubric) {
        Ok(r) => r,
        Err(e) => return Ok(report_error(&e)),
    };
    let essay = match load_essay(&args.essay) {
        Ok(e) => e,
        Err(e) => return Ok(report_error(&e)),
    };

    let client = match build_client(&args.judge, &cfg) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e:#}");
            return Ok(exit_codes::CONFIG_ERROR);
        }
    };
    let oracle = build_oracle(&cfg, client);
    let mut grader = Grader::new(&cfg, Arc::new(oracle));
    if args.format == OutputFormat::Console {
        if let Some(sink) = default_progress_sink(rubric.criteria.len()) {
            grader = grader.with_progress(sink);
        }
    }

    let summary = match grader.grade(&rubric, &essay).await {
        Ok(s) => s,
        Err(e) => return Ok(report_error(&e)),
    };

    let insights = essay_insights(&essay);
    let report = GradeReport::new(&summary, Some(&insights));
    match args.format {
        OutputFormat::Json => match &args.output {
            Some(out) => write_json(&report, out)?,
            None => println!("{}", report.to_pretty_json()?),
        },
        OutputFormat::Console => {
            print_summary(&summary);
            if let Some(out) = &args.output {
                write_json(&report, out)?;
                eprintln!("Report written to {}", out.display());
            }
        }
    }

    if args.strict && summary.notes.flags.any() {
        return Ok(exit_codes::FLAGS_RAISED);
    }
    Ok(exit_codes::SUCCESS)
}

/// Config file and environment first, then command-line flags on top.
fn load_config(args: &GradeArgs) -> Result<GraderConfig, GradeError> {
    let mut cfg = GraderConfig::load(args.config.as_deref())?;
    if let Some(mode) = args.mode {
        cfg.mode = mode.into();
    }
    if args.batched {
        cfg.batched = true;
    }
    if let Some(parallel) = args.parallel {
        cfg.parallel = parallel;
    }
    if let Some(model) = &args.judge.judge_model {
        cfg.judge.model = model.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_client(judge: &JudgeArgs, cfg: &GraderConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    match judge.judge {
        JudgeKind::Openai => {
            let client = OpenAIClient::from_env(
                cfg.judge.model.clone(),
                cfg.judge.temperature,
                cfg.judge.max_tokens,
            )?;
            Ok(Arc::new(client))
        }
        JudgeKind::Fake => {
            let path = judge
                .judge_script
                .as_deref()
                .context("--judge fake requires --judge-script")?;
            let replies = read_script(path)?;
            tracing::info!(replies = replies.len(), path = %path.display(), "using scripted judge");
            Ok(Arc::new(
                FakeClient::new(cfg.judge.model.clone()).with_script(replies),
            ))
        }
    }
}

/// One reply per non-blank line.
fn read_script(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read judge script {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn report_error(err: &GradeError) -> i32 {
    eprintln!("error: {err}");
    if let Some(raw) = err.raw_judgment() {
        eprintln!("raw judgment: {raw}");
    }
    exit_codes::for_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.jsonl");
        std::fs::write(&path, "{\"a\": 1}\n\n  \n{\"b\": 2}\n").unwrap();
        let replies = read_script(&path).unwrap();
        assert_eq!(replies, ["{\"a\": 1}", "{\"b\": 2}"]);
    }
}
