use crate::cli::args::ValidateArgs;
use crate::exit_codes;
use rubricheck_core::essay::load_essay;
use rubricheck_core::rubric::load_rubric;
use rubricheck_core::{GradeError, GraderConfig};

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    match check(&args) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {e}");
            Ok(exit_codes::for_error(&e))
        }
    }
}

fn check(args: &ValidateArgs) -> Result<Vec<String>, GradeError> {
    let mut lines = Vec::new();
    let rubric = load_rubric(&args.rubric)?;
    lines.push(format!(
        "rubric ok: {} criteria, numeric scoring {}",
        rubric.criteria.len(),
        if rubric.grading.numeric { "on" } else { "off" }
    ));
    if let Some(path) = &args.essay {
        let essay = load_essay(path)?;
        lines.push(format!(
            "essay ok: {} paragraphs, {} words",
            essay.paragraphs.len(),
            essay.metadata.word_count
        ));
    }
    let cfg = GraderConfig::load(args.config.as_deref())?;
    lines.push(format!(
        "config ok: mode {}, model {}, parallel {}",
        cfg.mode.as_str(),
        cfg.judge.model,
        cfg.parallel
    ));
    Ok(lines)
}
