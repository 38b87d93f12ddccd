use clap::{Args, Parser, Subcommand, ValueEnum};
use rubricheck_core::judge::GradingMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rubricheck",
    version,
    about = "Grade essays against rubrics with a consensus LLM judge"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Grade one essay against a rubric
    Grade(GradeArgs),
    /// Check rubric, essay and config files without calling the judge
    Validate(ValidateArgs),
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct GradeArgs {
    /// Rubric YAML (native or parser shape)
    #[arg(long)]
    pub rubric: PathBuf,

    /// Processed essay JSON
    #[arg(long)]
    pub essay: PathBuf,

    /// Grader config YAML
    #[arg(long, env = "RUBRICHECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the configured grading mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Grade all criteria in a single judge call
    #[arg(long)]
    pub batched: bool,

    /// Criteria evaluated concurrently
    #[arg(long)]
    pub parallel: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Exit 1 when any reliability flag is raised
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub judge: JudgeArgs,
}

#[derive(Args, Debug, Clone)]
pub struct JudgeArgs {
    /// Judge backend
    #[arg(long, value_enum, default_value_t = JudgeKind::Openai, env = "RUBRICHECK_JUDGE")]
    pub judge: JudgeKind,

    /// Overrides the configured judge model
    #[arg(long)]
    pub judge_model: Option<String>,

    /// JSONL file of scripted replies for `--judge fake`, one reply per line
    #[arg(long)]
    pub judge_script: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[arg(long)]
    pub rubric: PathBuf,

    #[arg(long)]
    pub essay: Option<PathBuf>,

    #[arg(long, env = "RUBRICHECK_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Fast,
    Full,
}

impl From<ModeArg> for GradingMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Fast => GradingMode::Fast,
            ModeArg::Full => GradingMode::Full,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Console,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeKind {
    Openai,
    Fake,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn grade_flags_parse() {
        let cli = Cli::parse_from([
            "rubricheck",
            "grade",
            "--rubric",
            "r.yaml",
            "--essay",
            "e.json",
            "--mode",
            "full",
            "--format",
            "json",
            "--judge",
            "fake",
            "--strict",
        ]);
        match cli.cmd {
            Command::Grade(args) => {
                assert_eq!(args.mode, Some(ModeArg::Full));
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.judge.judge, JudgeKind::Fake);
                assert!(args.strict);
                assert!(!args.batched);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
