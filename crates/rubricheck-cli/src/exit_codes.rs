//! Process exit codes for `rubricheck`.
//! Scripts and CI jobs rely on these values; keep them stable.

use rubricheck_core::{GradeError, GradeErrorKind};

pub const SUCCESS: i32 = 0;
pub const FLAGS_RAISED: i32 = 1; // --strict and at least one reliability flag set
pub const CONFIG_ERROR: i32 = 2; // Bad config, rubric or essay
pub const JUDGE_FAILURE: i32 = 3; // Oracle transport, timeout or contract failure

pub fn for_error(err: &GradeError) -> i32 {
    match err.kind() {
        GradeErrorKind::InvalidInput | GradeErrorKind::Config => CONFIG_ERROR,
        GradeErrorKind::Transport
        | GradeErrorKind::Timeout
        | GradeErrorKind::Parse
        | GradeErrorKind::SchemaViolation
        | GradeErrorKind::Task => JUDGE_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_map_by_inner_kind() {
        let err = GradeError::Timeout { seconds: 3 }.for_criterion("thesis");
        assert_eq!(for_error(&err), JUDGE_FAILURE);
        assert_eq!(for_error(&GradeError::invalid_rubric("empty")), CONFIG_ERROR);
        assert_eq!(for_error(&GradeError::config("parallel")), CONFIG_ERROR);
    }
}
