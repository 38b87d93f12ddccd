use crate::errors::GradeError;

/// Recover the judgment object from raw oracle text.
///
/// Parses from the first `{` to the end of the text; if that fails (trailing
/// prose, a second object), parses exactly the balanced `{...}` block that
/// starts there. Braces inside JSON strings do not count toward depth.
pub(crate) fn extract_json_object(text: &str) -> Result<serde_json::Value, GradeError> {
    let text = text.trim();
    let start = text.find('{').ok_or_else(|| GradeError::Parse {
        message: "no JSON object start ('{') found in judge output".to_string(),
        raw: text.to_string(),
    })?;
    let segment = &text[start..];

    if let Ok(val) = serde_json::from_str::<serde_json::Value>(segment) {
        return Ok(val);
    }

    let end = matching_brace_end(segment).ok_or_else(|| GradeError::Parse {
        message: "unbalanced braces in judge output".to_string(),
        raw: text.to_string(),
    })?;

    serde_json::from_str::<serde_json::Value>(&segment[..end]).map_err(|e| GradeError::Parse {
        message: e.to_string(),
        raw: text.to_string(),
    })
}

/// Byte offset one past the brace closing the object that opens at offset 0.
fn matching_brace_end(segment: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in segment.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
