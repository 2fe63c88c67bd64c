//! Tolerant JSON extraction from model output
//!
//! Models routinely wrap their JSON in markdown fences, prefix it with
//! prose, or leave a trailing comma before a closing bracket. This module
//! recovers a `serde_json::Value` from such output where possible and
//! returns `None` otherwise. It is a best-effort heuristic, not a parser:
//! callers must validate the result against the expected schema.

use serde_json::Value;

/// Extract a JSON value from raw model output. Never panics.
///
/// Attempts, in order:
/// 1. strip leading/trailing ``` fences (optionally tagged `json`) and parse;
/// 2. slice from the first `{`/`[` to the last matching `}`/`]` and parse;
/// 3. remove trailing commas before closing brackets and parse again.
pub fn extract_json(raw: &str) -> Option<Value> {
    let unfenced = strip_fences(raw);

    if let Ok(value) = serde_json::from_str(unfenced) {
        return Some(value);
    }

    let sliced = slice_json(unfenced)?;
    if let Ok(value) = serde_json::from_str(sliced) {
        return Some(value);
    }

    serde_json::from_str(&strip_trailing_commas(sliced)).ok()
}

fn strip_fences(raw: &str) -> &str {
    raw.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Slice between the first opening brace/bracket and the last closer of the
/// same kind. Known limitation: a stray `{` or `}` in surrounding prose can
/// widen the slice past the actual JSON.
fn slice_json(text: &str) -> Option<&str> {
    let (start, close) = match (text.find('{'), text.find('[')) {
        (Some(obj), Some(arr)) if arr < obj => (arr, ']'),
        (Some(obj), _) => (obj, '}'),
        (None, Some(arr)) => (arr, ']'),
        (None, None) => return None,
    };

    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Drop commas whose next non-whitespace character closes a scope.
/// String contents are left untouched.
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let mut next = i + 1;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                if next < chars.len() && (chars[next] == '}' || chars[next] == ']') {
                    continue;
                }
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_json_passes_through() {
        let raw = r#"{"verdict":"AVOID","score":42}"#;
        assert_eq!(
            extract_json(raw),
            Some(json!({"verdict": "AVOID", "score": 42}))
        );
    }

    #[test]
    fn test_fenced_json_matches_direct_parse() {
        let inner = r#"{"a": 1, "b": [true, null]}"#;
        let fenced = format!("```json\n{}\n```", inner);
        let expected: Value = serde_json::from_str(inner).unwrap();
        assert_eq!(extract_json(&fenced), Some(expected.clone()));

        // Untagged fence
        let fenced = format!("```\n{}\n```", inner);
        assert_eq!(extract_json(&fenced), Some(expected));
    }

    #[test]
    fn test_prose_wrapped_json() {
        let raw = "Here is the analysis you asked for:\n{\"action\": \"HOLD\"}\nLet me know if you need more.";
        assert_eq!(extract_json(raw), Some(json!({"action": "HOLD"})));
    }

    #[test]
    fn test_array_in_prose() {
        let raw = "Sources used: [\"a\", \"b\"] as requested.";
        assert_eq!(extract_json(raw), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_trailing_commas_repaired() {
        assert_eq!(extract_json(r#"{"a":1,}"#), Some(json!({"a": 1})));
        assert_eq!(extract_json("[1, 2, 3,]"), Some(json!([1, 2, 3])));
        assert_eq!(
            extract_json(r#"{"xs": [1, 2,], "k": "v",}"#),
            Some(json!({"xs": [1, 2], "k": "v"}))
        );
    }

    #[test]
    fn test_commas_inside_strings_survive_repair() {
        assert_eq!(
            extract_json(r#"{"note": "a, b, c",}"#),
            Some(json!({"note": "a, b, c"}))
        );
    }

    #[test]
    fn test_prose_without_json_is_none() {
        assert_eq!(extract_json("The company reported strong results."), None);
        assert_eq!(extract_json(""), None);
    }

    #[test]
    fn test_unbalanced_slice_is_none() {
        assert_eq!(extract_json("closing } before opening {"), None);
    }

    #[test]
    fn test_ambiguous_braces_in_prose_widen_the_slice() {
        // Documented limitation: a brace in leading prose defeats the slice
        // heuristic, so this valid JSON payload is not recovered.
        let raw = "set {x} first, then send {\"a\": 1}";
        assert_eq!(extract_json(raw), None);
    }
}
