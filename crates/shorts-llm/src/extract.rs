//! Extract structured data from model responses.
//!
//! Responses often wrap JSON in markdown code blocks or surround it with
//! explanatory text. Strategies, in order:
//! 1. The whole response parses as JSON
//! 2. A fenced code block (```json or bare ```)
//! 3. The first balanced `{...}` or `[...]`, whichever opens first

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{LlmError, LlmResult};

/// Locate the JSON payload in a response.
pub fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    if serde_json::from_str::<Value>(trimmed).is_ok() {
        return Some(trimmed);
    }

    if let Some(block) = extract_from_code_block(trimmed) {
        if serde_json::from_str::<Value>(block).is_ok() {
            return Some(block);
        }
    }

    let (first, second) = match (trimmed.find('['), trimmed.find('{')) {
        (Some(b), Some(c)) if b < c => (('[', ']'), ('{', '}')),
        _ => (('{', '}'), ('[', ']')),
    };

    [first, second]
        .into_iter()
        .filter_map(|(open, close)| extract_balanced(trimmed, open, close))
        .find(|candidate| serde_json::from_str::<Value>(candidate).is_ok())
}

/// Parse the JSON payload of a response into `T`.
pub fn parse_structured<T: DeserializeOwned>(response: &str) -> LlmResult<T> {
    let payload = extract_json(response).ok_or_else(|| {
        LlmError::parse(format!(
            "no JSON found in response (length: {})",
            response.len()
        ))
    })?;

    serde_json::from_str(payload).map_err(|e| LlmError::parse(e.to_string()))
}

/// Parse the JSON payload of a response as an untyped value.
pub fn parse_json_value(response: &str) -> Option<Value> {
    extract_json(response).and_then(|payload| serde_json::from_str(payload).ok())
}

/// Contents of the first fenced code block, language tag dropped.
fn extract_from_code_block(response: &str) -> Option<&str> {
    let start = response.find("```")?;
    let after_fence = &response[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// First balanced `open ... close` span, ignoring delimiters inside strings.
fn extract_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Hook {
        hook_line: String,
    }

    #[test]
    fn test_plain_json() {
        assert_eq!(extract_json(" {\"a\": 1} "), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_fenced_json() {
        let response = "Here you go:\n```json\n{\"hook_line\": \"Wait, what?\"}\n```\nEnjoy!";
        let hook: Hook = parse_structured(response).unwrap();
        assert_eq!(hook.hook_line, "Wait, what?");
    }

    #[test]
    fn test_prose_wrapped_object_with_braces_in_strings() {
        let response = r#"Sure! {"hook_line": "a } tricky { one"} Hope that helps."#;
        let hook: Hook = parse_structured(response).unwrap();
        assert_eq!(hook.hook_line, "a } tricky { one");
    }

    #[test]
    fn test_array_before_object() {
        let response = "The list: [{\"a\": 1}, {\"a\": 2}] done";
        let value = parse_json_value(response).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_no_json() {
        assert!(extract_json("I cannot help with that.").is_none());
        assert!(matches!(
            parse_structured::<Hook>("nothing here"),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn test_wrong_shape_is_parse_error() {
        assert!(matches!(
            parse_structured::<Hook>("{\"other\": 1}"),
            Err(LlmError::Parse(_))
        ));
    }
}
