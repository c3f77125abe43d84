//! Recovers a JSON object from free-form model output.
//!
//! Models asked for "only JSON" still wrap it in prose or code fences. Three
//! strategies are tried in order and the first that yields a JSON object wins:
//!
//! 1. the body of a fenced block tagged ```` ```json ````
//! 2. the first brace-balanced `{...}` span anywhere in the reply
//! 3. the whole reply, trimmed
//!
//! Anything that parses but is not an object (arrays, scalars) is rejected.

use serde_json::Value;

/// Returns the first JSON object recoverable from `reply`, or `None`.
pub fn extract_json_object(reply: &str) -> Option<Value> {
    fenced_json_block(reply)
        .and_then(parse_object)
        .or_else(|| first_balanced_object(reply).and_then(parse_object))
        .or_else(|| parse_object(reply.trim()))
}

fn parse_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// Body of the first ```` ```json ```` fence. An unterminated fence runs to end of input.
fn fenced_json_block(reply: &str) -> Option<&str> {
    let lower = reply.to_ascii_lowercase();
    let open = lower.find("```json")?;
    let body = &reply[open + "```json".len()..];
    Some(match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    })
}

/// First `{...}` span whose braces balance, ignoring braces inside string literals.
fn first_balanced_object(reply: &str) -> Option<&str> {
    let mut search_from = 0;

    while let Some(offset) = reply[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&reply[start..]) {
            let span = &reply[start..start + end];
            if parse_object(span).is_some() {
                return Some(span);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced object starting at `s[0] == '{'`.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
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
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
