//! Tolerant JSON parsing for LLM replies.
//!
//! The model is asked for a bare JSON object but routinely returns
//! near-JSON: wrapped in a ```` ```json ```` fence, preceded by a sentence,
//! with trailing commas, Python literals, raw newlines inside strings, or cut
//! off mid-object when it runs out of tokens. This module applies cheap
//! deterministic fixes and then hands the result to `serde_json`.
//!
//! ## Rule Order
//!
//! 1. Strict parse of the trimmed reply (the common case costs nothing)
//! 2. Strip an outer Markdown code fence
//! 3. Cut the outermost `{…}` / `[…]` span out of surrounding prose
//! 4. Scan once, outside strings: drop comments and trailing commas, map
//!    `None`/`True`/`False`/`NaN`, turn single-quoted strings into
//!    double-quoted ones; inside strings: escape raw control characters
//! 5. Close whatever the truncation left open (string, `:`, brackets)

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap());

/// Parse `reply` as JSON, repairing common LLM syntax slips.
///
/// Returns the strict parser's error message for the repaired text when the
/// reply is beyond repair.
pub fn repair_json(reply: &str) -> Result<Value, String> {
    let trimmed = reply.trim();
    if let Ok(v) = serde_json::from_str(trimmed) {
        return Ok(v);
    }

    let unfenced = strip_code_fence(trimmed);
    let span = outermost_span(unfenced).ok_or_else(|| "no JSON object or array in reply".to_string())?;
    let fixed = sanitize(span);

    serde_json::from_str(&fixed).map_err(|e| e.to_string())
}

// ── Rule 2: Strip outer code fence ───────────────────────────────────────────

fn strip_code_fence(input: &str) -> &str {
    match RE_OUTER_FENCE.captures(input).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => input,
    }
}

// ── Rule 3: Outermost object/array span ──────────────────────────────────────

/// From the first `{` or `[` to the last matching closer; to the end of the
/// input when no closer follows (truncated reply).
fn outermost_span(input: &str) -> Option<&str> {
    let start = input.find(['{', '['])?;
    let closer = if input[start..].starts_with('{') { '}' } else { ']' };
    match input.rfind(closer) {
        Some(end) if end > start => Some(&input[start..=end]),
        _ => Some(&input[start..]),
    }
}

// ── Rules 4 + 5: Single-pass scanner ─────────────────────────────────────────

fn sanitize(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut closers: Vec<char> = Vec::new();
    // Some(quote) while inside a string opened by `quote`.
    let mut in_string: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(quote) = in_string {
            match c {
                // A backslash cut off by truncation escapes nothing; drop it.
                '\\' => {
                    if let Some(&next) = chars.get(i + 1) {
                        // `\'` is not a JSON escape.
                        if next != '\'' {
                            out.push('\\');
                        }
                        out.push(next);
                        i += 1;
                    }
                }
                '"' if quote == '\'' => out.push_str("\\\""),
                c if c == quote => {
                    out.push('"');
                    in_string = None;
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
            i += 1;
            continue;
        }

        match c {
            '"' | '\'' => {
                out.push('"');
                in_string = Some(c);
            }
            '{' => {
                out.push(c);
                closers.push('}');
            }
            '[' => {
                out.push(c);
                closers.push(']');
            }
            '}' | ']' => {
                if closers.last() == Some(&c) {
                    closers.pop();
                    out.push(c);
                }
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, None | Some('}') | Some(']')) {
                    out.push(',');
                }
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
                continue;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "None" | "NaN" | "undefined" => "null",
                    "True" => "true",
                    "False" => "false",
                    _ => &word,
                });
                continue;
            }
            c => out.push(c),
        }
        i += 1;
    }

    // ── Rule 5: close what truncation left open ──
    if in_string.is_some() {
        out.push('"');
    }
    let trimmed_len = out.trim_end().trim_end_matches(',').trim_end().len();
    out.truncate(trimmed_len);
    if out.ends_with(':') {
        out.push_str("null");
    }
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    out
}
