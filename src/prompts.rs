//! Prompts and sampling constants for the biography parser.
//!
//! The model, temperature and both prompts are fixed constants of this
//! pipeline; they are not configurable at call time so that every person
//! in a corpus is parsed under identical instructions.

/// Chat model used for every biography.
pub const MODEL: &str = "gpt-4o";

/// Low, deterministic-leaning sampling temperature.
pub const TEMPERATURE: f32 = 0.3;

/// System message sent before every biography.
pub const SYSTEM_PROMPT: &str =
    "You are an AI that extracts structured data from text, returning a JSON object and no other text.";

/// User-message template; `{bio_text}` is replaced by the extracted text.
pub const PARSE_PROMPT_TEMPLATE: &str = r#"Given the following biographical summary, return the following data in JSON format:
- full_name
- birthdate
- deathdate
- birthplace
- parents: [List of Parents]
- employment: [List of Employment]
- degrees: [List of Degrees]
- visits: [List of Visits]
- honors: [List of Honors]

where each Parent is a JSON object with keys
- name
- birthdate
- deathdate
- profession

Employment is a JSON object with keys
- employer
- job_title
- job_year_begin
- job_year_end
- reason_end

Degree is a JSON object with keys
- degree_institution_name
- degree_type (eg: BA, MA, PhD)
- degree_year
- degree_advisor

Visit is a JSON object with keys:
- visit_location
- visit_reason
- visit_year

Honors is a JSON object with keys:
- honor_name
- honor_year

---
{bio_text}"#;

/// Build the user message for one biography.
///
/// Only the placeholder is substituted; braces inside `bio_text` are kept
/// verbatim.
pub fn biography_prompt(bio_text: &str) -> String {
    match PARSE_PROMPT_TEMPLATE.split_once("{bio_text}") {
        Some((head, tail)) => format!("{head}{bio_text}{tail}"),
        None => format!("{PARSE_PROMPT_TEMPLATE}\n{bio_text}"),
    }
}
