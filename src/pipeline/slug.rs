//! Bookmark title → `lastname_firstname` slug.
//!
//! Person bookmarks read `LAST, First Middle (dates)`. Section headers
//! ("Preface", "A", "Appendix") carry no comma and are rejected. The slug
//! is the filename stem of every per-person artefact downstream.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_PARENTHESISED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.*?\)").unwrap());

/// Normalise a bookmark title into `lastname_firstname`.
///
/// 1. Drop every parenthesised substring, e.g. `(1882-1935)`.
/// 2. Drop apostrophes (`O'Brien` → `OBrien`).
/// 3. Split on commas; without a comma the title is not a person.
/// 4. Last name: first part, trimmed of spaces and periods, lower-cased.
/// 5. First name: first whitespace token of the second part, same trim.
///
/// Returns `None` when the title is rejected: no comma, or no first-name
/// token after it. An empty last name is kept, giving a `_first` slug.
pub fn normalize_title(title: &str) -> Option<String> {
    let without_parens = RE_PARENTHESISED.replace_all(title, "");
    let cleaned = without_parens.replace('\'', "");

    let mut parts = cleaned.split(',');
    let last_part = parts.next()?;
    let given_part = parts.next()?;

    let last_name = trim_name(last_part).to_lowercase();
    let first_name = trim_name(trim_name(given_part).split_whitespace().next()?).to_lowercase();

    if first_name.is_empty() {
        return None;
    }

    Some(format!("{last_name}_{first_name}"))
}

fn trim_name(s: &str) -> &str {
    s.trim_matches(|c| c == ' ' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_parenthesised_dates() {
        assert_eq!(
            normalize_title("Noether, Emmy (1882-1935)").as_deref(),
            Some("noether_emmy")
        );
    }

    #[test]
    fn strips_apostrophes_and_middle_names() {
        assert_eq!(
            normalize_title("O'Brien, Mary Jo").as_deref(),
            Some("obrien_mary")
        );
    }

    #[test]
    fn titles_without_comma_are_rejected() {
        for t in ["Preface", "A", "Appendix B", "", "Index of Names (1900)"] {
            assert_eq!(normalize_title(t), None, "{t:?}");
        }
    }

    #[test]
    fn periods_are_trimmed() {
        assert_eq!(
            normalize_title("SMITH., J. Alice").as_deref(),
            Some("smith_j")
        );
        assert_eq!(
            normalize_title(" Hopper , .Grace. Brewster").as_deref(),
            Some("hopper_grace")
        );
    }

    #[test]
    fn only_text_between_first_two_commas_is_used() {
        assert_eq!(
            normalize_title("Smith, Jr., John").as_deref(),
            Some("smith_jr")
        );
    }

    #[test]
    fn empty_given_name_is_rejected() {
        assert_eq!(normalize_title("Smith,"), None);
        assert_eq!(normalize_title("Smith, (née Jones)"), None);
        assert_eq!(normalize_title("Smith, . ."), None);
    }

    #[test]
    fn empty_last_name_keeps_leading_underscore() {
        assert_eq!(normalize_title(", Mary").as_deref(), Some("_mary"));
        assert_eq!(normalize_title("(1900), Mary").as_deref(), Some("_mary"));
    }

    #[test]
    fn unicode_is_lowercased() {
        assert_eq!(
            normalize_title("KOVALEVSKAYA, Sofía").as_deref(),
            Some("kovalevskaya_sofía")
        );
    }

    #[test]
    fn parenthesised_text_anywhere_is_removed() {
        assert_eq!(
            normalize_title("Young (Chisholm), Grace Emily").as_deref(),
            Some("young_grace")
        );
    }
}
