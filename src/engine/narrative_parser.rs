use once_cell::sync::Lazy;
use regex::Regex;

/// `[Option]` tokens the narrator appends to suggest next moves.
static CHOICE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]").expect("valid choice pattern"));

/// A choice token plus the whitespace and optional `|` separator before it.
static CHOICE_WITH_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:\|\s*)?\[[^\]]+\]").expect("valid choice pattern"));

/// Narration ready for display, with the suggestions split out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedTextResult {
    pub narrative_text: String,
    pub suggested_choices: Vec<String>,
}

/// Split narrator text into display text and suggested actions.
///
/// Every `[...]` pair is a choice, in order, duplicates kept. Unbalanced
/// brackets are left in the text, and bracketed prose is read as a choice too.
pub fn extract_choices(text: &str) -> NormalizedTextResult {
    let suggested_choices = CHOICE_TOKEN
        .captures_iter(text)
        .filter_map(|caps| {
            let choice = caps.get(1)?.as_str().trim();
            (!choice.is_empty()).then(|| choice.to_string())
        })
        .collect();

    let narrative_text = CHOICE_WITH_SEPARATOR
        .replace_all(text, "")
        .trim()
        .to_string();

    NormalizedTextResult {
        narrative_text,
        suggested_choices,
    }
}
