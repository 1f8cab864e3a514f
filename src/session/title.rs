//! Session title derivation
//!
//! A session keeps the placeholder title until its first successful
//! exchange, at which point a short title is derived from the question
//! text. The derivation is a pure function so it can be tested in
//! isolation and re-run idempotently.

/// Placeholder title carried by sessions with no exchanges yet.
pub const PLACEHOLDER_TITLE: &str = "New Chat";

/// Derive a short session title from a question.
///
/// Word tokens are maximal runs of alphanumeric characters. Fewer than 3
/// tokens uses all of them, otherwise the first 4; each kept word has its
/// first letter capitalized and the words are joined with single spaces.
/// Returns `None` when the text contains no tokens, in which case the
/// caller keeps the placeholder.
///
/// # Examples
///
/// ```
/// use askdesk::session::title::derive_title;
///
/// assert_eq!(
///     derive_title("What is the refund policy for damaged goods?").as_deref(),
///     Some("What Is The Refund")
/// );
/// assert_eq!(derive_title("hello there").as_deref(), Some("Hello There"));
/// assert_eq!(derive_title("???"), None);
/// ```
pub fn derive_title(question: &str) -> Option<String> {
    let words: Vec<&str> = question
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if words.is_empty() {
        return None;
    }

    let count = if words.len() < 3 { words.len() } else { 4.min(words.len()) };

    let title = words[..count]
        .iter()
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ");

    Some(title)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_tokens_kept_from_longer_questions() {
        assert_eq!(
            derive_title("what is the refund policy for damaged goods").as_deref(),
            Some("What Is The Refund")
        );
    }

    #[test]
    fn test_exactly_three_tokens_keeps_three() {
        assert_eq!(derive_title("refund damaged goods").as_deref(), Some("Refund Damaged Goods"));
    }

    #[test]
    fn test_one_or_two_tokens_keep_all() {
        assert_eq!(derive_title("refunds").as_deref(), Some("Refunds"));
        assert_eq!(derive_title("refund policy").as_deref(), Some("Refund Policy"));
    }

    #[test]
    fn test_no_tokens_returns_none() {
        assert_eq!(derive_title(""), None);
        assert_eq!(derive_title("!?!? ... ---"), None);
    }

    #[test]
    fn test_punctuation_splits_tokens() {
        assert_eq!(
            derive_title("refunds: how, when & why?").as_deref(),
            Some("Refunds How When Why")
        );
    }

    #[test]
    fn test_numbers_count_as_tokens() {
        assert_eq!(derive_title("form 1099 filing deadline 2025").as_deref(), Some("Form 1099 Filing Deadline"));
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let input = "what is the refund policy";
        assert_eq!(derive_title(input), derive_title(input));
    }

    #[test]
    fn test_unicode_words_capitalize() {
        assert_eq!(derive_title("état des remboursements").as_deref(), Some("État Des Remboursements"));
    }
}
