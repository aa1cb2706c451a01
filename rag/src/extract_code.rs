use std::sync::LazyLock;

use regex::Regex;

// 3-7 letters, optional space/hyphen separator, exactly 3 digits.
static COURSE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z]{3,7}\s*-?\s*[0-9]{3}\b").expect("course code pattern is valid")
});

/// Lookup key for a course code: uppercase, whitespace and hyphens removed.
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Returns the normalized form of the leftmost course-code-shaped token in `text`.
pub fn extract_code(text: &str) -> Option<String> {
    COURSE_CODE.find(text).map(|m| normalize_code(m.as_str()))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn spacing_hyphen_and_case_are_normalized() {
        for text in ["infost-790", "INFOST 790", "InfoSt790", "about infost - 790?"] {
            assert_eq!(extract_code(text).as_deref(), Some("INFOST790"), "{text}");
        }
    }

    #[test]
    fn finds_code_inside_a_question() {
        assert_eq!(
            extract_code("What are the prerequisites for INFOST 790?").as_deref(),
            Some("INFOST790")
        );
    }

    #[test]
    fn leftmost_code_wins() {
        assert_eq!(
            extract_code("compare COMPSCI 557 and INFOST 790").as_deref(),
            Some("COMPSCI557")
        );
    }

    #[test]
    fn seven_letters_match() {
        assert_eq!(extract_code("COMPSCI790").as_deref(), Some("COMPSCI790"));
    }

    #[test]
    fn wrong_letter_or_digit_counts_do_not_match() {
        assert_eq!(extract_code("CS50"), None);
        assert_eq!(extract_code("CS 500"), None);
        assert_eq!(extract_code("ABCDEFGH 790"), None);
        assert_eq!(extract_code("INFOST 79"), None);
        assert_eq!(extract_code("INFOST 7901"), None);
    }

    #[test]
    fn plain_text_has_no_code() {
        assert_eq!(extract_code("Tell me about database systems"), None);
        assert_eq!(extract_code(""), None);
    }

    #[test]
    fn normalize_strips_inner_whitespace() {
        assert_eq!(normalize_code(" infost\t- 790 "), "INFOST790");
    }

    proptest! {
        #[test]
        fn any_valid_code_normalizes(
            letters in "[A-Za-z]{3,7}",
            sep in prop::sample::select(vec!["", " ", "-", " - ", "  "]),
            digits in "[0-9]{3}",
        ) {
            let question = format!("what about {letters}{sep}{digits}?");
            let expected = format!("{}{digits}", letters.to_uppercase());
            prop_assert_eq!(extract_code(&question), Some(expected));
        }
    }
}
