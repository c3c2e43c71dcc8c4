/// Pure string processing utilities (Discord-agnostic)

/// Case-insensitive substring test used to narrow suggestion lists.
/// An empty or blank needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Check if a string is empty after trimming
pub fn is_empty_or_whitespace(text: &str) -> bool {
    text.trim().is_empty()
}

/// Normalize an optional free-text value: blank becomes `None`
pub fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string())
        .filter(|t| !is_empty_or_whitespace(t))
}
