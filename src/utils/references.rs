/// Pure functions for parsing member references (Discord-agnostic)

/// Parse one trimmed token as `<@id>`, `<@!id>` or a bare `id`
pub fn parse_reference(token: &str) -> Option<u64> {
    let token = token.trim();
    let digits = match token.strip_prefix("<@") {
        Some(rest) => {
            let rest = rest.strip_suffix('>')?;
            rest.strip_prefix('!').unwrap_or(rest)
        }
        None => token,
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Snowflakes are never zero; anything wider than u64 is not a snowflake either
    digits.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Resolve a comma separated list of references, keeping order and duplicates.
/// Tokens that match neither grammar are dropped.
pub fn resolve_references(raw: &str) -> Vec<u64> {
    raw.split(',').filter_map(parse_reference).collect()
}

/// Resolve several raw values as if they were joined with commas
pub fn resolve_all<S: AsRef<str>>(raws: &[S]) -> Vec<u64> {
    raws.iter()
        .flat_map(|raw| resolve_references(raw.as_ref()))
        .collect()
}

/// Mention form used as autocomplete value
pub fn mention(id: u64) -> String {
    format!("<@{}>", id)
}
