use std::collections::BTreeSet;

pub type TokenSet = BTreeSet<String>;

/// Lower-cases `value` and splits it on every run of characters outside
/// `a-z0-9`. Accented letters count as separators.
pub fn tokenize(value: &str) -> TokenSet {
    let lower = value.to_lowercase();
    lower
        .split(|c: char| !(c.is_ascii_lowercase() || c.is_ascii_digit()))
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Same as [`tokenize`], after dropping a trailing `.ext` from the name.
pub fn tokenize_file_name(name: &str) -> TokenSet {
    tokenize(strip_extension(name))
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        // Needs at least one character after the dot.
        Some(idx) if idx + 1 < name.len() => &name[..idx],
        _ => name,
    }
}

/// Union of first and last name tokens. Empty when either side has no
/// tokens, which means the person can never be matched.
pub fn name_tokens(first: &str, last: &str) -> TokenSet {
    let first_tokens = tokenize(first);
    let last_tokens = tokenize(last);
    if first_tokens.is_empty() || last_tokens.is_empty() {
        return TokenSet::new();
    }
    first_tokens.into_iter().chain(last_tokens).collect()
}
