/// Turns a display name into a URL-safe slug candidate.
///
/// Lower-cases and trims the input, drops anything that is not an ASCII letter, digit,
/// whitespace or hyphen, then folds whitespace and hyphen runs into single hyphens.
/// An input with nothing left after stripping yields an empty string.
pub fn generate(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;

    for ch in lowered.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_hyphen = true;
        } else if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        }
    }

    out
}

/// Composes the slug tried on the `attempt`-th claim: the base first, then `base-2`, `base-3`...
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}
