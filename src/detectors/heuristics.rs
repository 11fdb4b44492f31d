//! Prompt heuristics shared by the text-based detectors.

/// Characters that are dense in source code and sparse in prose.
const CODE_CHARS: &str = "(){}<>[];:,.";

/// Ratio of [`CODE_CHARS`] to total characters above which text counts as code.
const CODE_CHAR_RATIO: f64 = 0.3;

/// Whether `text` looks like a code block rather than prose.
///
/// True when the text opens with a fenced-code marker or when more than 30%
/// of its characters are brackets or punctuation. Leading indentation alone
/// does not count.
pub(crate) fn is_code_like(text: &str) -> bool {
    if text.trim_start().starts_with("```") {
        return true;
    }

    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let special = text.chars().filter(|c| CODE_CHARS.contains(*c)).count();
    special as f64 / total as f64 > CODE_CHAR_RATIO
}

/// Character length of `text` with surrounding whitespace removed.
pub(crate) fn trimmed_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// Round a confidence score to two decimals.
pub(crate) fn round_confidence(value: f64) -> f64 {
    ((value * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

/// The slice of `text` extending `radius` characters either side of the
/// byte range `start..end`.
pub(crate) fn window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let lo = text[..start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map_or(start, |(i, _)| i);
    let hi = text[end..]
        .char_indices()
        .nth(radius)
        .map_or(text.len(), |(i, _)| end + i);
    &text[lo..hi]
}

/// Format an integer with `,` thousands separators.
pub(crate) fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
