use once_cell::sync::Lazy;
use regex::Regex;

// Alternation order matters: `\r\n\t` must win over `\r\n`, and `\r\t` over a lone `\r`.
static NEWLINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(\r\n\t|\r\n|\n|\r\t|\r)").unwrap());

/// Strips every newline sequence from fragment text.
///
/// Removes CR LF TAB, CR LF, LF, CR TAB and a lone CR. Everything else, including spaces and
/// tabs that do not follow a carriage return, is left as it was.
pub fn normalize(text: &str) -> String {
    NEWLINE_REGEX.replace_all(text, "").into_owned()
}
