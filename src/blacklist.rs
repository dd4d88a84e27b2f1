//! Blacklist gate: decides which strings are never sent for translation.
//! Patterns come in as one pipe-delimited string. Each piece is tried as a
//! regex; pieces that fail to compile degrade to literal substring matching
//! so a bad pattern can never take the whole filter down.

use regex::Regex;
use tracing::debug;

/// Default pattern set: icon escape codes, variable references, bare numbers.
/// Icon codes look like `\i[23]`; the pattern matches the `i[NN]` part so the
/// leading backslash in game text does not matter.
pub const DEFAULT_PATTERNS: &str = r"i\[\d+\]|^\$|^[0-9]+$";

enum Pattern {
    Regex(Regex),
    Literal(String),
}

/// Ordered pattern list evaluated before any cache or network work.
pub struct Blacklist {
    patterns: Vec<Pattern>,
}

impl Blacklist {
    /// Parse a pipe-delimited pattern string. Empty pieces are skipped.
    pub fn new(patterns: &str) -> Self {
        let patterns = patterns
            .split('|')
            .filter(|p| !p.is_empty())
            .map(|p| match Regex::new(p) {
                Ok(re) => Pattern::Regex(re),
                Err(_) => {
                    debug!(pattern = p, "blacklist pattern is not a valid regex, using literal match");
                    Pattern::Literal(p.to_string())
                }
            })
            .collect();
        Self { patterns }
    }

    /// True if `text` must not be translated: empty/whitespace-only text, or
    /// any pattern matches.
    pub fn is_blocked(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return true;
        }
        self.patterns.iter().any(|p| match p {
            Pattern::Regex(re) => re.is_match(text),
            Pattern::Literal(lit) => text.contains(lit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_whitespace_blocked() {
        let bl = Blacklist::new(DEFAULT_PATTERNS);
        assert!(bl.is_blocked(""));
        assert!(bl.is_blocked("   \n\t"));
    }

    #[test]
    fn numeric_only_blocked() {
        let bl = Blacklist::new(DEFAULT_PATTERNS);
        assert!(bl.is_blocked("12345"));
        assert!(!bl.is_blocked("12345 gold"));
    }

    #[test]
    fn dollar_prefix_blocked() {
        let bl = Blacklist::new(DEFAULT_PATTERNS);
        assert!(bl.is_blocked("$gameVariables"));
        assert!(!bl.is_blocked("price in $"));
    }

    #[test]
    fn icon_codes_blocked() {
        let bl = Blacklist::new(DEFAULT_PATTERNS);
        assert!(bl.is_blocked(r"\i[23] Potion"));
        assert!(bl.is_blocked("i[7]"));
        assert!(!bl.is_blocked("icon list"));
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        // "(" never compiles as a regex; must match as a substring instead.
        let bl = Blacklist::new("(");
        assert!(bl.is_blocked("call(x)"));
        assert!(!bl.is_blocked("plain text"));
    }

    #[test]
    fn plain_text_passes() {
        let bl = Blacklist::new(DEFAULT_PATTERNS);
        assert!(!bl.is_blocked("こんにちは、勇者よ。"));
        assert!(!bl.is_blocked("Hello there"));
    }

    #[test]
    fn empty_pattern_string_blocks_nothing_but_whitespace() {
        let bl = Blacklist::new("");
        assert!(!bl.is_blocked("anything"));
        assert!(bl.is_blocked(" "));
    }
}
