//! Identity parser for card-swipe data
//!
//! A magstripe reader in keyboard-wedge mode types the track data followed
//! by Enter. The identifier we want is the run of letters that sits between
//! the numeric card number and the `?` end sentinel, e.g.
//! `;6008123456789jdoe?` → `jdoe`.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Longest identifier accepted from a swipe
pub const MAX_IDENTIFIER_LEN: usize = 8;

fn swipe_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+([A-Za-z]{1,8})\?").expect("swipe pattern is valid"))
}

/// A short lowercase alphabetic token identifying a participant.
///
/// Always matches `^[a-z]{1,8}$`; the only way to build one is through
/// [`extract_identifier`] or [`Identifier::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate an already-isolated token (1-8 ASCII letters, any case)
    pub fn parse(token: &str) -> Option<Self> {
        let valid = !token.is_empty()
            && token.len() <= MAX_IDENTIFIER_LEN
            && token.chars().all(|c| c.is_ascii_alphabetic());
        valid.then(|| Identifier(token.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mail address formed by appending the institution domain
    pub fn email(&self, domain: &str) -> String {
        format!("{}@{}", self.0, domain.trim_start_matches('@'))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the identifier from raw swipe text.
///
/// Returns the letters of the leftmost `<digits><1-8 letters>?` match,
/// lowercased, or `None` when the pattern does not occur.
pub fn extract_identifier(raw: &str) -> Option<Identifier> {
    swipe_pattern()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Identifier::parse(m.as_str()))
}
