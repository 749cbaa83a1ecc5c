//! Transient failure classification.
//!
//! The provider does not expose a machine-readable error code for overload,
//! so "is this worth resubmitting" is decided by matching the human-readable
//! message. This is a narrow heuristic: it only recognises the provider's
//! "service unavailable" family. Everything else is fatal. The predicate is
//! a trait so the rules can be tested and swapped without touching the
//! retry loop.

use crate::errors::AtelierError;
use regex::Regex;

/// Phrases the provider uses when it is temporarily overloaded.
pub const DEFAULT_TRANSIENT_PHRASES: [&str; 3] = [
    "e003",
    "service is currently unavailable",
    "currently unavailable",
];

/// Decides whether a provider error message is safe to retry.
pub trait TransientClassifier: Send + Sync {
    /// Returns true if the whole job may be resubmitted.
    fn is_transient(&self, message: &str) -> bool;
}

impl<F> TransientClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_transient(&self, message: &str) -> bool {
        self(message)
    }
}

/// Case-insensitive substring match against a list of phrases.
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    phrases: Vec<String>,
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_TRANSIENT_PHRASES)
    }
}

impl PhraseClassifier {
    /// Creates a classifier from phrases.
    #[must_use]
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            phrases: phrases
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Adds a phrase.
    #[must_use]
    pub fn with_phrase(mut self, phrase: impl AsRef<str>) -> Self {
        let phrase = phrase.as_ref().to_lowercase();
        if !phrase.is_empty() {
            self.phrases.push(phrase);
        }
        self
    }

    /// The phrases in use, lowercased.
    #[must_use]
    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

impl TransientClassifier for PhraseClassifier {
    fn is_transient(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        self.phrases.iter().any(|p| message.contains(p.as_str()))
    }
}

/// Regular-expression classifier for rules a phrase list cannot express.
#[derive(Debug, Clone)]
pub struct RegexClassifier {
    pattern: Regex,
}

impl RegexClassifier {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns `AtelierError::Config` if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, AtelierError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| AtelierError::Config(format!("invalid transient pattern: {e}")))?;
        Ok(Self { pattern })
    }
}

impl TransientClassifier for RegexClassifier {
    fn is_transient(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}
