//! Keyword-based intent classification for user transcripts.
//!
//! Deliberately a small deterministic classifier: case-insensitive
//! substring matching against ordered keyword sets. No model, no state.

/// The classified purpose of a user transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Produce a new code artifact.
    Generate,
    /// Diagnose a problem in the current code.
    Debug,
    /// Explain the current code.
    Explain,
    /// No keyword matched.
    Unknown,
}

/// (intent, keywords) — earlier entries win, so "fix the generate function"
/// resolves to `Generate`, not `Debug`.
const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::Generate,
        &["generate", "create", "write", "make", "build"],
    ),
    (Intent::Debug, &["debug", "fix", "error"]),
    (Intent::Explain, &["explain", "what does"]),
];

/// Classifies a transcript. Pure and total; never fails.
#[must_use]
pub fn classify(transcript: &str) -> Intent {
    let lowered = transcript.to_lowercase();
    for (intent, keywords) in INTENT_TABLE {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return *intent;
        }
    }
    Intent::Unknown
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn generate_keywords_classify() {
        assert_eq!(
            classify("generate a function to add two numbers"),
            Intent::Generate
        );
        assert_eq!(classify("Create a Python function"), Intent::Generate);
        assert_eq!(classify("please WRITE some code"), Intent::Generate);
        assert_eq!(classify("make it faster"), Intent::Generate);
        assert_eq!(classify("build a parser"), Intent::Generate);
    }

    #[test]
    fn debug_and_explain_keywords_classify() {
        assert_eq!(classify("debug this"), Intent::Debug);
        assert_eq!(classify("there is an error here"), Intent::Debug);
        assert_eq!(classify("explain what this does"), Intent::Explain);
        assert_eq!(classify("what does this loop do"), Intent::Explain);
    }

    #[test]
    fn generate_takes_precedence_over_debug() {
        assert_eq!(classify("fix the generate function"), Intent::Generate);
    }

    #[test]
    fn debug_takes_precedence_over_explain() {
        assert_eq!(classify("explain the fix"), Intent::Debug);
    }

    #[test]
    fn no_keyword_is_unknown() {
        assert_eq!(classify("hello there"), Intent::Unknown);
        assert_eq!(classify(""), Intent::Unknown);
    }
}
