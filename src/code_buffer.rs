//! The shared code artifact and its single-writer store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Placeholder shown before any code has been generated.
pub const INITIAL_CODE: &str =
    "// Your generated code will appear here\n// Say \"generate a function to...\" to start coding!\n";

/// Language tag for the code artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Javascript,
    Python,
    Typescript,
    Java,
    Cpp,
    Go,
}

impl Language {
    /// Lowercase tag used in prompts and editor metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Python => "python",
            Self::Typescript => "typescript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Go => "go",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current code artifact and its language tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBuffer {
    pub code: String,
    pub language: Language,
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self {
            code: INITIAL_CODE.to_owned(),
            language: Language::default(),
        }
    }
}

/// Shared store for the code artifact.
///
/// Writers are serialized by construction: the dispatch worker replaces the
/// code wholesale on a successful Generate, and the editor collaborator
/// applies direct user edits. Debug/Explain never write.
#[derive(Debug, Default)]
pub struct CodeBufferStore {
    inner: Mutex<CodeBuffer>,
}

impl CodeBufferStore {
    #[must_use]
    pub fn new(buffer: CodeBuffer) -> Self {
        Self {
            inner: Mutex::new(buffer),
        }
    }

    /// Returns a copy of the current buffer.
    #[must_use]
    pub fn snapshot(&self) -> CodeBuffer {
        self.lock().clone()
    }

    /// Replaces the code wholesale, keeping the language tag.
    pub fn replace_code(&self, code: impl Into<String>) {
        self.lock().code = code.into();
    }

    /// Changes the language tag (editor language selector).
    pub fn set_language(&self, language: Language) {
        self.lock().language = language;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CodeBuffer> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
