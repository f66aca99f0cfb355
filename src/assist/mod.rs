//! Code-assist capability seam consumed by the dispatcher.

use crate::code_buffer::Language;
use crate::error::Result;
use async_trait::async_trait;

pub mod gemini;

pub use gemini::GeminiAssist;

/// Downstream code-assist capabilities.
///
/// The `{success, …, error?}` wire contract of the backend maps to `Result`
/// at this seam; the dispatcher is the boundary that absorbs `Err` and turns
/// it into conversation content.
#[async_trait]
pub trait CodeAssist: Send + Sync {
    /// Generates code in `language` from a spoken request.
    async fn generate_code(&self, request: &str, language: Language) -> Result<String>;

    /// Diagnoses `code` against a spoken problem report.
    async fn debug_code(&self, code: &str, report: &str, language: Language) -> Result<String>;

    /// Explains what `code` does.
    async fn explain_code(&self, code: &str, language: Language) -> Result<String>;
}
