//! Routes classified intents to code-assist capabilities.

use crate::assist::CodeAssist;
use crate::code_buffer::CodeBuffer;
use crate::intent::Intent;
use std::sync::Arc;
use tracing::warn;

/// Guidance shown when no intent keyword matched.
const UNKNOWN_INTENT_REPLY: &str = "I can help you generate code, debug issues, or explain code. \
     Try saying \"generate a function\" or \"explain this code\"!";

/// Result of dispatching one transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Assistant-authored conversation reply.
    pub reply: String,
    /// Replacement code artifact. Present only on a successful Generate;
    /// Debug/Explain never produce one.
    pub code_update: Option<String>,
}

/// Invokes the capability matching an intent and shapes the result for the
/// conversation.
pub struct ActionDispatcher {
    assist: Arc<dyn CodeAssist>,
}

impl ActionDispatcher {
    #[must_use]
    pub fn new(assist: Arc<dyn CodeAssist>) -> Self {
        Self { assist }
    }

    /// Dispatches one transcript against a snapshot of the code buffer.
    ///
    /// Capability failures are absorbed here and expressed as the reply
    /// text; this never returns an error and never panics.
    pub async fn dispatch(
        &self,
        intent: Intent,
        transcript: &str,
        code: &CodeBuffer,
    ) -> DispatchOutcome {
        match intent {
            Intent::Generate => {
                match self.assist.generate_code(transcript, code.language).await {
                    Ok(generated) => DispatchOutcome {
                        reply: "I've generated the code for you!".to_owned(),
                        code_update: Some(generated),
                    },
                    Err(e) => {
                        warn!(error = %e, "generate capability failed");
                        DispatchOutcome {
                            reply: format!("Sorry, I couldn't generate the code: {e}"),
                            code_update: None,
                        }
                    }
                }
            }
            Intent::Debug => {
                match self
                    .assist
                    .debug_code(&code.code, transcript, code.language)
                    .await
                {
                    Ok(suggestion) => DispatchOutcome {
                        reply: suggestion,
                        code_update: None,
                    },
                    Err(e) => {
                        warn!(error = %e, "debug capability failed");
                        DispatchOutcome {
                            reply: format!("Sorry, I couldn't debug the code: {e}"),
                            code_update: None,
                        }
                    }
                }
            }
            Intent::Explain => match self.assist.explain_code(&code.code, code.language).await {
                Ok(explanation) => DispatchOutcome {
                    reply: explanation,
                    code_update: None,
                },
                Err(e) => {
                    warn!(error = %e, "explain capability failed");
                    DispatchOutcome {
                        reply: format!("Sorry, I couldn't explain the code: {e}"),
                        code_update: None,
                    }
                }
            },
            Intent::Unknown => DispatchOutcome {
                reply: UNKNOWN_INTENT_REPLY.to_owned(),
                code_update: None,
            },
        }
    }
}
