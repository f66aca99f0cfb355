//! EchoCode: voice-session orchestration for a pair-programming assistant.
//!
//! The crate reduces a realtime voice-agent session to a deterministic loop:
//! channel events → normalization → intent classification → dispatch →
//! conversation / code-buffer updates.
//!
//! # Architecture
//!
//! The loop is built from independent pieces connected by async channels:
//! - **Voice channel**: a bidirectional session with the speech provider,
//!   delivered as one ordered event stream ([`channel`])
//! - **Normalizer**: reduces the provider's unstable payload shapes to
//!   canonical transcript/response events ([`normalize`])
//! - **Intent classifier**: deterministic keyword matching ([`intent`])
//! - **Dispatcher**: invokes the code-assist backend and absorbs its
//!   failures into conversation content ([`dispatch`])
//! - **Session controller**: the state machine that owns the session
//!   lifecycle and applies dispatch results in submission order
//!   ([`session`])
//!
//! Conversation history and the code artifact live in [`conversation`] and
//! [`code_buffer`]; both are single-writer by construction.

pub mod assist;
pub mod channel;
pub mod code_buffer;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod error;
pub mod intent;
pub mod normalize;
pub mod session;

pub use code_buffer::{CodeBuffer, CodeBufferStore, Language};
pub use config::EchoConfig;
pub use conversation::{ConversationStore, Message, Speaker};
pub use dispatch::{ActionDispatcher, DispatchOutcome};
pub use error::{EchoError, Result};
pub use intent::{Intent, classify};
pub use normalize::{CanonicalEvent, EventKind, normalize};
pub use session::{SessionController, SessionEvent, SessionState};
