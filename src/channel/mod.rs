//! Realtime voice-channel seam.
//!
//! A voice channel is a long-lived bidirectional session with a
//! speech-enabled conversational provider. The provider's callback surface
//! (connect/disconnect/message/error) is re-expressed here as a single
//! ordered inbound event stream, so the session controller can consume it
//! like any other queue.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

pub mod elevenlabs;

pub use elevenlabs::ElevenLabsChannel;

/// Events delivered by an open channel, in arrival order.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The provider acknowledged the session.
    Connected,
    /// The provider closed the session.
    Disconnected,
    /// A raw structured payload. The shape is provider-specific and not
    /// contractually stable; see [`crate::normalize`].
    Message(Value),
    /// Transport-level failure. The session is unusable afterwards.
    Error(String),
}

/// A realtime bidirectional session primitive.
#[async_trait]
pub trait VoiceChannel: Send + Sync {
    /// Begins a session with the given agent.
    ///
    /// Connection establishment is asynchronous: `Connected` (or `Error`)
    /// arrives on the returned event stream. An immediate `Err` means the
    /// session could not even be initiated.
    async fn open(&self, agent_id: &str) -> Result<ChannelSession>;
}

/// Handle for terminating an open channel session.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Requests session termination. Best-effort.
    async fn close(&self) -> Result<()>;
}

/// An open channel session: the inbound event stream plus its control handle.
pub struct ChannelSession {
    pub events: mpsc::Receiver<ChannelEvent>,
    pub handle: Box<dyn ChannelHandle>,
}
