//! Session lifecycle state machine and the intent-dispatch loop.
//!
//! [`SessionController`] owns one realtime voice session at a time. Channel
//! events are consumed strictly in arrival order by an ingest task; user
//! transcripts are appended to the conversation at ingestion time and then
//! queued for a single dispatch worker. Because the worker processes the
//! queue sequentially, dispatch results are applied in transcript
//! submission order even when downstream calls would complete out of order,
//! while ingestion itself never blocks on a dispatch.

use crate::channel::{ChannelEvent, ChannelHandle, VoiceChannel};
use crate::code_buffer::CodeBufferStore;
use crate::conversation::{ConversationStore, Message};
use crate::dispatch::ActionDispatcher;
use crate::error::{EchoError, Result};
use crate::intent;
use crate::normalize::{self, EventKind};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Broadcast capacity for observer events.
const EVENT_BROADCAST_CAPACITY: usize = 64;

/// Assistant message seeded into a fresh conversation.
const WELCOME_MESSAGE: &str = "Welcome to EchoCode! I can help you generate code, debug issues, \
     or explain code. Try saying \"generate a function to add two numbers\"!";

/// Lifecycle state of the voice session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    Ended,
    Error { detail: String },
}

/// Events broadcast to observers (UI layers, tests).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// A user transcript was appended to the conversation.
    UserTranscript(Message),
    /// The voice agent spoke. Surfaced for display only, never dispatched.
    AgentResponse(String),
    /// The dispatch worker appended an assistant reply.
    AssistReply(Message),
    /// The code buffer was replaced by a successful Generate.
    CodeUpdated(String),
}

/// Owns the realtime session lifecycle and the intent-dispatch loop.
///
/// All collaborators are injected; the controller holds no process-wide
/// state and can be constructed freely in tests.
pub struct SessionController {
    channel: Arc<dyn VoiceChannel>,
    dispatcher: Arc<ActionDispatcher>,
    conversation: Arc<ConversationStore>,
    code: Arc<CodeBufferStore>,
    state: Arc<Mutex<SessionState>>,
    session_id: Mutex<Option<String>>,
    handle: Mutex<Option<Arc<dyn ChannelHandle>>>,
    cancel: Mutex<CancellationToken>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Creates a controller over injected collaborators and seeds the
    /// welcome message.
    #[must_use]
    pub fn new(
        channel: Arc<dyn VoiceChannel>,
        dispatcher: Arc<ActionDispatcher>,
        conversation: Arc<ConversationStore>,
        code: Arc<CodeBufferStore>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_BROADCAST_CAPACITY);
        conversation.push_ai(WELCOME_MESSAGE);
        Self {
            channel,
            dispatcher,
            conversation,
            code,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            session_id: Mutex::new(None),
            handle: Mutex::new(None),
            cancel: Mutex::new(CancellationToken::new()),
            events_tx,
        }
    }

    /// Wires the default production collaborators (ElevenLabs channel,
    /// Gemini assist) from config.
    pub fn from_config(config: &crate::config::EchoConfig) -> Result<Self> {
        let channel = Arc::new(crate::channel::ElevenLabsChannel::new(
            config.voice.api_url.clone(),
        ));
        let assist: Arc<dyn crate::assist::CodeAssist> =
            Arc::new(crate::assist::GeminiAssist::from_config(&config.assist)?);
        Ok(Self::new(
            channel,
            Arc::new(ActionDispatcher::new(assist)),
            Arc::new(ConversationStore::new()),
            Arc::new(CodeBufferStore::new(crate::code_buffer::CodeBuffer {
                code: config.editor.initial_code.clone(),
                language: config.editor.language,
            })),
        ))
    }

    /// Starts a voice session with the given agent.
    ///
    /// A blank agent id is a configuration error and fails before any
    /// connection attempt. Starting while already connecting/connected is
    /// tolerated as a no-op.
    pub async fn start(&self, agent_id: &str) -> Result<()> {
        {
            let state = lock(&self.state);
            if matches!(*state, SessionState::Connecting | SessionState::Connected) {
                debug!(?state, "start ignored: session already active");
                return Ok(());
            }
        }

        let agent_id = agent_id.trim();
        if agent_id.is_empty() {
            let detail = "voice agent id is not set".to_owned();
            self.set_state(SessionState::Error {
                detail: detail.clone(),
            });
            return Err(EchoError::Config(detail));
        }

        self.set_state(SessionState::Connecting);
        *lock(&self.session_id) = Some(uuid::Uuid::new_v4().to_string());
        info!(agent_id, "starting voice session");

        let session = match self.channel.open(agent_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "voice session failed to start");
                self.set_state(SessionState::Error {
                    detail: e.to_string(),
                });
                return Err(e);
            }
        };

        *lock(&self.handle) = Some(Arc::from(session.handle));
        let cancel = CancellationToken::new();
        *lock(&self.cancel) = cancel.clone();

        // Transcripts flow to a single worker; FIFO consumption gives
        // submission-order application of dispatch results.
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_dispatch_worker(
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.conversation),
            Arc::clone(&self.code),
            self.events_tx.clone(),
            dispatch_rx,
            cancel.clone(),
        ));
        tokio::spawn(run_ingest(
            session.events,
            Arc::clone(&self.state),
            Arc::clone(&self.conversation),
            self.events_tx.clone(),
            dispatch_tx,
            cancel,
        ));

        Ok(())
    }

    /// Ends the session. Only meaningful from `Connected`; the state becomes
    /// `Ended` regardless of whether the provider-side termination succeeds.
    pub async fn stop(&self) -> Result<()> {
        {
            let state = lock(&self.state);
            if *state != SessionState::Connected {
                debug!(?state, "stop ignored: session not connected");
                return Ok(());
            }
        }

        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.close().await {
                warn!(error = %e, "voice channel close failed");
            }
        }
        lock(&self.cancel).cancel();
        self.set_state(SessionState::Ended);
        info!("voice session ended");
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        lock(&self.state).clone()
    }

    /// Opaque id of the current session, if one was started.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        lock(&self.session_id).clone()
    }

    /// Subscribes to observer events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }

    /// The conversation log this controller appends to.
    #[must_use]
    pub fn conversation(&self) -> &Arc<ConversationStore> {
        &self.conversation
    }

    /// The code buffer this controller's dispatch loop writes to.
    #[must_use]
    pub fn code(&self) -> &Arc<CodeBufferStore> {
        &self.code
    }

    fn set_state(&self, next: SessionState) {
        set_state(&self.state, &self.events_tx, next);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn set_state(
    state: &Mutex<SessionState>,
    events_tx: &broadcast::Sender<SessionEvent>,
    next: SessionState,
) {
    *lock(state) = next.clone();
    let _ = events_tx.send(SessionEvent::StateChanged(next));
}

/// Ingest loop: consumes channel events strictly in arrival order.
async fn run_ingest(
    mut events: mpsc::Receiver<ChannelEvent>,
    state: Arc<Mutex<SessionState>>,
    conversation: Arc<ConversationStore>,
    events_tx: broadcast::Sender<SessionEvent>,
    dispatch_tx: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => return,
            event = events.recv() => match event {
                Some(event) => event,
                None => return,
            },
        };

        match event {
            ChannelEvent::Connected => {
                info!("voice session connected");
                set_state(&state, &events_tx, SessionState::Connected);
            }
            ChannelEvent::Disconnected => {
                info!("voice session disconnected");
                set_state(&state, &events_tx, SessionState::Ended);
                return;
            }
            ChannelEvent::Error(detail) => {
                warn!(%detail, "voice session transport error");
                set_state(&state, &events_tx, SessionState::Error { detail });
                return;
            }
            ChannelEvent::Message(raw) => {
                if *lock(&state) != SessionState::Connected {
                    debug!("message ignored outside connected state");
                    continue;
                }
                let Some(event) = normalize::normalize(&raw) else {
                    continue;
                };
                match event.kind {
                    EventKind::UserTranscript => {
                        let message = conversation.push_user(&event.text);
                        let _ = events_tx.send(SessionEvent::UserTranscript(message));
                        if dispatch_tx.send(event.text).is_err() {
                            warn!("dispatch worker is gone; transcript not dispatched");
                        }
                    }
                    EventKind::AgentResponse => {
                        let _ = events_tx.send(SessionEvent::AgentResponse(event.text));
                    }
                }
            }
        }
    }
}

/// Dispatch worker: drains the transcript queue sequentially, applying
/// conversation and code updates in submission order.
async fn run_dispatch_worker(
    dispatcher: Arc<ActionDispatcher>,
    conversation: Arc<ConversationStore>,
    code: Arc<CodeBufferStore>,
    events_tx: broadcast::Sender<SessionEvent>,
    mut transcripts: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    loop {
        let transcript = tokio::select! {
            () = cancel.cancelled() => return,
            transcript = transcripts.recv() => match transcript {
                Some(transcript) => transcript,
                None => return,
            },
        };

        let intent = intent::classify(&transcript);
        debug!(?intent, %transcript, "dispatching transcript");

        let snapshot = code.snapshot();
        let outcome = dispatcher.dispatch(intent, &transcript, &snapshot).await;

        if let Some(new_code) = outcome.code_update {
            code.replace_code(new_code.clone());
            let _ = events_tx.send(SessionEvent::CodeUpdated(new_code));
        }
        let message = conversation.push_ai(outcome.reply);
        let _ = events_tx.send(SessionEvent::AssistReply(message));
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::assist::CodeAssist;
    use crate::code_buffer::{CodeBuffer, Language};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct EchoAssist;

    #[async_trait]
    impl CodeAssist for EchoAssist {
        async fn generate_code(&self, request: &str, _language: Language) -> Result<String> {
            Ok(format!("// {request}"))
        }

        async fn debug_code(
            &self,
            _code: &str,
            report: &str,
            _language: Language,
        ) -> Result<String> {
            Ok(format!("suggestion for {report}"))
        }

        async fn explain_code(&self, _code: &str, _language: Language) -> Result<String> {
            Ok("an explanation".to_owned())
        }
    }

    /// Hands out a pre-scripted event stream on `open` and records calls.
    struct ScriptedChannel {
        events: Mutex<Option<mpsc::Receiver<ChannelEvent>>>,
        open_calls: AtomicUsize,
        close_fails: bool,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedChannel {
        fn new(events: mpsc::Receiver<ChannelEvent>) -> Self {
            Self {
                events: Mutex::new(Some(events)),
                open_calls: AtomicUsize::new(0),
                close_fails: false,
                closed: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    struct ScriptedHandle {
        fails: bool,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl ChannelHandle for ScriptedHandle {
        async fn close(&self) -> Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            if self.fails {
                Err(EchoError::Connection("close refused".to_owned()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl VoiceChannel for ScriptedChannel {
        async fn open(&self, _agent_id: &str) -> Result<crate::channel::ChannelSession> {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            let events = lock(&self.events)
                .take()
                .ok_or_else(|| EchoError::Connection("already opened".to_owned()))?;
            Ok(crate::channel::ChannelSession {
                events,
                handle: Box::new(ScriptedHandle {
                    fails: self.close_fails,
                    closed: Arc::clone(&self.closed),
                }),
            })
        }
    }

    fn controller(channel: Arc<dyn VoiceChannel>) -> SessionController {
        SessionController::new(
            channel,
            Arc::new(ActionDispatcher::new(Arc::new(EchoAssist))),
            Arc::new(ConversationStore::new()),
            Arc::new(CodeBufferStore::new(CodeBuffer::default())),
        )
    }

    async fn wait_for_state(
        events: &mut broadcast::Receiver<SessionEvent>,
        wanted: &SessionState,
    ) {
        loop {
            let event = tokio::time::timeout(std::time::Duration::from_secs(2), events.recv())
                .await
                .expect("timed out waiting for state")
                .expect("event stream closed");
            if let SessionEvent::StateChanged(state) = event {
                if state == *wanted {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn new_controller_is_idle_and_seeds_welcome() {
        let (_tx, rx) = mpsc::channel(8);
        let controller = controller(Arc::new(ScriptedChannel::new(rx)));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.session_id().is_none());

        let messages = controller.conversation().messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.starts_with("Welcome to EchoCode!"));
    }

    #[tokio::test]
    async fn blank_agent_id_fails_without_opening_channel() {
        let (_tx, rx) = mpsc::channel(8);
        let channel = Arc::new(ScriptedChannel::new(rx));
        let controller = controller(channel.clone());

        let result = controller.start("   ").await;
        assert!(matches!(result, Err(EchoError::Config(_))));
        assert!(matches!(controller.state(), SessionState::Error { .. }));
        assert_eq!(channel.open_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_twice_is_a_tolerated_no_op() {
        let (tx, rx) = mpsc::channel(8);
        let channel = Arc::new(ScriptedChannel::new(rx));
        let controller = controller(channel.clone());
        let mut events = controller.subscribe();

        controller.start("agent-1").await.unwrap();
        tx.send(ChannelEvent::Connected).await.unwrap();
        wait_for_state(&mut events, &SessionState::Connected).await;

        controller.start("agent-1").await.unwrap();
        assert_eq!(channel.open_calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), SessionState::Connected);
    }

    #[tokio::test]
    async fn open_failure_transitions_to_error() {
        let (_tx, rx) = mpsc::channel(8);
        let channel = Arc::new(ScriptedChannel::new(rx));
        // Exhaust the scripted stream so the second open fails.
        let _ = channel.open("agent-1").await.unwrap();
        let controller = controller(channel);

        let result = controller.start("agent-1").await;
        assert!(result.is_err());
        assert!(matches!(controller.state(), SessionState::Error { .. }));
    }

    #[tokio::test]
    async fn transport_error_records_detail() {
        let (tx, rx) = mpsc::channel(8);
        let controller = controller(Arc::new(ScriptedChannel::new(rx)));
        let mut events = controller.subscribe();

        controller.start("agent-1").await.unwrap();
        tx.send(ChannelEvent::Connected).await.unwrap();
        tx.send(ChannelEvent::Error("socket reset".to_owned()))
            .await
            .unwrap();

        wait_for_state(
            &mut events,
            &SessionState::Error {
                detail: "socket reset".to_owned(),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn stop_reaches_ended_even_when_close_fails() {
        let (tx, rx) = mpsc::channel(8);
        let mut channel = ScriptedChannel::new(rx);
        channel.close_fails = true;
        let channel = Arc::new(channel);
        let controller = controller(channel.clone());
        let mut events = controller.subscribe();

        controller.start("agent-1").await.unwrap();
        tx.send(ChannelEvent::Connected).await.unwrap();
        wait_for_state(&mut events, &SessionState::Connected).await;

        controller.stop().await.unwrap();
        assert_eq!(controller.state(), SessionState::Ended);
        assert!(channel.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stop_before_connect_is_a_no_op() {
        let (_tx, rx) = mpsc::channel(8);
        let controller = controller(Arc::new(ScriptedChannel::new(rx)));
        controller.stop().await.unwrap();
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn messages_before_connected_are_ignored() {
        let (tx, rx) = mpsc::channel(8);
        let controller = controller(Arc::new(ScriptedChannel::new(rx)));
        let mut events = controller.subscribe();

        controller.start("agent-1").await.unwrap();
        // Transcript arrives before the Connected ack.
        tx.send(ChannelEvent::Message(serde_json::json!({
            "type": "user_transcript", "message": "generate something"
        })))
        .await
        .unwrap();
        tx.send(ChannelEvent::Connected).await.unwrap();
        wait_for_state(&mut events, &SessionState::Connected).await;

        // Only the welcome message is present.
        assert_eq!(controller.conversation().len(), 1);
    }
}
