//! Voice dictation as a two-state controller over a host capability.

use tracing::{debug, warn};

use chatdesk_shared::{CaptureState, Result, VoiceConfig};

/// Identifies one listening session of a controller.
pub type SessionId = u64;

/// Options handed to the capability when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// BCP 47 language tag.
    pub language: String,
    /// Always false: a session ends after one final result.
    pub continuous: bool,
    /// Always false: partial text is never delivered.
    pub interim_results: bool,
}

impl SessionOptions {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            continuous: false,
            interim_results: false,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new("en-US")
    }
}

impl From<&VoiceConfig> for SessionOptions {
    fn from(config: &VoiceConfig) -> Self {
        Self::new(config.language.clone())
    }
}

/// The host's dictation facility.
///
/// Results come back asynchronously as [`DictationEvent`]s tagged with the
/// session they belong to.
pub trait DictationCapability: Send {
    fn start(&mut self, session: SessionId, options: &SessionOptions) -> Result<()>;
    fn stop(&mut self, session: SessionId);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationEventKind {
    /// Final recognized text.
    Transcript(String),
    /// The capability reported an error.
    Error(String),
    /// The session ended without (further) results.
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictationEvent {
    pub session: SessionId,
    pub kind: DictationEventKind,
}

impl DictationEvent {
    pub fn transcript(session: SessionId, text: impl Into<String>) -> Self {
        Self {
            session,
            kind: DictationEventKind::Transcript(text.into()),
        }
    }

    pub fn error(session: SessionId, reason: impl Into<String>) -> Self {
        Self {
            session,
            kind: DictationEventKind::Error(reason.into()),
        }
    }

    pub fn ended(session: SessionId) -> Self {
        Self {
            session,
            kind: DictationEventKind::Ended,
        }
    }
}

/// Idle/Listening controller around a [`DictationCapability`].
pub struct VoiceCaptureController {
    capability: Box<dyn DictationCapability>,
    options: SessionOptions,
    state: CaptureState,
    /// Session currently listening, if any.
    active: Option<SessionId>,
    last_session: SessionId,
}

impl std::fmt::Debug for VoiceCaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCaptureController")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl VoiceCaptureController {
    /// Build a controller if the host has a dictation capability.
    pub fn probe(
        capability: Option<Box<dyn DictationCapability>>,
        options: SessionOptions,
    ) -> Option<Self> {
        let Some(capability) = capability else {
            debug!("no dictation capability, voice input unavailable");
            return None;
        };
        Some(Self {
            capability,
            options,
            state: CaptureState::Idle,
            active: None,
            last_session: 0,
        })
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == CaptureState::Listening
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Start listening when idle, stop when listening. Returns the new state.
    pub fn toggle(&mut self) -> CaptureState {
        if self.is_listening() {
            self.cancel();
            return self.state;
        }

        self.last_session += 1;
        let session = self.last_session;
        match self.capability.start(session, &self.options) {
            Ok(()) => {
                self.active = Some(session);
                self.state = CaptureState::Listening;
                debug!(session, language = %self.options.language, "dictation started");
            }
            Err(e) => self.fail(session, &e.to_string()),
        }
        self.state
    }

    /// Stop the active session, if any. A result arriving later is discarded.
    pub fn cancel(&mut self) {
        if let Some(session) = self.active.take() {
            self.capability.stop(session);
            debug!(session, "dictation stopped");
        }
        self.state = CaptureState::Idle;
    }

    /// Apply a capability event. Returns the transcript to append, if any.
    pub fn handle_event(&mut self, event: DictationEvent) -> Option<String> {
        if self.active != Some(event.session) {
            debug!(
                session = event.session,
                active = ?self.active,
                "discarding event from inactive dictation session"
            );
            return None;
        }

        self.active = None;
        match event.kind {
            DictationEventKind::Transcript(text) => {
                self.state = CaptureState::Idle;
                debug!(session = event.session, chars = text.chars().count(), "transcript received");
                Some(text)
            }
            DictationEventKind::Error(reason) => {
                self.fail(event.session, &reason);
                None
            }
            DictationEventKind::Ended => {
                self.state = CaptureState::Idle;
                debug!(session = event.session, "dictation ended without transcript");
                None
            }
        }
    }

    fn fail(&mut self, session: SessionId, reason: &str) {
        self.state = CaptureState::Error;
        warn!(session, state = ?self.state, reason, "dictation failed");
        self.state = CaptureState::Idle;
    }
}
