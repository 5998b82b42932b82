//! The in-progress user turn and its submission.

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use chatdesk_shared::{
    AttachmentId, AttachmentRecord, CaptureState, ChatTurn, ComposerSnapshot, TurnId,
};

use crate::attachments::IngestedBatch;
use crate::keys::{KeyAction, KeyPress, classify};
use crate::voice::{DictationEvent, VoiceCaptureController};

/// Receives finalized turns. Fire-and-forget: the reply arrives elsewhere.
pub trait TurnSender {
    fn send(&self, turn: ChatTurn);
}

impl TurnSender for mpsc::UnboundedSender<ChatTurn> {
    fn send(&self, turn: ChatTurn) {
        if mpsc::UnboundedSender::send(self, turn).is_err() {
            warn!("turn receiver dropped, turn discarded");
        }
    }
}

/// Result of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent(TurnId),
    /// Buffer empty or whitespace only; nothing sent.
    Empty,
    /// A previous turn is still in flight; nothing sent.
    InFlight,
}

/// Result of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Submitted(SubmitOutcome),
    NewlineInserted,
    Ignored,
}

/// Sole owner of the composer state for one chat session.
pub struct TurnComposer<S: TurnSender> {
    sender: S,
    text: String,
    attachments: Vec<AttachmentRecord>,
    voice: Option<VoiceCaptureController>,
}

impl<S: TurnSender> TurnComposer<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            text: String::new(),
            attachments: Vec::new(),
            voice: None,
        }
    }

    /// Attach a dictation controller (from [`VoiceCaptureController::probe`]).
    pub fn with_voice(mut self, voice: Option<VoiceCaptureController>) -> Self {
        self.voice = voice;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachments(&self) -> &[AttachmentRecord] {
        &self.attachments
    }

    pub fn voice_available(&self) -> bool {
        self.voice.is_some()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.voice
            .as_ref()
            .map_or(CaptureState::Idle, VoiceCaptureController::state)
    }

    pub fn snapshot(&self) -> ComposerSnapshot {
        ComposerSnapshot {
            text: self.text.clone(),
            attachments: self.attachments.clone(),
            capture_state: self.capture_state(),
        }
    }

    /// Replace the text buffer.
    pub fn update_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Whether [`submit`](Self::submit) would send right now.
    pub fn can_submit(&self, in_flight: bool) -> bool {
        !in_flight && !self.text.trim().is_empty()
    }

    /// Send the current turn unless the buffer is blank or a turn is in flight.
    ///
    /// Only the text is cleared afterwards; attachments stay until removed
    /// or the session is reset.
    #[instrument(skip(self))]
    pub fn submit(&mut self, in_flight: bool) -> SubmitOutcome {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            debug!("submit ignored: empty buffer");
            return SubmitOutcome::Empty;
        }
        if in_flight {
            debug!("submit ignored: turn in flight");
            return SubmitOutcome::InFlight;
        }

        let turn = ChatTurn {
            id: TurnId::new(),
            text: trimmed.to_string(),
            attachments: self.attachments.clone(),
            created_at: Utc::now(),
        };
        let id = turn.id;

        info!(
            turn_id = %id,
            chars = turn.text.chars().count(),
            attachments = turn.attachments.len(),
            "turn submitted"
        );
        self.sender.send(turn);
        self.text.clear();

        SubmitOutcome::Sent(id)
    }

    /// Append a completed ingestion batch, keeping arrival order.
    pub fn add_attachments(&mut self, batch: IngestedBatch) {
        let before = self.attachments.len();
        for record in batch.records {
            if self.attachments.iter().any(|a| a.id == record.id) {
                debug!(id = %record.id, "attachment already present, skipping");
                continue;
            }
            self.attachments.push(record);
        }
        debug!(
            batch_id = batch.batch_id,
            added = self.attachments.len() - before,
            total = self.attachments.len(),
            "attachments added"
        );
    }

    /// Remove an attachment by id. Returns `false` if it was not present.
    pub fn remove_attachment(&mut self, id: &AttachmentId) -> bool {
        let before = self.attachments.len();
        self.attachments.retain(|a| a.id != *id);
        before != self.attachments.len()
    }

    pub fn handle_key(&mut self, press: KeyPress, in_flight: bool) -> KeyOutcome {
        match classify(press) {
            KeyAction::Submit => KeyOutcome::Submitted(self.submit(in_flight)),
            KeyAction::InsertNewline => {
                self.text.push('\n');
                KeyOutcome::NewlineInserted
            }
            KeyAction::Passthrough => KeyOutcome::Ignored,
        }
    }

    /// Toggle dictation. `None` when the host has no dictation capability.
    pub fn toggle_voice(&mut self) -> Option<CaptureState> {
        self.voice.as_mut().map(VoiceCaptureController::toggle)
    }

    /// Feed a dictation event. Returns `true` if a transcript was appended.
    pub fn handle_dictation(&mut self, event: DictationEvent) -> bool {
        let Some(voice) = self.voice.as_mut() else {
            return false;
        };
        match voice.handle_event(event) {
            Some(transcript) => {
                self.text.push_str(&transcript);
                true
            }
            None => false,
        }
    }

    /// Start a new chat: clear text and attachments, stop dictation.
    pub fn reset(&mut self) {
        if let Some(voice) = self.voice.as_mut() {
            voice.cancel();
        }
        self.text.clear();
        self.attachments.clear();
        debug!("composer reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chatdesk_shared::Result;

    use crate::attachments::{AttachmentIngestor, FsFileReader, SelectedFile};
    use crate::voice::{DictationCapability, SessionId, SessionOptions};

    fn composer() -> (
        TurnComposer<mpsc::UnboundedSender<ChatTurn>>,
        mpsc::UnboundedReceiver<ChatTurn>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (TurnComposer::new(tx), rx)
    }

    fn batch(names: &[&str]) -> IngestedBatch {
        IngestedBatch {
            batch_id: 1,
            records: names
                .iter()
                .map(|n| AttachmentRecord::pending(*n, "text/plain", 3))
                .collect(),
            failed: 0,
        }
    }

    struct NullDictation;

    impl DictationCapability for NullDictation {
        fn start(&mut self, _session: SessionId, _options: &SessionOptions) -> Result<()> {
            Ok(())
        }
        fn stop(&mut self, _session: SessionId) {}
    }

    fn with_voice(
        composer: TurnComposer<mpsc::UnboundedSender<ChatTurn>>,
    ) -> TurnComposer<mpsc::UnboundedSender<ChatTurn>> {
        composer.with_voice(VoiceCaptureController::probe(
            Some(Box::new(NullDictation)),
            SessionOptions::default(),
        ))
    }

    #[test]
    fn blank_buffer_never_sends() {
        let (mut composer, mut rx) = composer();
        assert_eq!(composer.submit(false), SubmitOutcome::Empty);
        composer.update_text("   \n\t ");
        assert_eq!(composer.submit(false), SubmitOutcome::Empty);
        assert!(!composer.can_submit(false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn submit_sends_trimmed_text_and_clears_it() {
        let (mut composer, mut rx) = composer();
        composer.update_text("  How do I lower kiln fuel use?  ");
        let outcome = composer.submit(false);

        let turn = rx.try_recv().expect("turn sent");
        assert_eq!(outcome, SubmitOutcome::Sent(turn.id));
        assert_eq!(turn.text, "How do I lower kiln fuel use?");
        assert_eq!(composer.text(), "");
    }

    #[test]
    fn in_flight_guard_blocks_duplicates() {
        let (mut composer, mut rx) = composer();
        composer.update_text("first");

        let mut in_flight = false;
        assert!(matches!(composer.submit(in_flight), SubmitOutcome::Sent(_)));
        in_flight = true;

        composer.update_text("first");
        assert_eq!(composer.submit(in_flight), SubmitOutcome::InFlight);
        assert_eq!(composer.text(), "first");

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn attachments_ride_along_and_persist() {
        let (mut composer, mut rx) = composer();
        composer.add_attachments(batch(&["a.txt", "b.txt"]));
        composer.add_attachments(batch(&["c.txt"]));

        composer.update_text("see files");
        composer.submit(false);
        let turn = rx.try_recv().expect("turn");
        let names: Vec<&str> = turn.attachments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        // Still attached for the next turn.
        assert_eq!(composer.attachments().len(), 3);
        composer.update_text("and again");
        composer.submit(false);
        assert_eq!(rx.try_recv().expect("turn").attachments.len(), 3);
    }

    #[test]
    fn same_batch_added_twice_is_not_duplicated() {
        let (mut composer, _rx) = composer();
        let b = batch(&["a.txt"]);
        composer.add_attachments(b.clone());
        composer.add_attachments(b);
        assert_eq!(composer.attachments().len(), 1);
    }

    #[test]
    fn remove_attachment_by_id() {
        let (mut composer, _rx) = composer();
        composer.add_attachments(batch(&["a.txt", "b.txt"]));
        let id = composer.attachments()[0].id;

        assert!(composer.remove_attachment(&id));
        assert_eq!(composer.attachments().len(), 1);
        assert_eq!(composer.attachments()[0].name, "b.txt");

        // Unknown id is a no-op.
        assert!(!composer.remove_attachment(&AttachmentId::new()));
        assert!(!composer.remove_attachment(&id));
        assert_eq!(composer.attachments().len(), 1);
    }

    #[test]
    fn enter_submits_shift_enter_adds_newline() {
        let (mut composer, mut rx) = composer();
        composer.update_text("line one");

        assert_eq!(
            composer.handle_key(KeyPress::shift_enter(), false),
            KeyOutcome::NewlineInserted
        );
        assert_eq!(composer.text(), "line one\n");
        assert!(rx.try_recv().is_err());

        composer.update_text("line one\nline two");
        let outcome = composer.handle_key(KeyPress::enter(), false);
        assert!(matches!(outcome, KeyOutcome::Submitted(SubmitOutcome::Sent(_))));
        assert_eq!(rx.try_recv().expect("turn").text, "line one\nline two");
    }

    #[test]
    fn enter_while_in_flight_keeps_text() {
        let (mut composer, mut rx) = composer();
        composer.update_text("pending");
        assert_eq!(
            composer.handle_key(KeyPress::enter(), true),
            KeyOutcome::Submitted(SubmitOutcome::InFlight)
        );
        assert_eq!(composer.text(), "pending");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn voice_unavailable_without_capability() {
        let (mut composer, _rx) = composer();
        assert!(!composer.voice_available());
        assert_eq!(composer.toggle_voice(), None);
        assert!(!composer.handle_dictation(DictationEvent::transcript(1, "ignored")));
        assert_eq!(composer.text(), "");
    }

    #[test]
    fn transcript_is_appended_to_buffer() {
        let (composer, _rx) = composer();
        let mut composer = with_voice(composer);
        composer.update_text("Question: ");

        assert_eq!(composer.toggle_voice(), Some(CaptureState::Listening));
        assert_eq!(composer.snapshot().capture_state, CaptureState::Listening);

        assert!(composer.handle_dictation(DictationEvent::transcript(1, "what is clinker")));
        assert_eq!(composer.text(), "Question: what is clinker");
        assert_eq!(composer.capture_state(), CaptureState::Idle);
    }

    #[test]
    fn stopping_before_result_leaves_buffer_unchanged() {
        let (composer, _rx) = composer();
        let mut composer = with_voice(composer);
        composer.update_text("draft");

        assert_eq!(composer.toggle_voice(), Some(CaptureState::Listening));
        assert_eq!(composer.toggle_voice(), Some(CaptureState::Idle));
        assert!(!composer.handle_dictation(DictationEvent::transcript(1, "too late")));
        assert_eq!(composer.text(), "draft");
    }

    #[test]
    fn reset_clears_everything() {
        let (composer, _rx) = composer();
        let mut composer = with_voice(composer);
        composer.update_text("half typed");
        composer.add_attachments(batch(&["a.txt"]));
        composer.toggle_voice();

        composer.reset();
        let snapshot = composer.snapshot();
        assert_eq!(snapshot.text, "");
        assert!(snapshot.attachments.is_empty());
        assert_eq!(snapshot.capture_state, CaptureState::Idle);
    }

    #[tokio::test]
    async fn ingested_batch_flows_into_turn() {
        let (mut composer, mut rx) = composer();
        let mut ingestor = AttachmentIngestor::new(Arc::new(FsFileReader));
        let handle = ingestor.ingest(vec![
            SelectedFile::from_bytes("one.txt", "text/plain", b"1".to_vec()),
            SelectedFile::from_bytes("two.png", "image/png", b"2".to_vec()),
        ]);
        composer.add_attachments(handle.completed().await.expect("batch"));

        composer.update_text("two files");
        composer.submit(false);
        let turn = rx.try_recv().expect("turn");
        assert_eq!(turn.attachments.len(), 2);
        assert!(turn.attachments[1].is_image());
        assert!(turn.attachments.iter().all(|a| !a.is_pending()));
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let (mut composer, rx) = composer();
        drop(rx);
        composer.update_text("into the void");
        assert!(matches!(composer.submit(false), SubmitOutcome::Sent(_)));
    }
}
