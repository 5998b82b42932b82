//! The user-turn side of a chat session.
//!
//! [`TurnComposer`] owns the draft text and attachments, decides when a turn
//! may be submitted, and hands finished [`ChatTurn`](chatdesk_shared::ChatTurn)s
//! to a [`TurnSender`]. Attachments are read concurrently by the
//! [`AttachmentIngestor`]; dictation is driven by [`VoiceCaptureController`].

pub mod attachments;
pub mod composer;
pub mod keys;
pub mod voice;

pub use attachments::{
    AcceptFilter, AttachmentIngestor, FileReader, FileSource, FsFileReader, IngestHandle,
    IngestProgress, IngestedBatch, SelectedFile, SelectionControl, SilentIngest, StagedSelection,
    encode_data_url, guess_mime_type,
};
pub use composer::{KeyOutcome, SubmitOutcome, TurnComposer, TurnSender};
pub use keys::{Key, KeyAction, KeyPress, Modifiers, classify};
pub use voice::{
    DictationCapability, DictationEvent, DictationEventKind, SessionId, SessionOptions,
    VoiceCaptureController,
};
