//! Attachment ingestion: selected files → attachment records, read concurrently.
//!
//! Each batch of selected files gets one pending [`AttachmentRecord`] per file
//! right away. The reads run as separate tasks and report to a single tally
//! task, which keeps a per-slot checklist and fires the batch notification
//! once every read has reported, in selection order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use chatdesk_shared::{AttachmentRecord, ChatdeskError, Result};

/// MIME type used in data URLs when the selection reports none.
const FALLBACK_MIME: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Selected files
// ---------------------------------------------------------------------------

/// Where a selected file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// A file picked by the user, not yet read.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    /// May be empty when the host cannot tell.
    pub mime_type: String,
    pub size_bytes: u64,
    pub source: FileSource,
}

impl SelectedFile {
    /// An in-memory file.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    /// A file on disk. The MIME type is guessed from the extension.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| ChatdeskError::io(path, e))?;
        if !meta.is_file() {
            return Err(ChatdeskError::validation(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            mime_type: guess_mime_type(&name).to_string(),
            name,
            size_bytes: meta.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }
}

/// Guess a MIME type from a file name's extension. Unknown → empty string.
pub fn guess_mime_type(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "",
    }
}

// ---------------------------------------------------------------------------
// Accept filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum AcceptRule {
    /// `.pdf`, stored lowercase with the dot.
    Extension(String),
    /// `image/*`, stored as `image/`.
    MimePrefix(String),
    /// `application/pdf`
    Mime(String),
}

/// Which files a selection control lets through, in HTML `accept` syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptFilter {
    rules: Vec<AcceptRule>,
}

impl AcceptFilter {
    /// Accept everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Parse a comma-separated accept list such as `image/*,.pdf,.txt`.
    pub fn parse(accept: &str) -> Result<Self> {
        let mut rules = Vec::new();
        for token in accept.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let rule = if token.starts_with('.') && token.len() > 1 {
                AcceptRule::Extension(token.to_ascii_lowercase())
            } else if let Some(prefix) = token.strip_suffix("/*") {
                AcceptRule::MimePrefix(format!("{}/", prefix.to_ascii_lowercase()))
            } else if token.contains('/') {
                AcceptRule::Mime(token.to_ascii_lowercase())
            } else {
                return Err(ChatdeskError::validation(format!(
                    "invalid accept token '{token}'"
                )));
            };
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    pub fn matches(&self, name: &str, mime_type: &str) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        let name = name.to_ascii_lowercase();
        let mime = mime_type.to_ascii_lowercase();
        self.rules.iter().any(|rule| match rule {
            AcceptRule::Extension(ext) => name.ends_with(ext.as_str()),
            AcceptRule::MimePrefix(prefix) => mime.starts_with(prefix.as_str()),
            AcceptRule::Mime(exact) => mime == *exact,
        })
    }
}

// ---------------------------------------------------------------------------
// Selection control
// ---------------------------------------------------------------------------

/// The host's file-selection control.
pub trait SelectionControl {
    /// Files currently selected.
    fn selected(&self) -> Vec<SelectedFile>;
    /// Reset the control so the same files can be picked again.
    fn clear(&mut self);
}

/// A selection control backed by a list, gated by an [`AcceptFilter`].
#[derive(Debug, Clone, Default)]
pub struct StagedSelection {
    filter: AcceptFilter,
    files: Vec<SelectedFile>,
}

impl StagedSelection {
    pub fn new(filter: AcceptFilter) -> Self {
        Self {
            filter,
            files: Vec::new(),
        }
    }

    /// Stage a file. Returns `false` if the accept filter rejects it.
    pub fn select(&mut self, file: SelectedFile) -> bool {
        if !self.filter.matches(&file.name, &file.mime_type) {
            debug!(name = %file.name, mime = %file.mime_type, "file rejected by accept filter");
            return false;
        }
        self.files.push(file);
        true
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SelectionControl for StagedSelection {
    fn selected(&self) -> Vec<SelectedFile> {
        self.files.clone()
    }

    fn clear(&mut self) {
        self.files.clear();
    }
}

// ---------------------------------------------------------------------------
// File reading capability
// ---------------------------------------------------------------------------

/// Reads a selected file into a data URL string.
#[async_trait]
pub trait FileReader: Send + Sync {
    async fn read_data_url(&self, file: &SelectedFile) -> Result<String>;
}

/// Reads from disk (tokio fs) or from the in-memory buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileReader;

#[async_trait]
impl FileReader for FsFileReader {
    async fn read_data_url(&self, file: &SelectedFile) -> Result<String> {
        match &file.source {
            FileSource::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| ChatdeskError::io(path, e))?;
                Ok(encode_data_url(&file.mime_type, &bytes))
            }
            FileSource::Memory(bytes) => Ok(encode_data_url(&file.mime_type, bytes)),
        }
    }
}

/// `data:<mime>;base64,<payload>`
pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    let mime = if mime_type.is_empty() {
        FALLBACK_MIME
    } else {
        mime_type
    };
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{payload}")
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Observer for ingestion progress.
pub trait IngestProgress: Send + Sync {
    /// A read was scheduled for the file in `slot` of a batch of `total`.
    fn read_started(&self, name: &str, slot: usize, total: usize);
    /// A read reported back; `ok` is false when it failed.
    fn read_finished(&self, name: &str, ok: bool);
    /// Every read of the batch has reported.
    fn batch_completed(&self, batch: &IngestedBatch);
}

/// No-op progress observer.
pub struct SilentIngest;

impl IngestProgress for SilentIngest {
    fn read_started(&self, _name: &str, _slot: usize, _total: usize) {}
    fn read_finished(&self, _name: &str, _ok: bool) {}
    fn batch_completed(&self, _batch: &IngestedBatch) {}
}

// ---------------------------------------------------------------------------
// Ingestor
// ---------------------------------------------------------------------------

/// A fully read batch, in selection order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedBatch {
    pub batch_id: u64,
    pub records: Vec<AttachmentRecord>,
    /// Reads that failed and left empty content.
    pub failed: usize,
}

/// Handle to a batch whose reads are in progress.
#[derive(Debug)]
pub struct IngestHandle {
    batch_id: u64,
    pending: Vec<AttachmentRecord>,
    done: oneshot::Receiver<IngestedBatch>,
}

impl IngestHandle {
    pub fn batch_id(&self) -> u64 {
        self.batch_id
    }

    /// The records as created at selection time (empty content).
    pub fn pending(&self) -> &[AttachmentRecord] {
        &self.pending
    }

    /// The batch, if it has completed and was not taken yet.
    pub fn try_completed(&mut self) -> Option<IngestedBatch> {
        self.done.try_recv().ok()
    }

    /// Wait for every read of the batch to report.
    pub async fn completed(self) -> Result<IngestedBatch> {
        let batch_id = self.batch_id;
        self.done.await.map_err(|_| {
            ChatdeskError::read(format!("batch {batch_id} abandoned before completion"))
        })
    }
}

/// One read reporting back to the tally.
struct ReadCompletion {
    slot: usize,
    outcome: Result<String>,
}

/// Turns file selections into attachment records.
pub struct AttachmentIngestor {
    reader: Arc<dyn FileReader>,
    progress: Arc<dyn IngestProgress>,
    next_batch: u64,
}

impl AttachmentIngestor {
    pub fn new(reader: Arc<dyn FileReader>) -> Self {
        Self {
            reader,
            progress: Arc::new(SilentIngest),
            next_batch: 1,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn IngestProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Take the control's current selection, clear the control, and ingest it.
    pub fn ingest_from(&mut self, control: &mut dyn SelectionControl) -> IngestHandle {
        let files = control.selected();
        control.clear();
        self.ingest(files)
    }

    /// Create pending records for `files` and start reading them.
    ///
    /// Must be called from within a Tokio runtime. An empty batch completes
    /// immediately with no records.
    #[instrument(skip_all, fields(batch_id = self.next_batch, files = files.len()))]
    pub fn ingest(&mut self, files: Vec<SelectedFile>) -> IngestHandle {
        let batch_id = self.next_batch;
        self.next_batch += 1;

        let pending: Vec<AttachmentRecord> = files
            .iter()
            .map(|f| AttachmentRecord::pending(&f.name, &f.mime_type, f.size_bytes))
            .collect();

        let total = files.len();
        let (done_tx, done_rx) = oneshot::channel();
        let (tally_tx, tally_rx) = mpsc::channel(total.max(1));

        tokio::spawn(tally(
            batch_id,
            pending.clone(),
            tally_rx,
            done_tx,
            Arc::clone(&self.progress),
        ));

        for (slot, file) in files.into_iter().enumerate() {
            self.progress.read_started(&file.name, slot, total);

            let reader = Arc::clone(&self.reader);
            let tx = tally_tx.clone();
            tokio::spawn(async move {
                // The read runs in its own task so a panicking reader still reports.
                let read = tokio::spawn(async move { reader.read_data_url(&file).await });
                let outcome = match read.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(ChatdeskError::read(format!("read task failed: {e}"))),
                };
                if tx.send(ReadCompletion { slot, outcome }).await.is_err() {
                    debug!(slot, "tally gone, dropping read completion");
                }
            });
        }

        debug!(total, "attachment reads scheduled");

        IngestHandle {
            batch_id,
            pending,
            done: done_rx,
        }
    }
}

/// Counts completions and fires the batch once all `records.len()` reads reported.
async fn tally(
    batch_id: u64,
    mut records: Vec<AttachmentRecord>,
    mut rx: mpsc::Receiver<ReadCompletion>,
    done: oneshot::Sender<IngestedBatch>,
    progress: Arc<dyn IngestProgress>,
) {
    let total = records.len();
    let mut reported = vec![false; total];
    let mut completed = 0;
    let mut failed = 0;

    while completed < total {
        let Some(ReadCompletion { slot, outcome }) = rx.recv().await else {
            warn!(batch_id, completed, total, "read tasks vanished before batch completed");
            return;
        };

        if reported[slot] {
            warn!(batch_id, slot, "duplicate read completion ignored");
            continue;
        }
        reported[slot] = true;
        completed += 1;

        let record = &mut records[slot];
        match outcome {
            Ok(content) => {
                record.content = content;
                progress.read_finished(&record.name, true);
            }
            Err(e) => {
                failed += 1;
                warn!(
                    batch_id,
                    name = %record.name,
                    error = %e,
                    "attachment read failed, keeping empty content"
                );
                progress.read_finished(&record.name, false);
            }
        }
    }

    let batch = IngestedBatch {
        batch_id,
        records,
        failed,
    };
    info!(batch_id, records = total, failed, "attachment batch completed");
    progress.batch_completed(&batch);

    if done.send(batch).is_err() {
        debug!(batch_id, "batch handle dropped before completion");
    }
}
