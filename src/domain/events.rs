use crate::domain::model::{
    CategorizationResult, DocumentPurpose, ExtractedDocument, RemoteOutcome, VendorCandidate,
};
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Purpose {
    Categorize,
    Match,
    Extract,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Purpose::Categorize => "categorize",
            Purpose::Match => "match",
            Purpose::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// Ticket for one issued collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub purpose: Purpose,
    pub sequence: u64,
    pub issued_at_step: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion<T> {
    pub request: PendingRequest,
    pub outcome: RemoteOutcome<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionCompletion {
    pub completion: Completion<ExtractedDocument>,
    pub filename: String,
    pub purpose: DocumentPurpose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    Partial(String),
    Final(String),
    Failed(String),
    /// Backend finished without a final transcript (stopped with nothing buffered).
    Ended,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceEvent {
    pub session: SessionId,
    pub event: TranscriptEvent,
}

/// Everything delivered to the wizard's control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardEvent {
    Categorized(Completion<CategorizationResult>),
    Matched(Completion<Vec<VendorCandidate>>),
    Extracted(ExtractionCompletion),
    Voice(VoiceEvent),
}

/// Handle a speech backend uses to push transcript events for one session.
#[derive(Debug, Clone)]
pub struct VoiceSink {
    session: SessionId,
    tx: UnboundedSender<WizardEvent>,
}

impl VoiceSink {
    pub fn new(session: SessionId, tx: UnboundedSender<WizardEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Returns false once the receiving side is gone.
    pub fn emit(&self, event: TranscriptEvent) -> bool {
        self.tx
            .send(WizardEvent::Voice(VoiceEvent {
                session: self.session,
                event,
            }))
            .is_ok()
    }

    pub fn partial(&self, text: impl Into<String>) -> bool {
        self.emit(TranscriptEvent::Partial(text.into()))
    }

    pub fn final_transcript(&self, text: impl Into<String>) -> bool {
        self.emit(TranscriptEvent::Final(text.into()))
    }

    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.emit(TranscriptEvent::Failed(reason.into()))
    }

    pub fn ended(&self) -> bool {
        self.emit(TranscriptEvent::Ended)
    }
}
