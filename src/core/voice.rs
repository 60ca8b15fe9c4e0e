use crate::core::form_store::{FieldSlot, FieldSource, FormStore};
use crate::domain::events::{SessionId, TranscriptEvent, VoiceEvent, VoiceSink, WizardEvent};
use crate::domain::model::Locale;
use crate::domain::ports::SpeechBackend;
use crate::utils::error::{IntakeError, Result};
use tokio::sync::mpsc::UnboundedSender;

/// A dictation session and the slot it was bound to when it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub id: SessionId,
    pub target: FieldSlot,
    pub locale: Locale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceUpdate {
    /// Event for a session this adapter does not know (or no longer tracks).
    Ignored,
    Transcribed {
        session: SessionId,
        slot: FieldSlot,
        text: String,
        is_final: bool,
    },
    Ended {
        session: SessionId,
    },
    Failed {
        session: SessionId,
        reason: String,
    },
}

/// Bridges one speech stream at a time into the intake form.
pub struct VoiceCaptureAdapter {
    backend: Option<Box<dyn SpeechBackend>>,
    sink: UnboundedSender<WizardEvent>,
    next_session: u64,
    active: Option<CaptureSession>,
    // stopped sessions still waiting for their buffered final transcript
    draining: Vec<CaptureSession>,
    partial: String,
}

impl VoiceCaptureAdapter {
    pub fn new(backend: Option<Box<dyn SpeechBackend>>, sink: UnboundedSender<WizardEvent>) -> Self {
        Self {
            backend,
            sink,
            next_session: 0,
            active: None,
            draining: Vec::new(),
            partial: String::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.as_ref().map(|b| b.is_available()).unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_session(&self) -> Option<&CaptureSession> {
        self.active.as_ref()
    }

    /// True while any session (active or stopping) may still deliver events.
    pub fn is_busy(&self) -> bool {
        self.active.is_some() || !self.draining.is_empty()
    }

    pub fn current_partial(&self) -> &str {
        &self.partial
    }

    /// Begin dictation into `target`. The binding is fixed for the whole session,
    /// so callers resolve product entries to an index before starting.
    pub fn start(&mut self, target: FieldSlot, locale: &Locale) -> Result<SessionId> {
        let backend = match self.backend.as_mut() {
            Some(b) if b.is_available() => b,
            _ => {
                return Err(IntakeError::UnsupportedCapability {
                    capability: "speech recognition".to_string(),
                })
            }
        };

        if let Some(active) = &self.active {
            return Err(IntakeError::InvalidState {
                message: format!("{} is already capturing into {}", active.id, active.target),
            });
        }

        self.next_session += 1;
        let id = SessionId(self.next_session);
        backend
            .begin(id, locale, VoiceSink::new(id, self.sink.clone()))
            .map_err(|reason| IntakeError::CaptureFailed { reason })?;

        tracing::info!(session = %id, field = %target, locale = %locale, "voice capture started");
        self.partial.clear();
        self.active = Some(CaptureSession {
            id,
            target,
            locale: locale.clone(),
        });
        Ok(id)
    }

    /// Request graceful termination. Safe to call when nothing is active.
    pub fn stop(&mut self) -> Option<SessionId> {
        let session = self.active.take()?;
        if let Some(backend) = self.backend.as_mut() {
            backend.finish(session.id);
        }
        tracing::info!(session = %session.id, "voice capture stopping");
        let id = session.id;
        self.draining.push(session);
        self.partial.clear();
        Some(id)
    }

    /// Apply a backend event to the field bound at `start`.
    pub fn handle(&mut self, event: VoiceEvent, form: &mut FormStore) -> VoiceUpdate {
        let VoiceEvent { session, event } = event;
        let is_active = self.active.as_ref().map(|s| s.id) == Some(session);
        let target = if is_active {
            self.active.as_ref().map(|s| s.target)
        } else {
            self.draining.iter().find(|s| s.id == session).map(|s| s.target)
        };
        let Some(slot) = target else {
            tracing::debug!(session = %session, "event for unknown voice session ignored");
            return VoiceUpdate::Ignored;
        };

        match event {
            TranscriptEvent::Partial(text) => {
                form.write(slot, text.clone(), FieldSource::Voice);
                if is_active {
                    self.partial = text.clone();
                }
                VoiceUpdate::Transcribed {
                    session,
                    slot,
                    text,
                    is_final: false,
                }
            }
            TranscriptEvent::Final(text) => {
                form.write(slot, text.clone(), FieldSource::Voice);
                self.retire(session, is_active);
                tracing::info!(session = %session, slot = %slot, "voice capture finished");
                VoiceUpdate::Transcribed {
                    session,
                    slot,
                    text,
                    is_final: true,
                }
            }
            TranscriptEvent::Failed(reason) => {
                self.retire(session, is_active);
                tracing::warn!(session = %session, %reason, "voice capture failed");
                VoiceUpdate::Failed { session, reason }
            }
            TranscriptEvent::Ended => {
                self.retire(session, is_active);
                VoiceUpdate::Ended { session }
            }
        }
    }

    fn retire(&mut self, session: SessionId, is_active: bool) {
        if is_active {
            self.active = None;
            self.partial.clear();
        } else {
            self.draining.retain(|s| s.id != session);
        }
    }
}
