use crate::domain::events::{SessionId, VoiceSink};
use crate::domain::model::Locale;
use crate::domain::ports::SpeechBackend;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Backend for environments without a recognizer.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSpeechBackend;

impl SpeechBackend for UnavailableSpeechBackend {
    fn is_available(&self) -> bool {
        false
    }

    fn begin(&mut self, _session: SessionId, _locale: &Locale, _sink: VoiceSink) -> Result<(), String> {
        Err("speech recognition is not available".to_string())
    }

    fn finish(&mut self, _session: SessionId) {}
}

#[derive(Debug, Clone)]
enum Script {
    Transcript(String),
    Failure(String),
}

/// Replays a fixed transcript word by word, then reports it as final.
///
/// Stopping early still delivers the words heard so far as the final
/// transcript, the same way a streaming recognizer flushes its buffer.
#[derive(Debug)]
pub struct ScriptedSpeechBackend {
    script: Script,
    interval: Duration,
    running: HashMap<SessionId, Arc<AtomicBool>>,
}

impl ScriptedSpeechBackend {
    pub fn new(transcript: impl Into<String>, interval: Duration) -> Self {
        Self {
            script: Script::Transcript(transcript.into()),
            interval,
            running: HashMap::new(),
        }
    }

    /// Every session fails with `reason` after the first interval.
    pub fn failing(reason: impl Into<String>, interval: Duration) -> Self {
        Self {
            script: Script::Failure(reason.into()),
            interval,
            running: HashMap::new(),
        }
    }
}

impl SpeechBackend for ScriptedSpeechBackend {
    fn is_available(&self) -> bool {
        true
    }

    fn begin(&mut self, session: SessionId, locale: &Locale, sink: VoiceSink) -> Result<(), String> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| "no async runtime to stream transcripts on".to_string())?;

        // sessions whose task already finished hold the only remaining reference
        self.running.retain(|_, stop| Arc::strong_count(stop) > 1);
        let stop = Arc::new(AtomicBool::new(false));
        self.running.insert(session, stop.clone());
        let script = self.script.clone();
        let interval = self.interval;
        tracing::debug!(session = %session, tag = %locale.speech_tag(), "🎙️ scripted recognizer started");

        handle.spawn(async move {
            let words: Vec<String> = match script {
                Script::Failure(reason) => {
                    tokio::time::sleep(interval).await;
                    sink.failed(reason);
                    return;
                }
                Script::Transcript(text) => text.split_whitespace().map(str::to_string).collect(),
            };

            let mut heard: Vec<&str> = Vec::new();
            for word in &words {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(interval).await;
                heard.push(word);
                if !sink.partial(heard.join(" ")) {
                    return;
                }
            }

            if heard.is_empty() {
                sink.ended();
            } else {
                sink.final_transcript(heard.join(" "));
            }
        });
        Ok(())
    }

    fn finish(&mut self, session: SessionId) {
        if let Some(stop) = self.running.remove(&session) {
            stop.store(true, Ordering::SeqCst);
        }
    }
}
