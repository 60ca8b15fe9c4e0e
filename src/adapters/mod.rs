// Adapters layer: concrete implementations of the domain ports (REST service, speech).

pub mod http;
pub mod speech;

pub use http::HttpCollaborators;
pub use speech::{ScriptedSpeechBackend, UnavailableSpeechBackend};
