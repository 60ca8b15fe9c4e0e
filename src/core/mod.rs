pub mod form_store;
pub mod ranker;
pub mod requesters;
pub mod sequencing;
pub mod steps;
pub mod voice;
pub mod wizard;

pub use form_store::{FieldSlot, FieldSource, FormStore};
pub use ranker::RecommendationRanker;
pub use sequencing::{ApplyDecision, RequestLedger};
pub use steps::{StepController, StepDefinition, StepSchema, TransitionOutcome};
pub use voice::{VoiceCaptureAdapter, VoiceUpdate};
pub use wizard::{Applied, IntakeWizard};
