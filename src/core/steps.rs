use crate::core::form_store::FormStore;
use crate::domain::model::IntakeField;
use crate::utils::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Side effect attached to leaving a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitEffect {
    RequestMatch,
}

/// Condition that must hold before the flow may leave a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepGuard {
    RequireField { field: IntakeField },
    SupportedLanguage,
    BusinessInfoComplete,
}

impl StepGuard {
    fn check(&self, form: &FormStore) -> std::result::Result<(), String> {
        match self {
            StepGuard::RequireField { field } => {
                if form.get(*field).trim().is_empty() {
                    Err(format!("{} is required", field))
                } else {
                    Ok(())
                }
            }
            StepGuard::SupportedLanguage => {
                let locale = &form.record().language;
                if locale.is_supported() {
                    Ok(())
                } else {
                    Err(format!("language '{}' is not supported", locale))
                }
            }
            StepGuard::BusinessInfoComplete => {
                if form.business_info_complete() {
                    Ok(())
                } else {
                    Err("company, owner, phone and state are required".to_string())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    /// Field that dictation writes into while this step is current.
    #[serde(default)]
    pub voice_field: Option<IntakeField>,
    #[serde(default)]
    pub on_exit: Option<ExitEffect>,
    #[serde(default)]
    pub guard: Option<StepGuard>,
}

impl StepDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            voice_field: None,
            on_exit: None,
            guard: None,
        }
    }

    pub fn with_voice_field(mut self, field: IntakeField) -> Self {
        self.voice_field = Some(field);
        self
    }

    pub fn with_exit_effect(mut self, effect: ExitEffect) -> Self {
        self.on_exit = Some(effect);
        self
    }

    pub fn with_guard(mut self, guard: StepGuard) -> Self {
        self.guard = Some(guard);
        self
    }
}

/// Ordered, fixed list of steps the controller walks through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSchema {
    steps: Vec<StepDefinition>,
}

impl StepSchema {
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self> {
        if steps.is_empty() {
            return Err(IntakeError::ConfigValidationError {
                field: "steps".to_string(),
                message: "at least one step is required".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for step in &steps {
            if step.name.trim().is_empty() {
                return Err(IntakeError::ConfigValidationError {
                    field: "steps.name".to_string(),
                    message: "step names cannot be empty".to_string(),
                });
            }
            if !seen.insert(step.name.as_str()) {
                return Err(IntakeError::ConfigValidationError {
                    field: "steps.name".to_string(),
                    message: format!("duplicate step name '{}'", step.name),
                });
            }
        }

        if let Some(last) = steps.last() {
            if last.on_exit.is_some() {
                return Err(IntakeError::ConfigValidationError {
                    field: "steps.on_exit".to_string(),
                    message: format!("terminal step '{}' cannot have an exit effect", last.name),
                });
            }
        }

        Ok(Self { steps })
    }

    /// Language, BusinessInfo, ProductMapping, MarketplaceMatch, Submit.
    pub fn reference() -> Self {
        Self {
            steps: vec![
                StepDefinition::new("language"),
                StepDefinition::new("business_info").with_voice_field(IntakeField::CompanyName),
                StepDefinition::new("product_mapping")
                    .with_voice_field(IntakeField::ProductDescription)
                    .with_exit_effect(ExitEffect::RequestMatch),
                StepDefinition::new("marketplace_match")
                    .with_voice_field(IntakeField::RequirementText),
                StepDefinition::new("submit"),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }
}

impl Default for StepSchema {
    fn default() -> Self {
        Self::reference()
    }
}

/// Work the caller must run because of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEffect {
    RequestMatch { from_step: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: usize,
    pub to: usize,
    pub effects: Vec<StepEffect>,
    /// Guard message when a forward move was refused.
    pub blocked: Option<String>,
}

impl TransitionOutcome {
    fn stay(at: usize) -> Self {
        Self {
            from: at,
            to: at,
            effects: Vec::new(),
            blocked: None,
        }
    }

    pub fn moved(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone)]
pub struct StepController {
    schema: StepSchema,
    current: usize,
}

impl StepController {
    pub fn new(schema: StepSchema) -> Self {
        Self { schema, current: 0 }
    }

    pub fn schema(&self) -> &StepSchema {
        &self.schema
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &StepDefinition {
        &self.schema.steps[self.current]
    }

    pub fn is_terminal(&self) -> bool {
        self.current + 1 == self.schema.len()
    }

    pub fn voice_target(&self) -> Option<IntakeField> {
        self.current_step().voice_field
    }

    /// Move forward one step if allowed. Never fails; refused moves stay put.
    pub fn advance(&mut self, form: &FormStore) -> TransitionOutcome {
        if self.is_terminal() {
            tracing::debug!(step = self.current, "advance at terminal step ignored");
            return TransitionOutcome::stay(self.current);
        }

        let source = &self.schema.steps[self.current];
        if let Some(guard) = &source.guard {
            if let Err(reason) = guard.check(form) {
                tracing::info!(step = %source.name, %reason, "advance blocked by step guard");
                let mut outcome = TransitionOutcome::stay(self.current);
                outcome.blocked = Some(reason);
                return outcome;
            }
        }

        let effects = match source.on_exit {
            Some(ExitEffect::RequestMatch) => vec![StepEffect::RequestMatch {
                from_step: self.current,
            }],
            None => Vec::new(),
        };

        let from = self.current;
        self.current += 1;
        tracing::debug!(from, to = self.current, effects = effects.len(), "step advanced");

        TransitionOutcome {
            from,
            to: self.current,
            effects,
            blocked: None,
        }
    }

    pub fn retreat(&mut self) -> TransitionOutcome {
        if self.current == 0 {
            return TransitionOutcome::stay(0);
        }
        let from = self.current;
        self.current -= 1;
        tracing::debug!(from, to = self.current, "step retreated");
        TransitionOutcome {
            from,
            to: self.current,
            effects: Vec::new(),
            blocked: None,
        }
    }
}
