use crate::domain::model::{IntakeField, IntakeRecord, Locale};
use std::fmt;

/// Where the latest value of a field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    User,
    Voice,
    Document,
    /// Placeholder derived from an upload that could not be read.
    DocumentFallback,
}

/// A concrete place in the record. Product descriptions are addressed by
/// list index so that a later `add_product` cannot redirect a pending write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSlot {
    Scalar(IntakeField),
    Product(usize),
}

impl FieldSlot {
    pub fn field(&self) -> IntakeField {
        match self {
            FieldSlot::Scalar(field) => *field,
            FieldSlot::Product(_) => IntakeField::ProductDescription,
        }
    }
}

impl fmt::Display for FieldSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSlot::Scalar(field) => write!(f, "{}", field),
            FieldSlot::Product(index) => write!(f, "product_description[{}]", index),
        }
    }
}

/// Single owner of the intake record. Every write goes through here.
#[derive(Debug, Clone, Default)]
pub struct FormStore {
    record: IntakeRecord,
    revision: u64,
    requirement_source: Option<FieldSource>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> &IntakeRecord {
        &self.record
    }

    /// Bumped on every mutation that changes a value.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn requirement_source(&self) -> Option<FieldSource> {
        self.requirement_source
    }

    /// Pin `field` to the entry it currently means: the latest product for
    /// product descriptions, the field itself otherwise.
    pub fn resolve(&self, field: IntakeField) -> FieldSlot {
        match field {
            IntakeField::ProductDescription => {
                FieldSlot::Product(self.record.products.len().saturating_sub(1))
            }
            other => FieldSlot::Scalar(other),
        }
    }

    pub fn get(&self, field: IntakeField) -> &str {
        self.read(self.resolve(field))
    }

    pub fn read(&self, slot: FieldSlot) -> &str {
        match self.normalize(slot) {
            FieldSlot::Product(index) => self
                .record
                .products
                .get(index)
                .map(String::as_str)
                .unwrap_or(""),
            FieldSlot::Scalar(field) => match field {
                IntakeField::CompanyName => &self.record.company_name,
                IntakeField::OwnerName => &self.record.owner_name,
                IntakeField::Phone => &self.record.phone,
                IntakeField::Email => &self.record.email,
                IntakeField::ProductDescription => "",
                IntakeField::StateRegion => &self.record.state_region,
                IntakeField::City => &self.record.city,
                IntakeField::RequirementText => &self.record.requirement_text,
            },
        }
    }

    fn normalize(&self, slot: FieldSlot) -> FieldSlot {
        match slot {
            FieldSlot::Scalar(field) => self.resolve(field),
            product => product,
        }
    }

    /// Overwrite a field. Returns whether the stored value changed.
    pub fn set(&mut self, field: IntakeField, value: impl Into<String>, source: FieldSource) -> bool {
        self.write(self.resolve(field), value, source)
    }

    /// Overwrite one slot. Product slots past the end of the list grow it.
    pub fn write(&mut self, slot: FieldSlot, value: impl Into<String>, source: FieldSource) -> bool {
        let value = value.into();
        let slot = self.normalize(slot);
        let slot_ref = match slot {
            FieldSlot::Product(index) => {
                if self.record.products.len() <= index {
                    self.record.products.resize(index + 1, String::new());
                }
                &mut self.record.products[index]
            }
            FieldSlot::Scalar(field) => match scalar_mut(&mut self.record, field) {
                Some(target) => target,
                None => return false,
            },
        };

        if *slot_ref == value {
            return false;
        }
        *slot_ref = value;
        self.revision += 1;

        if slot == FieldSlot::Scalar(IntakeField::RequirementText) {
            self.requirement_source = if self.record.requirement_text.trim().is_empty() {
                None
            } else {
                Some(source)
            };
        }
        tracing::trace!(slot = %slot, ?source, revision = self.revision, "form field updated");
        true
    }

    /// Write only when the field is still blank; user input always wins over extraction.
    pub fn fill_if_empty(&mut self, field: IntakeField, value: &str, source: FieldSource) -> bool {
        if !self.get(field).trim().is_empty() || value.trim().is_empty() {
            return false;
        }
        self.set(field, value.trim(), source)
    }

    pub fn set_language(&mut self, locale: Locale) -> bool {
        if self.record.language == locale {
            return false;
        }
        self.record.language = locale;
        self.revision += 1;
        true
    }

    /// Start a new product entry; later product-description writes target it.
    pub fn add_product(&mut self) {
        self.record.products.push(String::new());
        self.revision += 1;
    }

    /// Most recent product entry with actual text in it.
    pub fn latest_product(&self) -> Option<&str> {
        self.record
            .products
            .iter()
            .rev()
            .map(|p| p.trim())
            .find(|p| !p.is_empty())
    }

    /// Non-empty product descriptions in entry order.
    pub fn product_descriptions(&self) -> Vec<String> {
        self.record
            .products
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn business_info_complete(&self) -> bool {
        [
            &self.record.company_name,
            &self.record.owner_name,
            &self.record.phone,
            &self.record.state_region,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }
}

fn scalar_mut(record: &mut IntakeRecord, field: IntakeField) -> Option<&mut String> {
    match field {
        IntakeField::CompanyName => Some(&mut record.company_name),
        IntakeField::OwnerName => Some(&mut record.owner_name),
        IntakeField::Phone => Some(&mut record.phone),
        IntakeField::Email => Some(&mut record.email),
        IntakeField::ProductDescription => None,
        IntakeField::StateRegion => Some(&mut record.state_region),
        IntakeField::City => Some(&mut record.city),
        IntakeField::RequirementText => Some(&mut record.requirement_text),
    }
}
