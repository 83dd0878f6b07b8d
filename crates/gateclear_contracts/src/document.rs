#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::application::{ApplicationId, OwnerId};
use crate::{ContractViolation, MonotonicTimeNs, Validate};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for DocumentId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "document_id",
                reason: "must not be empty",
            });
        }
        if self.0.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "document_id",
                reason: "must be <= 128 chars",
            });
        }
        if !self.0.is_ascii() {
            return Err(ContractViolation::InvalidValue {
                field: "document_id",
                reason: "must be ASCII",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    FilledForm,
    PassportScan,
    WardenLetter,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FilledForm => "filled_form",
            Self::PassportScan => "passport_scan",
            Self::WardenLetter => "warden_letter",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "filled_form" => Some(Self::FilledForm),
            "passport_scan" => Some(Self::PassportScan),
            "warden_letter" => Some(Self::WardenLetter),
            _ => None,
        }
    }
}

/// A persisted file reference. Rows are created only by a successful upload
/// and are never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub application_id: ApplicationId,
    pub kind: DocumentKind,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub uploaded_by: OwnerId,
    pub uploaded_at: MonotonicTimeNs,
}

impl DocumentRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        id: DocumentId,
        application_id: ApplicationId,
        kind: DocumentKind,
        filename: String,
        mime_type: String,
        size_bytes: u64,
        uploaded_by: OwnerId,
        uploaded_at: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            id,
            application_id,
            kind,
            filename,
            mime_type,
            size_bytes,
            uploaded_by,
            uploaded_at,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for DocumentRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        self.application_id.validate()?;
        self.uploaded_by.validate()?;
        if self.filename.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "document.filename",
                reason: "must not be empty",
            });
        }
        if self.filename.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "document.filename",
                reason: "must be <= 128 chars",
            });
        }
        if self.mime_type.trim().is_empty() || self.mime_type.len() > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "document.mime_type",
                reason: "must be 1..=64 chars",
            });
        }
        if self.size_bytes == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "document.size_bytes",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}
