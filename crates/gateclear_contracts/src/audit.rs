#![forbid(unsafe_code)]

use crate::application::{ApplicationId, ApplicationStatus};
use crate::{ContractViolation, MonotonicTimeNs, ReasonCodeId, Validate};

/// Input for one append-only audit ledger row. The store assigns the
/// sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEventInput {
    pub at: MonotonicTimeNs,
    pub application_id: Option<ApplicationId>,
    pub actor: String,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: Option<ApplicationStatus>,
    pub reason_code: ReasonCodeId,
    pub note: Option<String>,
}

impl Validate for AuditEventInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let Some(id) = &self.application_id {
            id.validate()?;
        }
        if self.actor.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event.actor",
                reason: "must not be empty",
            });
        }
        if self.actor.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "audit_event.actor",
                reason: "must be <= 128 chars",
            });
        }
        if let Some(n) = &self.note {
            if n.len() > 256 {
                return Err(ContractViolation::InvalidValue {
                    field: "audit_event.note",
                    reason: "must be <= 256 chars",
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub seq: u64,
    pub at: MonotonicTimeNs,
    pub application_id: Option<ApplicationId>,
    pub actor: String,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: Option<ApplicationStatus>,
    pub reason_code: ReasonCodeId,
    pub note: Option<String>,
}

impl AuditEvent {
    pub fn from_input(seq: u64, input: AuditEventInput) -> Self {
        Self {
            seq,
            at: input.at,
            application_id: input.application_id,
            actor: input.actor,
            from_status: input.from_status,
            to_status: input.to_status,
            reason_code: input.reason_code,
            note: input.note,
        }
    }
}
