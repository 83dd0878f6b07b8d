#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use gateclear_contracts::application::{
    is_forward_transition, ApplicationId, ApplicationRecord, ApplicationStatus, OwnerId,
};
use gateclear_contracts::audit::{AuditEvent, AuditEventInput};
use gateclear_contracts::document::{DocumentId, DocumentRecord};
use gateclear_contracts::placeholder::DraftView;
use gateclear_contracts::steps::StepPatch;
use gateclear_contracts::{ContractViolation, MonotonicTimeNs, Validate};

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    /// Also covers owner mismatch: lookups are compound (id, owner)
    /// filters, so existence is never leaked to a non-owner.
    NotFound {
        table: &'static str,
        key: String,
    },
    DuplicateKey {
        table: &'static str,
        key: String,
    },
    ForeignKeyViolation {
        table: &'static str,
        key: String,
    },
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    /// Write against a record that left draft status; only the admin
    /// status path may touch it now.
    FrozenRecord {
        key: String,
        status: ApplicationStatus,
    },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListPage {
    pub offset: usize,
    pub limit: usize,
}

impl ListPage {
    pub fn v1(offset: usize, limit: usize) -> Result<Self, ContractViolation> {
        if limit == 0 || limit > 200 {
            return Err(ContractViolation::InvalidValue {
                field: "list_page.limit",
                reason: "must be within 1..=200",
            });
        }
        Ok(Self { offset, limit })
    }
}

/// In-memory relational-style store: one `applications` table keyed by id,
/// an append-only `documents` table, and an append-only audit ledger.
#[derive(Debug, Clone, Default)]
pub struct GateStore {
    applications: BTreeMap<ApplicationId, ApplicationRecord>,
    documents: BTreeMap<DocumentId, DocumentRecord>,
    audit_events: Vec<AuditEvent>,
}

impl GateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create is conflict-checked by the caller-supplied id; a retried
    /// create with the same id cannot duplicate the row.
    pub fn insert_application_row(
        &mut self,
        record: ApplicationRecord,
    ) -> Result<(), StorageError> {
        record.validate()?;
        if self.applications.contains_key(&record.id) {
            return Err(StorageError::DuplicateKey {
                table: "applications",
                key: record.id.as_str().to_string(),
            });
        }
        self.applications.insert(record.id.clone(), record);
        Ok(())
    }

    /// Compound-filtered read: a missing row and an owner mismatch are
    /// indistinguishable to the caller.
    pub fn application_row(
        &self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
    ) -> Result<&ApplicationRecord, StorageError> {
        self.applications
            .get(application_id)
            .filter(|r| &r.owner_id == owner_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "applications",
                key: application_id.as_str().to_string(),
            })
    }

    /// Admin-surface read without the owner filter.
    pub fn application_row_admin(
        &self,
        application_id: &ApplicationId,
    ) -> Result<&ApplicationRecord, StorageError> {
        self.applications
            .get(application_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "applications",
                key: application_id.as_str().to_string(),
            })
    }

    /// Applies one step's partial update. Updates only that step's fields
    /// and always bumps `updated_at`. Writes race at step granularity:
    /// the later write wins for the same step, different steps never
    /// touch each other's fields.
    pub fn patch_step_row(
        &mut self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
        patch: &StepPatch,
        now: MonotonicTimeNs,
    ) -> Result<(), StorageError> {
        patch.validate()?;
        let record = self
            .applications
            .get_mut(application_id)
            .filter(|r| &r.owner_id == owner_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "applications",
                key: application_id.as_str().to_string(),
            })?;
        if record.status != ApplicationStatus::Draft {
            return Err(StorageError::FrozenRecord {
                key: application_id.as_str().to_string(),
                status: record.status,
            });
        }
        record.apply_step_patch(patch);
        record.updated_at = now;
        Ok(())
    }

    /// Placeholder-substituted view for presenting a draft back to its
    /// owner.
    pub fn draft_view(
        &self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
    ) -> Result<DraftView, StorageError> {
        let record = self.application_row(application_id, owner_id)?;
        Ok(DraftView::from_record(record))
    }

    /// The durability boundary of submission: persists the final field
    /// set, flips status to submitted and stamps `submitted_at` exactly
    /// once. The caller has already validated the record; this only
    /// enforces transition legality and row identity.
    pub fn finalize_submission(
        &mut self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
        mut record: ApplicationRecord,
        now: MonotonicTimeNs,
    ) -> Result<&ApplicationRecord, StorageError> {
        let stored = self
            .applications
            .get_mut(application_id)
            .filter(|r| &r.owner_id == owner_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "applications",
                key: application_id.as_str().to_string(),
            })?;
        if stored.status != ApplicationStatus::Draft {
            return Err(StorageError::InvalidTransition {
                from: stored.status,
                to: ApplicationStatus::Submitted,
            });
        }
        if record.id != *application_id || record.owner_id != *owner_id {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "finalize_submission.record",
                    reason: "id and owner must match the stored row",
                },
            ));
        }
        record.status = ApplicationStatus::Submitted;
        record.created_at = stored.created_at;
        record.updated_at = now;
        record.submitted_at = Some(now);
        record.validate()?;
        *stored = record;
        Ok(stored)
    }

    /// Admin status advance; forward-only per the status state machine.
    pub fn update_status_row(
        &mut self,
        application_id: &ApplicationId,
        to: ApplicationStatus,
        now: MonotonicTimeNs,
    ) -> Result<ApplicationStatus, StorageError> {
        let record = self
            .applications
            .get_mut(application_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "applications",
                key: application_id.as_str().to_string(),
            })?;
        let from = record.status;
        if !is_forward_transition(from, to) {
            return Err(StorageError::InvalidTransition { from, to });
        }
        record.status = to;
        record.updated_at = now;
        Ok(from)
    }

    /// Deterministic id-ordered listing with an optional status filter.
    pub fn list_application_rows(
        &self,
        filter: &ListFilter,
        page: &ListPage,
    ) -> (Vec<&ApplicationRecord>, usize) {
        let matching: Vec<&ApplicationRecord> = self
            .applications
            .values()
            .filter(|r| filter.status.map_or(true, |s| r.status == s))
            .collect();
        let total = matching.len();
        let items = matching
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        (items, total)
    }

    /// Documents are append-only and require an existing parent
    /// application.
    pub fn insert_document_row(&mut self, record: DocumentRecord) -> Result<(), StorageError> {
        record.validate()?;
        if !self.applications.contains_key(&record.application_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "documents",
                key: record.application_id.as_str().to_string(),
            });
        }
        if self.documents.contains_key(&record.id) {
            return Err(StorageError::DuplicateKey {
                table: "documents",
                key: record.id.as_str().to_string(),
            });
        }
        self.documents.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn documents_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Vec<&DocumentRecord> {
        self.documents
            .values()
            .filter(|d| &d.application_id == application_id)
            .collect()
    }

    pub fn append_audit_row(&mut self, input: AuditEventInput) -> Result<u64, StorageError> {
        input.validate()?;
        let seq = self.audit_events.len() as u64 + 1;
        self.audit_events.push(AuditEvent::from_input(seq, input));
        Ok(seq)
    }

    pub fn audit_rows(&self) -> &[AuditEvent] {
        &self.audit_events
    }

    pub fn audit_rows_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Vec<&AuditEvent> {
        self.audit_events
            .iter()
            .filter(|e| e.application_id.as_ref() == Some(application_id))
            .collect()
    }
}
