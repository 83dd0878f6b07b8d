#![forbid(unsafe_code)]

use gateclear_contracts::application::{
    ApplicationId, ApplicationRecord, ApplicationStatus, OwnerId,
};
use gateclear_contracts::audit::{AuditEvent, AuditEventInput};
use gateclear_contracts::document::DocumentRecord;
use gateclear_contracts::placeholder::DraftView;
use gateclear_contracts::steps::StepPatch;
use gateclear_contracts::MonotonicTimeNs;

use crate::store::{GateStore, ListFilter, ListPage, StorageError};

/// Typed repository interface for the applications table. Every
/// owner-facing operation is scoped by (id, owner); that compound filter is
/// the sole authorization boundary.
pub trait ApplicationRepo {
    fn insert_application_row(&mut self, record: ApplicationRecord) -> Result<(), StorageError>;
    fn application_row(
        &self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
    ) -> Result<&ApplicationRecord, StorageError>;
    fn patch_step_row(
        &mut self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
        patch: &StepPatch,
        now: MonotonicTimeNs,
    ) -> Result<(), StorageError>;
    fn draft_view(
        &self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
    ) -> Result<DraftView, StorageError>;
    fn finalize_submission(
        &mut self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
        record: ApplicationRecord,
        now: MonotonicTimeNs,
    ) -> Result<&ApplicationRecord, StorageError>;
    fn update_status_row(
        &mut self,
        application_id: &ApplicationId,
        to: ApplicationStatus,
        now: MonotonicTimeNs,
    ) -> Result<ApplicationStatus, StorageError>;
    fn list_application_rows(
        &self,
        filter: &ListFilter,
        page: &ListPage,
    ) -> (Vec<&ApplicationRecord>, usize);
}

/// Typed repository interface for the append-only documents table.
pub trait DocumentRepo {
    fn insert_document_row(&mut self, record: DocumentRecord) -> Result<(), StorageError>;
    fn documents_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Vec<&DocumentRecord>;
}

/// Typed repository interface for the append-only audit ledger.
pub trait AuditRepo {
    fn append_audit_row(&mut self, input: AuditEventInput) -> Result<u64, StorageError>;
    fn audit_rows(&self) -> &[AuditEvent];
    fn audit_rows_for_application(&self, application_id: &ApplicationId) -> Vec<&AuditEvent>;
}

impl ApplicationRepo for GateStore {
    fn insert_application_row(&mut self, record: ApplicationRecord) -> Result<(), StorageError> {
        GateStore::insert_application_row(self, record)
    }

    fn application_row(
        &self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
    ) -> Result<&ApplicationRecord, StorageError> {
        GateStore::application_row(self, application_id, owner_id)
    }

    fn patch_step_row(
        &mut self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
        patch: &StepPatch,
        now: MonotonicTimeNs,
    ) -> Result<(), StorageError> {
        GateStore::patch_step_row(self, application_id, owner_id, patch, now)
    }

    fn draft_view(
        &self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
    ) -> Result<DraftView, StorageError> {
        GateStore::draft_view(self, application_id, owner_id)
    }

    fn finalize_submission(
        &mut self,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
        record: ApplicationRecord,
        now: MonotonicTimeNs,
    ) -> Result<&ApplicationRecord, StorageError> {
        GateStore::finalize_submission(self, application_id, owner_id, record, now)
    }

    fn update_status_row(
        &mut self,
        application_id: &ApplicationId,
        to: ApplicationStatus,
        now: MonotonicTimeNs,
    ) -> Result<ApplicationStatus, StorageError> {
        GateStore::update_status_row(self, application_id, to, now)
    }

    fn list_application_rows(
        &self,
        filter: &ListFilter,
        page: &ListPage,
    ) -> (Vec<&ApplicationRecord>, usize) {
        GateStore::list_application_rows(self, filter, page)
    }
}

impl DocumentRepo for GateStore {
    fn insert_document_row(&mut self, record: DocumentRecord) -> Result<(), StorageError> {
        GateStore::insert_document_row(self, record)
    }

    fn documents_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Vec<&DocumentRecord> {
        GateStore::documents_for_application(self, application_id)
    }
}

impl AuditRepo for GateStore {
    fn append_audit_row(&mut self, input: AuditEventInput) -> Result<u64, StorageError> {
        GateStore::append_audit_row(self, input)
    }

    fn audit_rows(&self) -> &[AuditEvent] {
        GateStore::audit_rows(self)
    }

    fn audit_rows_for_application(&self, application_id: &ApplicationId) -> Vec<&AuditEvent> {
        GateStore::audit_rows_for_application(self, application_id)
    }
}
