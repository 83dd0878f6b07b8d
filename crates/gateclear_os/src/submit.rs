#![forbid(unsafe_code)]

use gateclear_contracts::application::{
    ApplicationId, ApplicationStatus, OwnerId,
};
use gateclear_contracts::audit::AuditEventInput;
use gateclear_contracts::date::CalendarDate;
use gateclear_contracts::document::{DocumentId, DocumentKind, DocumentRecord};
use gateclear_contracts::placeholder::{
    is_placeholder, SENTINEL_COMPANY, SENTINEL_EMAIL, SENTINEL_GOV_ID_NUMBER, SENTINEL_PHONE,
};
use gateclear_contracts::{ContractViolation, MonotonicTimeNs};
use gateclear_engines::fieldmap::{decode_signature, map_record, SkippedField};
use gateclear_engines::forms::{StepForm, SubmitForm};
use gateclear_engines::stepcheck::{check_full, check_step_form, FieldError, FullCheckConfig, SubmitExtras};
use gateclear_storage::{GateStore, StorageError};

use crate::pdf::{fill_form, TemplateSource};
use crate::uploader::{DocumentUploader, UploadRequest};

pub mod reason_codes {
    use gateclear_contracts::ReasonCodeId;

    // Submission wiring reason-code namespace.
    pub const SUBMIT_OK_COMMIT: ReasonCodeId = ReasonCodeId(0x5355_0001);
    pub const SUBMIT_REFUSE_VALIDATION: ReasonCodeId = ReasonCodeId(0x5355_00F1);
    pub const SUBMIT_REFUSE_ALREADY_SUBMITTED: ReasonCodeId = ReasonCodeId(0x5355_00F2);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitConfig {
    pub expiration_grace_days: u16,
}

impl SubmitConfig {
    pub fn mvp_v1() -> Self {
        Self {
            expiration_grace_days: 0,
        }
    }

    pub fn v1(expiration_grace_days: u16) -> Result<Self, ContractViolation> {
        if expiration_grace_days > 3650 {
            return Err(ContractViolation::InvalidValue {
                field: "submit_config.expiration_grace_days",
                reason: "must be <= 3650",
            });
        }
        Ok(Self {
            expiration_grace_days,
        })
    }
}

/// An optional attachment carried with the final submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementaryFile {
    pub kind: DocumentKind,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub application_id: ApplicationId,
    pub owner_id: OwnerId,
    pub now: MonotonicTimeNs,
    pub today: CalendarDate,
    pub form: SubmitForm,
    pub files: Vec<SupplementaryFile>,
}

#[derive(Debug)]
pub enum SubmitError {
    /// Also covers owner mismatch, per the compound-filter policy.
    NotFound,
    /// Re-submission is rejected outright, never replayed or overwritten.
    AlreadySubmitted { status: ApplicationStatus },
    Validation(Vec<FieldError>),
    Storage(StorageError),
}

impl From<StorageError> for SubmitError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound { .. } => Self::NotFound,
            StorageError::InvalidTransition { from, .. } => Self::AlreadySubmitted { status: from },
            other => Self::Storage(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub filename: String,
    pub reason: String,
}

/// What the caller gets back once the durability boundary has been
/// crossed. `pdf_error` and `upload_failures` report the accepted
/// inconsistency window: the record stays submitted even when rendering or
/// uploads fail, and those are retried out-of-band.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    pub submitted_at: MonotonicTimeNs,
    pub documents: Vec<DocumentRecord>,
    pub pdf_error: Option<String>,
    pub upload_failures: Vec<UploadFailure>,
    pub skipped_fields: Vec<SkippedField>,
}

/// The draft -> submitted state machine. Single transition, validated
/// strictly before the durability boundary; everything after the boundary
/// degrades instead of rolling back.
#[derive(Debug, Clone)]
pub struct SubmissionWiring<U, T>
where
    U: DocumentUploader,
    T: TemplateSource,
{
    config: SubmitConfig,
    uploader: U,
    template: T,
}

impl<U, T> SubmissionWiring<U, T>
where
    U: DocumentUploader,
    T: TemplateSource,
{
    pub fn new(config: SubmitConfig, uploader: U, template: T) -> Self {
        Self {
            config,
            uploader,
            template,
        }
    }

    pub fn run_submit(
        &self,
        store: &mut GateStore,
        request: &SubmitRequest,
    ) -> Result<SubmitOutcome, SubmitError> {
        // 1. Load; absence and owner mismatch are indistinguishable.
        let stored = store
            .application_row(&request.application_id, &request.owner_id)
            .map_err(SubmitError::from)?;
        if stored.status != ApplicationStatus::Draft {
            return Err(SubmitError::AlreadySubmitted {
                status: stored.status,
            });
        }

        // 2. Merge the submitted payload over the stored record, then run
        // full-mode validation. No writes happen until this is clean.
        let mut merged = stored.clone();
        let mut errors: Vec<FieldError> = Vec::new();
        let sections = [
            StepForm::Personal(request.form.personal.clone()),
            StepForm::Contact(request.form.contact.clone()),
            StepForm::Experience(request.form.experience.clone()),
            StepForm::Rules(request.form.rules),
            StepForm::Security(request.form.security.clone()),
        ];
        for section in sections {
            match check_step_form(&section) {
                Ok(patch) => {
                    if !patch.is_empty() {
                        merged.apply_step_patch(&patch);
                    }
                }
                Err(mut section_errors) => errors.append(&mut section_errors),
            }
        }
        apply_background(&mut merged, request);

        let full_config = FullCheckConfig::v1(request.today, self.config.expiration_grace_days)
            .map_err(StorageError::from)?;
        let extras = SubmitExtras {
            email_confirm: request.form.contact.email_confirm.clone(),
        };
        errors.extend(check_full(&merged, &extras, &full_config));
        dedupe(&mut errors);
        if !errors.is_empty() {
            return Err(SubmitError::Validation(errors));
        }

        // 3. Placeholder gate: guards against a skipped step slipping a
        // sentinel past validation.
        let gate = placeholder_gate(&merged);
        if !gate.is_empty() {
            return Err(SubmitError::Validation(gate));
        }

        // 4. Durability boundary.
        let submitted = store
            .finalize_submission(&request.application_id, &request.owner_id, merged, request.now)?
            .clone();
        store.append_audit_row(AuditEventInput {
            at: request.now,
            application_id: Some(request.application_id.clone()),
            actor: request.owner_id.as_str().to_string(),
            from_status: Some(ApplicationStatus::Draft),
            to_status: Some(ApplicationStatus::Submitted),
            reason_code: reason_codes::SUBMIT_OK_COMMIT,
            note: None,
        })?;

        // 5. Fill the PDF; failure is surfaced but the record stays
        // submitted.
        let mut skipped_fields: Vec<SkippedField> = Vec::new();
        let signature = match &submitted.security.digital_signature {
            Some(sig) => match decode_signature(sig) {
                Ok(image) => Some(image),
                Err(_) => {
                    skipped_fields.push(SkippedField {
                        field: "SIGNATURE",
                        reason: "signature payload could not be decoded",
                    });
                    None
                }
            },
            None => None,
        };
        let mapped = map_record(&submitted, request.form.ssn.as_deref());
        skipped_fields.extend(mapped.skipped.iter().copied());

        let mut pdf_error: Option<String> = None;
        let mut pdf_bytes: Option<Vec<u8>> = None;
        match self.template.template_bytes() {
            Ok(template) => match fill_form(&template, &mapped, signature.as_ref()) {
                Ok(filled) => {
                    skipped_fields.extend(filled.skipped.iter().copied());
                    pdf_bytes = Some(filled.bytes);
                }
                Err(err) => pdf_error = Some(err.to_string()),
            },
            Err(err) => pdf_error = Some(err.to_string()),
        }

        // 6 + 7. Independent uploads; each failure is logged, none undoes
        // the submission or blocks the others.
        let mut documents = Vec::new();
        let mut upload_failures = Vec::new();
        if let Some(bytes) = pdf_bytes {
            self.upload_and_record(
                store,
                request,
                DocumentKind::FilledForm,
                "gate_clearance_form.pdf".to_string(),
                "application/pdf".to_string(),
                bytes,
                &mut documents,
                &mut upload_failures,
            );
        }
        for file in &request.files {
            self.upload_and_record(
                store,
                request,
                file.kind,
                file.filename.clone(),
                file.mime_type.clone(),
                file.bytes.clone(),
                &mut documents,
                &mut upload_failures,
            );
        }

        Ok(SubmitOutcome {
            application_id: request.application_id.clone(),
            status: ApplicationStatus::Submitted,
            submitted_at: request.now,
            documents,
            pdf_error,
            upload_failures,
            skipped_fields,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn upload_and_record(
        &self,
        store: &mut GateStore,
        request: &SubmitRequest,
        kind: DocumentKind,
        filename: String,
        mime_type: String,
        bytes: Vec<u8>,
        documents: &mut Vec<DocumentRecord>,
        failures: &mut Vec<UploadFailure>,
    ) {
        let upload = UploadRequest {
            bytes,
            filename: filename.clone(),
            mime_type: mime_type.clone(),
        };
        let receipt = match self.uploader.upload(&upload) {
            Ok(receipt) => receipt,
            Err(err) => {
                failures.push(UploadFailure {
                    filename,
                    reason: err.to_string(),
                });
                return;
            }
        };
        let record = DocumentId::new(format!(
            "{}_{}",
            request.application_id.as_str(),
            kind.as_str()
        ))
        .and_then(|id| {
            DocumentRecord::v1(
                id,
                request.application_id.clone(),
                kind,
                filename.clone(),
                mime_type,
                receipt.size_bytes,
                request.owner_id.clone(),
                request.now,
            )
        });
        match record {
            Ok(record) => match store.insert_document_row(record.clone()) {
                Ok(()) => documents.push(record),
                Err(err) => failures.push(UploadFailure {
                    filename,
                    reason: format!("document row rejected: {err:?}"),
                }),
            },
            Err(violation) => failures.push(UploadFailure {
                filename,
                reason: format!("document contract violated: {violation:?}"),
            }),
        }
    }
}

fn apply_background(merged: &mut gateclear_contracts::application::ApplicationRecord, request: &SubmitRequest) {
    let b = &request.form.background;
    if let Some(v) = b.former_inmate {
        merged.background.former_inmate = v;
    }
    if let Some(v) = b.on_probation_parole {
        merged.background.on_probation_parole = v;
    }
    if let Some(v) = b.visited_inmate {
        merged.background.visited_inmate = v;
    }
    if let Some(v) = b.restricted_access {
        merged.background.restricted_access = v;
    }
    if let Some(v) = b.felony_conviction {
        merged.background.felony_conviction = v;
    }
    if let Some(v) = b.pending_charges {
        merged.background.pending_charges = v;
    }
}

fn placeholder_gate(
    record: &gateclear_contracts::application::ApplicationRecord,
) -> Vec<FieldError> {
    let checks: [(&'static str, &str, &str); 4] = [
        ("contact.email", &record.contact.email, SENTINEL_EMAIL),
        ("contact.phone_number", &record.contact.phone_number, SENTINEL_PHONE),
        (
            "contact.company_or_organization",
            &record.contact.company_or_organization,
            SENTINEL_COMPANY,
        ),
        (
            "security.government_id_number",
            &record.security.government_id_number,
            SENTINEL_GOV_ID_NUMBER,
        ),
    ];
    let mut errors = Vec::new();
    for (field, value, sentinel) in checks {
        if is_placeholder(Some(value), sentinel) {
            errors.push(FieldError {
                field,
                message: "required field was never provided",
            });
        }
    }
    errors
}

fn dedupe(errors: &mut Vec<FieldError>) {
    let mut seen: Vec<FieldError> = Vec::new();
    errors.retain(|e| {
        if seen.contains(e) {
            false
        } else {
            seen.push(*e);
            true
        }
    });
}
