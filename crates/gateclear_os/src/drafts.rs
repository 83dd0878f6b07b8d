#![forbid(unsafe_code)]

use gateclear_contracts::application::{ApplicationId, ApplicationRecord, OwnerId};
use gateclear_contracts::audit::AuditEventInput;
use gateclear_contracts::placeholder::DraftView;
use gateclear_contracts::steps::StepPatch;
use gateclear_contracts::{MonotonicTimeNs, Validate};
use gateclear_engines::forms::{PersonalForm, StepForm};
use gateclear_engines::stepcheck::{check_personal_create, check_step_form, FieldError};
use gateclear_storage::{GateStore, StorageError};

pub mod reason_codes {
    use gateclear_contracts::ReasonCodeId;

    // Draft wiring reason-code namespace.
    pub const DRAFT_OK_CREATE: ReasonCodeId = ReasonCodeId(0x4452_0001);
    pub const DRAFT_OK_STEP_PATCH: ReasonCodeId = ReasonCodeId(0x4452_0002);
    pub const DRAFT_REFUSE_VALIDATION: ReasonCodeId = ReasonCodeId(0x4452_00F1);
}

#[derive(Debug)]
pub enum DraftError {
    Validation(Vec<FieldError>),
    Storage(StorageError),
}

impl From<StorageError> for DraftError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDraftRequest {
    pub application_id: ApplicationId,
    pub owner_id: OwnerId,
    pub personal: PersonalForm,
    pub now: MonotonicTimeNs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchStepRequest {
    pub application_id: ApplicationId,
    pub owner_id: OwnerId,
    pub form: StepForm,
    pub now: MonotonicTimeNs,
}

/// Save-as-you-go wiring over the draft store: boundary validation in,
/// typed patches through, audit rows behind every write.
#[derive(Debug, Clone, Copy, Default)]
pub struct DraftWiring;

impl DraftWiring {
    pub fn create_draft(
        &self,
        store: &mut GateStore,
        request: &CreateDraftRequest,
    ) -> Result<ApplicationId, DraftError> {
        let personal =
            check_personal_create(&request.personal).map_err(DraftError::Validation)?;
        let record = ApplicationRecord::new_draft(
            request.application_id.clone(),
            request.owner_id.clone(),
            personal,
            request.now,
        )
        .map_err(StorageError::from)?;
        store.insert_application_row(record)?;
        store.append_audit_row(AuditEventInput {
            at: request.now,
            application_id: Some(request.application_id.clone()),
            actor: request.owner_id.as_str().to_string(),
            from_status: None,
            to_status: Some(gateclear_contracts::application::ApplicationStatus::Draft),
            reason_code: reason_codes::DRAFT_OK_CREATE,
            note: None,
        })?;
        Ok(request.application_id.clone())
    }

    pub fn patch_step(
        &self,
        store: &mut GateStore,
        request: &PatchStepRequest,
    ) -> Result<StepPatch, DraftError> {
        let patch = check_step_form(&request.form).map_err(DraftError::Validation)?;
        patch.validate().map_err(StorageError::from)?;
        store.patch_step_row(&request.application_id, &request.owner_id, &patch, request.now)?;
        store.append_audit_row(AuditEventInput {
            at: request.now,
            application_id: Some(request.application_id.clone()),
            actor: request.owner_id.as_str().to_string(),
            from_status: None,
            to_status: None,
            reason_code: reason_codes::DRAFT_OK_STEP_PATCH,
            note: Some(format!("step:{}", patch.step_name().as_str())),
        })?;
        Ok(patch)
    }

    /// Placeholder-substituted read; reads are not audited.
    pub fn get_draft(
        &self,
        store: &GateStore,
        application_id: &ApplicationId,
        owner_id: &OwnerId,
    ) -> Result<DraftView, DraftError> {
        Ok(store.draft_view(application_id, owner_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateclear_contracts::application::ApplicationStatus;
    use gateclear_engines::forms::ContactForm;
    use gateclear_storage::StorageError;

    fn app(id: &str) -> ApplicationId {
        ApplicationId::new(id).unwrap()
    }

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    fn personal_form() -> PersonalForm {
        PersonalForm {
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            other_names: None,
            date_of_birth: Some("05-01-1990".to_string()),
            gender: Some("female".to_string()),
        }
    }

    fn create(store: &mut GateStore) {
        DraftWiring
            .create_draft(
                store,
                &CreateDraftRequest {
                    application_id: app("app-1"),
                    owner_id: owner("user-1"),
                    personal: personal_form(),
                    now: MonotonicTimeNs(1),
                },
            )
            .unwrap();
    }

    #[test]
    fn at_draft_01_create_validates_then_seeds_placeholders_and_audits() {
        let mut store = GateStore::new();
        create(&mut store);

        let view = DraftWiring
            .get_draft(&store, &app("app-1"), &owner("user-1"))
            .unwrap();
        assert_eq!(view.status, ApplicationStatus::Draft);
        assert_eq!(view.personal.first_name, "Jane");
        assert_eq!(view.email, None);
        assert_eq!(store.audit_rows().len(), 1);
        assert_eq!(
            store.audit_rows()[0].reason_code,
            reason_codes::DRAFT_OK_CREATE
        );
    }

    #[test]
    fn at_draft_02_create_with_missing_identity_fields_is_rejected() {
        let mut store = GateStore::new();
        let result = DraftWiring.create_draft(
            &mut store,
            &CreateDraftRequest {
                application_id: app("app-1"),
                owner_id: owner("user-1"),
                personal: PersonalForm {
                    first_name: Some("Jane".to_string()),
                    ..PersonalForm::default()
                },
                now: MonotonicTimeNs(1),
            },
        );
        match result {
            Err(DraftError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(store.audit_rows().is_empty());
    }

    #[test]
    fn at_draft_03_duplicate_create_is_a_storage_conflict() {
        let mut store = GateStore::new();
        create(&mut store);
        let result = DraftWiring.create_draft(
            &mut store,
            &CreateDraftRequest {
                application_id: app("app-1"),
                owner_id: owner("user-1"),
                personal: personal_form(),
                now: MonotonicTimeNs(2),
            },
        );
        assert!(matches!(
            result,
            Err(DraftError::Storage(StorageError::DuplicateKey { .. }))
        ));
    }

    #[test]
    fn at_draft_04_patch_converts_forms_at_the_boundary() {
        let mut store = GateStore::new();
        create(&mut store);

        DraftWiring
            .patch_step(
                &mut store,
                &PatchStepRequest {
                    application_id: app("app-1"),
                    owner_id: owner("user-1"),
                    form: StepForm::Contact(ContactForm {
                        email: Some("jane@x.com".to_string()),
                        phone_number: Some("+1 (415) 555-1234".to_string()),
                        ..ContactForm::default()
                    }),
                    now: MonotonicTimeNs(5),
                },
            )
            .unwrap();

        let view = DraftWiring
            .get_draft(&store, &app("app-1"), &owner("user-1"))
            .unwrap();
        assert_eq!(view.email.as_deref(), Some("jane@x.com"));
        assert_eq!(view.phone_number.as_deref(), Some("4155551234"));
    }

    #[test]
    fn at_draft_05_patch_validation_failure_writes_nothing() {
        let mut store = GateStore::new();
        create(&mut store);
        let before = store
            .application_row(&app("app-1"), &owner("user-1"))
            .unwrap()
            .clone();

        let result = DraftWiring.patch_step(
            &mut store,
            &PatchStepRequest {
                application_id: app("app-1"),
                owner_id: owner("user-1"),
                form: StepForm::Contact(ContactForm {
                    email: Some("not-an-email".to_string()),
                    ..ContactForm::default()
                }),
                now: MonotonicTimeNs(5),
            },
        );
        assert!(matches!(result, Err(DraftError::Validation(_))));
        let after = store
            .application_row(&app("app-1"), &owner("user-1"))
            .unwrap();
        assert_eq!(*after, before);
    }
}
