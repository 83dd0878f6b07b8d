#![forbid(unsafe_code)]

use gateclear_contracts::application::{
    ApplicationId, ApplicationRecord, ApplicationStatus, OwnerId,
};
use gateclear_contracts::audit::AuditEventInput;
use gateclear_contracts::MonotonicTimeNs;
use gateclear_storage::{GateStore, ListFilter, ListPage, StorageError};

pub mod reason_codes {
    use gateclear_contracts::ReasonCodeId;

    // Admin review wiring reason-code namespace.
    pub const ADMIN_OK_STATUS_CHANGE: ReasonCodeId = ReasonCodeId(0x4144_0001);
}

#[derive(Debug)]
pub enum AdminError {
    NotFound,
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    Storage(StorageError),
}

impl From<StorageError> for AdminError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::NotFound { .. } => Self::NotFound,
            StorageError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            other => Self::Storage(other),
        }
    }
}

/// Row shape for the review queue listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSummary {
    pub id: ApplicationId,
    pub owner_id: OwnerId,
    pub status: ApplicationStatus,
    pub applicant_name: String,
    pub updated_at: MonotonicTimeNs,
    pub submitted_at: Option<MonotonicTimeNs>,
}

impl AdminSummary {
    fn from_record(record: &ApplicationRecord) -> Self {
        Self {
            id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            status: record.status,
            applicant_name: format!(
                "{} {}",
                record.personal.first_name, record.personal.last_name
            ),
            updated_at: record.updated_at,
            submitted_at: record.submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminListResult {
    pub items: Vec<AdminSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

/// Review surface: list/get across owners, forward-only status advances,
/// every change audited with the acting admin's identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdminWiring;

impl AdminWiring {
    pub fn list_applications(
        &self,
        store: &GateStore,
        filter: &ListFilter,
        page: &ListPage,
    ) -> AdminListResult {
        let (rows, total) = store.list_application_rows(filter, page);
        AdminListResult {
            items: rows.into_iter().map(AdminSummary::from_record).collect(),
            total,
        }
    }

    pub fn get_application(
        &self,
        store: &GateStore,
        application_id: &ApplicationId,
    ) -> Result<ApplicationRecord, AdminError> {
        Ok(store.application_row_admin(application_id)?.clone())
    }

    pub fn update_status(
        &self,
        store: &mut GateStore,
        application_id: &ApplicationId,
        to: ApplicationStatus,
        actor: &str,
        now: MonotonicTimeNs,
    ) -> Result<StatusChange, AdminError> {
        let from = store.update_status_row(application_id, to, now)?;
        store.append_audit_row(AuditEventInput {
            at: now,
            application_id: Some(application_id.clone()),
            actor: actor.to_string(),
            from_status: Some(from),
            to_status: Some(to),
            reason_code: reason_codes::ADMIN_OK_STATUS_CHANGE,
            note: None,
        })?;
        Ok(StatusChange { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateclear_contracts::application::{Gender, PersonalInfo};
    use gateclear_contracts::date::CalendarDate;
    use gateclear_contracts::placeholder::{SENTINEL_COMPANY, SENTINEL_EMAIL};

    fn app(id: &str) -> ApplicationId {
        ApplicationId::new(id).unwrap()
    }

    fn seed(store: &mut GateStore, id: &str, submitted: bool) {
        let mut record = ApplicationRecord::new_draft(
            app(id),
            OwnerId::new("user-1").unwrap(),
            PersonalInfo::v1(
                "Jane".to_string(),
                "Doe".to_string(),
                None,
                CalendarDate::new(1990, 5, 1).unwrap(),
                Gender::Female,
            )
            .unwrap(),
            MonotonicTimeNs(1),
        )
        .unwrap();
        store.insert_application_row(record.clone()).unwrap();
        if submitted {
            record.contact.email = "jane@x.com".to_string();
            record.contact.phone_number = "4155551234".to_string();
            record.contact.company_or_organization = "Acme".to_string();
            record.security.government_id_number = "D1234567".to_string();
            store
                .finalize_submission(
                    &record.id.clone(),
                    &record.owner_id.clone(),
                    record,
                    MonotonicTimeNs(2),
                )
                .unwrap();
        }
    }

    #[test]
    fn at_admin_01_listing_spans_owners_and_filters_by_status() {
        let mut store = GateStore::new();
        seed(&mut store, "app-1", false);
        seed(&mut store, "app-2", true);

        let all = AdminWiring.list_applications(
            &store,
            &ListFilter::default(),
            &ListPage::v1(0, 50).unwrap(),
        );
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].applicant_name, "Jane Doe");

        let submitted = AdminWiring.list_applications(
            &store,
            &ListFilter {
                status: Some(ApplicationStatus::Submitted),
            },
            &ListPage::v1(0, 50).unwrap(),
        );
        assert_eq!(submitted.total, 1);
        assert_eq!(submitted.items[0].id.as_str(), "app-2");
    }

    #[test]
    fn at_admin_02_get_does_not_mask_sentinels() {
        // The admin surface sees raw rows; only owner-facing draft reads
        // substitute placeholders.
        let mut store = GateStore::new();
        seed(&mut store, "app-1", false);
        let record = AdminWiring.get_application(&store, &app("app-1")).unwrap();
        assert_eq!(record.contact.email, SENTINEL_EMAIL);
        assert_eq!(record.contact.company_or_organization, SENTINEL_COMPANY);
    }

    #[test]
    fn at_admin_03_status_advances_forward_and_audits() {
        let mut store = GateStore::new();
        seed(&mut store, "app-1", true);

        let change = AdminWiring
            .update_status(
                &mut store,
                &app("app-1"),
                ApplicationStatus::UnderReview,
                "admin-7",
                MonotonicTimeNs(10),
            )
            .unwrap();
        assert_eq!(change.from, ApplicationStatus::Submitted);

        let audit = store.audit_rows_for_application(&app("app-1"));
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].actor, "admin-7");
        assert_eq!(audit[0].to_status, Some(ApplicationStatus::UnderReview));
    }

    #[test]
    fn at_admin_04_backward_transitions_are_rejected() {
        let mut store = GateStore::new();
        seed(&mut store, "app-1", true);
        AdminWiring
            .update_status(
                &mut store,
                &app("app-1"),
                ApplicationStatus::UnderReview,
                "admin-7",
                MonotonicTimeNs(10),
            )
            .unwrap();

        match AdminWiring.update_status(
            &mut store,
            &app("app-1"),
            ApplicationStatus::Draft,
            "admin-7",
            MonotonicTimeNs(20),
        ) {
            Err(AdminError::InvalidTransition { from, to }) => {
                assert_eq!(from, ApplicationStatus::UnderReview);
                assert_eq!(to, ApplicationStatus::Draft);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }

        match AdminWiring.update_status(
            &mut store,
            &app("missing"),
            ApplicationStatus::UnderReview,
            "admin-7",
            MonotonicTimeNs(30),
        ) {
            Err(AdminError::NotFound) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
