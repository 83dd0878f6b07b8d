#![forbid(unsafe_code)]

use gateclear_contracts::application::{
    ApplicationId, ApplicationRecord, ApplicationStatus, Gender, OwnerId, PersonalInfo,
};
use gateclear_contracts::date::CalendarDate;
use gateclear_contracts::placeholder::{SENTINEL_EMAIL, SENTINEL_GOV_ID_NUMBER};
use gateclear_contracts::steps::{ContactPatch, SecurityPatch, StepPatch};
use gateclear_contracts::MonotonicTimeNs;
use gateclear_storage::repo::ApplicationRepo;
use gateclear_storage::{GateStore, ListFilter, ListPage, StorageError};

fn app(id: &str) -> ApplicationId {
    ApplicationId::new(id).unwrap()
}

fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).unwrap()
}

fn personal() -> PersonalInfo {
    PersonalInfo::v1(
        "Jane".to_string(),
        "Doe".to_string(),
        None,
        CalendarDate::new(1990, 5, 1).unwrap(),
        Gender::Female,
    )
    .unwrap()
}

// Generic over the repo trait: proves the store stays usable behind the
// dependency-injection seam.
fn seed_draft<R: ApplicationRepo>(store: &mut R, application_id: &str, owner_id: &str) {
    store
        .insert_application_row(
            ApplicationRecord::new_draft(
                app(application_id),
                owner(owner_id),
                personal(),
                MonotonicTimeNs(1),
            )
            .unwrap(),
        )
        .unwrap();
}

fn submission_ready(store: &GateStore, application_id: &str, owner_id: &str) -> ApplicationRecord {
    let mut record = store
        .application_row(&app(application_id), &owner(owner_id))
        .unwrap()
        .clone();
    record.contact.email = "jane@x.com".to_string();
    record.contact.phone_number = "4155551234".to_string();
    record.contact.company_or_organization = "Acme".to_string();
    record.security.government_id_number = "D1234567".to_string();
    record
}

#[test]
fn at_db_app_01_create_is_conflict_checked_by_id() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1", "user-1");

    let again = ApplicationRecord::new_draft(
        app("app-1"),
        owner("user-1"),
        personal(),
        MonotonicTimeNs(2),
    )
    .unwrap();
    match store.insert_application_row(again) {
        Err(StorageError::DuplicateKey { table, .. }) => assert_eq!(table, "applications"),
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

#[test]
fn at_db_app_02_owner_mismatch_reads_as_not_found() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1", "user-1");

    assert!(store.application_row(&app("app-1"), &owner("user-1")).is_ok());
    match store.application_row(&app("app-1"), &owner("user-2")) {
        Err(StorageError::NotFound { .. }) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
    match store.patch_step_row(
        &app("app-1"),
        &owner("user-2"),
        &StepPatch::Contact(ContactPatch {
            email: Some("x@y.com".to_string()),
            ..ContactPatch::default()
        }),
        MonotonicTimeNs(5),
    ) {
        Err(StorageError::NotFound { .. }) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn at_db_app_03_step_patch_updates_only_its_step_and_bumps_updated_at() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1", "user-1");

    store
        .patch_step_row(
            &app("app-1"),
            &owner("user-1"),
            &StepPatch::Contact(ContactPatch {
                email: Some("jane@x.com".to_string()),
                ..ContactPatch::default()
            }),
            MonotonicTimeNs(10),
        )
        .unwrap();
    store
        .patch_step_row(
            &app("app-1"),
            &owner("user-1"),
            &StepPatch::Security(SecurityPatch {
                government_id_number: Some("D1234567".to_string()),
                ..SecurityPatch::default()
            }),
            MonotonicTimeNs(20),
        )
        .unwrap();

    let record = store.application_row(&app("app-1"), &owner("user-1")).unwrap();
    assert_eq!(record.contact.email, "jane@x.com");
    assert_eq!(record.security.government_id_number, "D1234567");
    assert_eq!(record.personal.first_name, "Jane");
    assert_eq!(record.updated_at, MonotonicTimeNs(20));
    assert_eq!(record.created_at, MonotonicTimeNs(1));
}

#[test]
fn at_db_app_04_interleaved_patches_to_different_steps_never_corrupt_each_other() {
    // Two "tabs" race: contact in one, security in the other. Whatever the
    // interleaving, both field groups survive.
    let orders: [&[usize]; 2] = [&[0, 1], &[1, 0]];
    for order in orders {
        let mut store = GateStore::new();
        seed_draft(&mut store, "app-1", "user-1");
        let patches = [
            StepPatch::Contact(ContactPatch {
                email: Some("jane@x.com".to_string()),
                phone_number: Some("4155551234".to_string()),
                ..ContactPatch::default()
            }),
            StepPatch::Security(SecurityPatch {
                government_id_number: Some("D1234567".to_string()),
                id_state: Some("CA".to_string()),
                ..SecurityPatch::default()
            }),
        ];
        for (tick, &i) in order.iter().enumerate() {
            store
                .patch_step_row(
                    &app("app-1"),
                    &owner("user-1"),
                    &patches[i],
                    MonotonicTimeNs(10 + tick as u64),
                )
                .unwrap();
        }
        let record = store.application_row(&app("app-1"), &owner("user-1")).unwrap();
        assert_eq!(record.contact.email, "jane@x.com");
        assert_eq!(record.contact.phone_number, "4155551234");
        assert_eq!(record.security.government_id_number, "D1234567");
        assert_eq!(record.security.id_state.as_deref(), Some("CA"));
    }
}

#[test]
fn at_db_app_05_draft_view_substitutes_sentinels() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1", "user-1");

    let view = store.draft_view(&app("app-1"), &owner("user-1")).unwrap();
    assert_eq!(view.email, None);
    assert_eq!(view.government_id_number, None);

    let raw = store.application_row(&app("app-1"), &owner("user-1")).unwrap();
    assert_eq!(raw.contact.email, SENTINEL_EMAIL);
    assert_eq!(raw.security.government_id_number, SENTINEL_GOV_ID_NUMBER);
}

#[test]
fn at_db_app_06_finalize_flips_status_once_and_stamps_submitted_at() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1", "user-1");
    let record = submission_ready(&store, "app-1", "user-1");

    let submitted = store
        .finalize_submission(&app("app-1"), &owner("user-1"), record.clone(), MonotonicTimeNs(99))
        .unwrap();
    assert_eq!(submitted.status, ApplicationStatus::Submitted);
    assert_eq!(submitted.submitted_at, Some(MonotonicTimeNs(99)));

    // Second finalize is an illegal transition, not an overwrite.
    match store.finalize_submission(&app("app-1"), &owner("user-1"), record, MonotonicTimeNs(100)) {
        Err(StorageError::InvalidTransition { from, to }) => {
            assert_eq!(from, ApplicationStatus::Submitted);
            assert_eq!(to, ApplicationStatus::Submitted);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
    let stored = store.application_row(&app("app-1"), &owner("user-1")).unwrap();
    assert_eq!(stored.submitted_at, Some(MonotonicTimeNs(99)));
}

#[test]
fn at_db_app_07_submitted_rows_are_frozen_to_step_patches() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1", "user-1");
    let record = submission_ready(&store, "app-1", "user-1");
    store
        .finalize_submission(&app("app-1"), &owner("user-1"), record, MonotonicTimeNs(50))
        .unwrap();

    match store.patch_step_row(
        &app("app-1"),
        &owner("user-1"),
        &StepPatch::Contact(ContactPatch {
            email: Some("late@x.com".to_string()),
            ..ContactPatch::default()
        }),
        MonotonicTimeNs(60),
    ) {
        Err(StorageError::FrozenRecord { status, .. }) => {
            assert_eq!(status, ApplicationStatus::Submitted)
        }
        other => panic!("expected FrozenRecord, got {other:?}"),
    }
}

#[test]
fn at_db_app_08_status_updates_are_forward_only() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1", "user-1");
    let record = submission_ready(&store, "app-1", "user-1");
    store
        .finalize_submission(&app("app-1"), &owner("user-1"), record, MonotonicTimeNs(50))
        .unwrap();

    let from = store
        .update_status_row(&app("app-1"), ApplicationStatus::UnderReview, MonotonicTimeNs(60))
        .unwrap();
    assert_eq!(from, ApplicationStatus::Submitted);
    store
        .update_status_row(&app("app-1"), ApplicationStatus::Approved, MonotonicTimeNs(70))
        .unwrap();

    match store.update_status_row(&app("app-1"), ApplicationStatus::Draft, MonotonicTimeNs(80)) {
        Err(StorageError::InvalidTransition { .. }) => {}
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[test]
fn at_db_app_09_listing_filters_and_pages_deterministically() {
    let mut store = GateStore::new();
    for i in 0..5 {
        seed_draft(&mut store, &format!("app-{i}"), "user-1");
    }
    let record = submission_ready(&store, "app-3", "user-1");
    store
        .finalize_submission(&app("app-3"), &owner("user-1"), record, MonotonicTimeNs(50))
        .unwrap();

    let (all, total) = store.list_application_rows(
        &ListFilter::default(),
        &ListPage::v1(0, 200).unwrap(),
    );
    assert_eq!(total, 5);
    assert_eq!(all.len(), 5);

    let (drafts, draft_total) = store.list_application_rows(
        &ListFilter {
            status: Some(ApplicationStatus::Draft),
        },
        &ListPage::v1(0, 2).unwrap(),
    );
    assert_eq!(draft_total, 4);
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].id.as_str(), "app-0");
    assert_eq!(drafts[1].id.as_str(), "app-1");

    let (next, _) = store.list_application_rows(
        &ListFilter {
            status: Some(ApplicationStatus::Draft),
        },
        &ListPage::v1(2, 2).unwrap(),
    );
    assert_eq!(next.len(), 2);
    assert_eq!(next[0].id.as_str(), "app-2");
    assert_eq!(next[1].id.as_str(), "app-4");

    assert!(ListPage::v1(0, 0).is_err());
    assert!(ListPage::v1(0, 500).is_err());
}
