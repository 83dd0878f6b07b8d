#![forbid(unsafe_code)]

use gateclear_contracts::application::{ApplicationId, ApplicationStatus};
use gateclear_contracts::audit::AuditEventInput;
use gateclear_contracts::{MonotonicTimeNs, ReasonCodeId};
use gateclear_storage::repo::AuditRepo;
use gateclear_storage::GateStore;

fn append<R: AuditRepo>(repo: &mut R, event: AuditEventInput) -> u64 {
    repo.append_audit_row(event).unwrap()
}

fn input(application_id: Option<&str>, at: u64) -> AuditEventInput {
    AuditEventInput {
        at: MonotonicTimeNs(at),
        application_id: application_id.map(|id| ApplicationId::new(id).unwrap()),
        actor: "user-1".to_string(),
        from_status: Some(ApplicationStatus::Draft),
        to_status: Some(ApplicationStatus::Submitted),
        reason_code: ReasonCodeId(1),
        note: None,
    }
}

#[test]
fn at_db_audit_01_sequence_numbers_are_dense_and_monotonic() {
    let mut store = GateStore::new();
    assert_eq!(append(&mut store, input(Some("app-1"), 10)), 1);
    assert_eq!(append(&mut store, input(Some("app-2"), 20)), 2);
    assert_eq!(append(&mut store, input(None, 30)), 3);

    let rows = store.audit_rows();
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[test]
fn at_db_audit_02_rows_filter_by_application() {
    let mut store = GateStore::new();
    store.append_audit_row(input(Some("app-1"), 10)).unwrap();
    store.append_audit_row(input(Some("app-2"), 20)).unwrap();
    store.append_audit_row(input(Some("app-1"), 30)).unwrap();

    let for_one = store.audit_rows_for_application(&ApplicationId::new("app-1").unwrap());
    assert_eq!(for_one.len(), 2);
    assert!(for_one.iter().all(|e| e
        .application_id
        .as_ref()
        .map(|id| id.as_str())
        == Some("app-1")));
}

#[test]
fn at_db_audit_03_blank_actor_is_rejected() {
    let mut store = GateStore::new();
    let mut bad = input(None, 10);
    bad.actor = "  ".to_string();
    assert!(store.append_audit_row(bad).is_err());
}
