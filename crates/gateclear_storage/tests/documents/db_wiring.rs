#![forbid(unsafe_code)]

use gateclear_contracts::application::{
    ApplicationId, ApplicationRecord, Gender, OwnerId, PersonalInfo,
};
use gateclear_contracts::date::CalendarDate;
use gateclear_contracts::document::{DocumentId, DocumentKind, DocumentRecord};
use gateclear_contracts::MonotonicTimeNs;
use gateclear_storage::repo::{ApplicationRepo, DocumentRepo};
use gateclear_storage::{GateStore, StorageError};

fn app(id: &str) -> ApplicationId {
    ApplicationId::new(id).unwrap()
}

fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).unwrap()
}

fn seed_draft<R: ApplicationRepo>(store: &mut R, application_id: &str) {
    store
        .insert_application_row(
            ApplicationRecord::new_draft(
                app(application_id),
                owner("user-1"),
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
            .unwrap(),
        )
        .unwrap();
}

fn insert<R: DocumentRepo>(store: &mut R, record: DocumentRecord) -> Result<(), StorageError> {
    store.insert_document_row(record)
}

fn document(id: &str, application_id: &str, kind: DocumentKind) -> DocumentRecord {
    DocumentRecord::v1(
        DocumentId::new(id).unwrap(),
        app(application_id),
        kind,
        "gate_clearance_form.pdf".to_string(),
        "application/pdf".to_string(),
        1024,
        owner("user-1"),
        MonotonicTimeNs(10),
    )
    .unwrap()
}

#[test]
fn at_db_doc_01_document_requires_existing_application() {
    let mut store = GateStore::new();
    match insert(&mut store, document("doc-1", "app-missing", DocumentKind::FilledForm)) {
        Err(StorageError::ForeignKeyViolation { table, key }) => {
            assert_eq!(table, "documents");
            assert_eq!(key, "app-missing");
        }
        other => panic!("expected ForeignKeyViolation, got {other:?}"),
    }
}

#[test]
fn at_db_doc_02_duplicate_document_id_is_rejected() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1");
    store
        .insert_document_row(document("doc-1", "app-1", DocumentKind::FilledForm))
        .unwrap();
    match insert(&mut store, document("doc-1", "app-1", DocumentKind::PassportScan)) {
        Err(StorageError::DuplicateKey { table, .. }) => assert_eq!(table, "documents"),
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

#[test]
fn at_db_doc_03_documents_are_listed_per_application() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1");
    seed_draft(&mut store, "app-2");
    store
        .insert_document_row(document("doc-1", "app-1", DocumentKind::FilledForm))
        .unwrap();
    store
        .insert_document_row(document("doc-2", "app-1", DocumentKind::WardenLetter))
        .unwrap();
    store
        .insert_document_row(document("doc-3", "app-2", DocumentKind::FilledForm))
        .unwrap();

    let docs = store.documents_for_application(&app("app-1"));
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d.application_id.as_str() == "app-1"));
    assert_eq!(store.documents_for_application(&app("app-2")).len(), 1);
}

#[test]
fn at_db_doc_04_zero_byte_documents_are_contract_violations() {
    let mut store = GateStore::new();
    seed_draft(&mut store, "app-1");
    let zero = DocumentRecord::v1(
        DocumentId::new("doc-z").unwrap(),
        app("app-1"),
        DocumentKind::FilledForm,
        "empty.pdf".to_string(),
        "application/pdf".to_string(),
        0,
        owner("user-1"),
        MonotonicTimeNs(10),
    );
    assert!(zero.is_err());
}
