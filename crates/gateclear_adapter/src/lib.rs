#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use gateclear_contracts::application::{
    ApplicationId, ApplicationRecord, ApplicationStatus, OwnerId,
};
use gateclear_contracts::date::CalendarDate;
use gateclear_contracts::document::{DocumentKind, DocumentRecord};
use gateclear_contracts::placeholder::DraftView;
use gateclear_contracts::MonotonicTimeNs;
use gateclear_engines::forms::{
    ContactForm, ExperienceForm, PersonalForm, RulesForm, SecurityForm, StepForm, SubmitForm,
};
use gateclear_engines::stepcheck::FieldError;
use gateclear_contracts::steps::StepName;
use gateclear_os::admin::{AdminError, AdminWiring};
use gateclear_os::drafts::{CreateDraftRequest, DraftError, DraftWiring, PatchStepRequest};
use gateclear_os::pdf::StaticTemplate;
use gateclear_os::submit::{
    SubmissionWiring, SubmitConfig, SubmitError, SubmitRequest, SupplementaryFile,
};
use gateclear_os::uploader::DocumentUploader;
use gateclear_storage::{GateStore, ListFilter, ListPage, StorageError};

pub type BoxedUploader = Box<dyn DocumentUploader + Send>;

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Resolves a bearer token to an authenticated owner. The fronting
/// identity provider is the source of truth; this seam only checks session
/// validity.
pub trait SessionVerifier {
    fn resolve(&self, token: &str) -> Option<OwnerId>;
}

/// Static token table seeded from configuration. Tokens are stored hashed
/// so the raw values never sit in memory longer than the lookup.
#[derive(Debug, Clone, Default)]
pub struct StaticSessionTable {
    by_token_hash: BTreeMap<String, OwnerId>,
}

impl StaticSessionTable {
    /// Spec format: `token:user,token2:user2`.
    pub fn from_spec(spec: &str) -> Result<Self, String> {
        let mut table = Self::default();
        for pair in spec.split(',').filter(|p| !p.trim().is_empty()) {
            let mut parts = pair.splitn(2, ':');
            let token = parts.next().unwrap_or("").trim();
            let user = parts.next().unwrap_or("").trim();
            if token.is_empty() || user.is_empty() {
                return Err(format!("malformed session pair: {pair:?}"));
            }
            let owner = OwnerId::new(user).map_err(|v| format!("bad owner id: {v:?}"))?;
            table.insert(token, owner);
        }
        Ok(table)
    }

    pub fn insert(&mut self, token: &str, owner: OwnerId) {
        self.by_token_hash.insert(sha256_hex(token), owner);
    }
}

impl SessionVerifier for StaticSessionTable {
    fn resolve(&self, token: &str) -> Option<OwnerId> {
        self.by_token_hash.get(&sha256_hex(token)).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldErrorDto {
    pub field: String,
    pub message: String,
}

impl From<&FieldError> for FieldErrorDto {
    fn from(value: &FieldError) -> Self {
        Self {
            field: value.field.to_string(),
            message: value.message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<FieldErrorDto>,
}

/// API-surfaced failure. Authentication failures stay detail-free and
/// authorization failures surface as not-found, per the error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub validation_errors: Vec<FieldErrorDto>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            status: 401,
            message: "unauthorized".to_string(),
            validation_errors: Vec::new(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            message: "application not found".to_string(),
            validation_errors: Vec::new(),
        }
    }

    pub fn conflict(message: &str) -> Self {
        Self {
            status: 409,
            message: message.to_string(),
            validation_errors: Vec::new(),
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status: 400,
            message: message.to_string(),
            validation_errors: Vec::new(),
        }
    }

    pub fn validation(errors: &[FieldError]) -> Self {
        Self {
            status: 422,
            message: "validation failed".to_string(),
            validation_errors: errors.iter().map(FieldErrorDto::from).collect(),
        }
    }

    pub fn validation_single(field: &str, message: &str) -> Self {
        Self {
            status: 422,
            message: "validation failed".to_string(),
            validation_errors: vec![FieldErrorDto {
                field: field.to_string(),
                message: message.to_string(),
            }],
        }
    }

    pub fn internal(message: &str) -> Self {
        Self {
            status: 500,
            message: message.to_string(),
            validation_errors: Vec::new(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            status: "error".to_string(),
            message: self.message,
            validation_errors: self.validation_errors,
        };
        (code, Json(body)).into_response()
    }
}

fn storage_api_error(err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound { .. } => ApiError::not_found(),
        StorageError::DuplicateKey { .. } => ApiError::conflict("application already exists"),
        StorageError::FrozenRecord { .. } => {
            ApiError::conflict("application is no longer editable")
        }
        StorageError::InvalidTransition { .. } => ApiError::conflict("illegal status transition"),
        StorageError::ForeignKeyViolation { .. } => ApiError::conflict("missing parent record"),
        StorageError::ContractViolation(v) => ApiError::validation_single(v.field(), v.reason()),
    }
}

fn draft_api_error(err: DraftError) -> ApiError {
    match err {
        DraftError::Validation(errors) => ApiError::validation(&errors),
        DraftError::Storage(err) => storage_api_error(err),
    }
}

fn submit_api_error(err: SubmitError) -> ApiError {
    match err {
        SubmitError::NotFound => ApiError::not_found(),
        SubmitError::AlreadySubmitted { .. } => {
            ApiError::conflict("application was already submitted")
        }
        SubmitError::Validation(errors) => ApiError::validation(&errors),
        SubmitError::Storage(err) => storage_api_error(err),
    }
}

fn admin_api_error(err: AdminError) -> ApiError {
    match err {
        AdminError::NotFound => ApiError::not_found(),
        AdminError::InvalidTransition { .. } => ApiError::conflict("illegal status transition"),
        AdminError::Storage(err) => storage_api_error(err),
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CreateDraftDto {
    pub application_id: String,
    #[serde(default)]
    pub personal: PersonalForm,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CreateDraftResponseDto {
    pub status: String,
    pub application_id: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PatchStepResponseDto {
    pub status: String,
    pub step: StepName,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DraftViewDto {
    pub application_id: String,
    pub status: ApplicationStatus,
    pub first_name: String,
    pub last_name: String,
    pub other_names: Option<String>,
    pub date_of_birth: String,
    pub gender: gateclear_contracts::application::Gender,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_or_organization: Option<String>,
    pub purpose_of_visit: Option<String>,
    pub experience: ExperienceForm,
    pub rules: RulesForm,
    pub government_id_type: Option<gateclear_contracts::application::GovernmentIdType>,
    pub government_id_number: Option<String>,
    pub id_state: Option<String>,
    pub id_expiration: Option<String>,
    pub digital_signature_present: bool,
    pub us_citizen: bool,
    pub created_at_ns: u64,
    pub updated_at_ns: u64,
    pub submitted_at_ns: Option<u64>,
}

impl DraftViewDto {
    fn from_view(view: DraftView) -> Self {
        Self {
            application_id: view.id.as_str().to_string(),
            status: view.status,
            first_name: view.personal.first_name.clone(),
            last_name: view.personal.last_name.clone(),
            other_names: view.personal.other_names.clone(),
            date_of_birth: view.personal.date_of_birth.to_display(),
            gender: view.personal.gender,
            email: view.email,
            phone_number: view.phone_number,
            company_or_organization: view.company_or_organization,
            purpose_of_visit: view.purpose_of_visit,
            experience: ExperienceForm {
                engaged_directly: view.experience.engaged_directly,
                perceptions: view.experience.perceptions,
                expectations: view.experience.expectations,
                justice_reform_before: view.experience.justice_reform_before,
                interests_most: view.experience.interests_most,
                reform_future: view.experience.reform_future,
                additional_notes: view.experience.additional_notes,
            },
            rules: RulesForm {
                escort_required: view.rules_quiz.escort_required,
                contraband_declared: view.rules_quiz.contraband_declared,
                dress_code_acknowledged: view.rules_quiz.dress_code_acknowledged,
                contact_with_residents: view.rules_quiz.contact_with_residents,
                recording_devices: view.rules_quiz.recording_devices,
                acknowledged: Some(view.rules_quiz.acknowledged),
            },
            government_id_type: view.government_id_type,
            government_id_number: view.government_id_number,
            id_state: view.id_state,
            id_expiration: view.id_expiration.map(|d| d.to_display()),
            digital_signature_present: view.digital_signature_present,
            us_citizen: view.us_citizen,
            created_at_ns: view.created_at.0,
            updated_at_ns: view.updated_at.0,
            submitted_at_ns: view.submitted_at.map(|t| t.0),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SubmitFileDto {
    pub kind: String,
    pub filename: String,
    pub mime_type: String,
    pub content_base64: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SubmitDto {
    #[serde(default)]
    pub form: SubmitForm,
    #[serde(default)]
    pub files: Vec<SubmitFileDto>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DocumentDto {
    pub id: String,
    pub kind: DocumentKind,
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl From<&DocumentRecord> for DocumentDto {
    fn from(value: &DocumentRecord) -> Self {
        Self {
            id: value.id.as_str().to_string(),
            kind: value.kind,
            filename: value.filename.clone(),
            mime_type: value.mime_type.clone(),
            size_bytes: value.size_bytes,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UploadFailureDto {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SkippedFieldDto {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmitResponseDto {
    pub status: String,
    pub submitted_at_ns: u64,
    pub documents: Vec<DocumentDto>,
    pub pdf_error: Option<String>,
    pub upload_failures: Vec<UploadFailureDto>,
    pub skipped_fields: Vec<SkippedFieldDto>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminSummaryDto {
    pub application_id: String,
    pub owner_id: String,
    pub status: ApplicationStatus,
    pub applicant_name: String,
    pub updated_at_ns: u64,
    pub submitted_at_ns: Option<u64>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminListResponseDto {
    pub items: Vec<AdminSummaryDto>,
    pub total: usize,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminApplicationDto {
    pub application_id: String,
    pub owner_id: String,
    pub status: ApplicationStatus,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub email: String,
    pub phone_number: String,
    pub company_or_organization: String,
    pub government_id_number: String,
    pub former_inmate: bool,
    pub on_probation_parole: bool,
    pub visited_inmate: bool,
    pub restricted_access: bool,
    pub felony_conviction: bool,
    pub pending_charges: bool,
    pub documents: Vec<DocumentDto>,
    pub submitted_at_ns: Option<u64>,
}

impl AdminApplicationDto {
    fn from_record(record: &ApplicationRecord, documents: Vec<DocumentDto>) -> Self {
        Self {
            application_id: record.id.as_str().to_string(),
            owner_id: record.owner_id.as_str().to_string(),
            status: record.status,
            first_name: record.personal.first_name.clone(),
            last_name: record.personal.last_name.clone(),
            date_of_birth: record.personal.date_of_birth.to_display(),
            email: record.contact.email.clone(),
            phone_number: record.contact.phone_number.clone(),
            company_or_organization: record.contact.company_or_organization.clone(),
            government_id_number: record.security.government_id_number.clone(),
            former_inmate: record.background.former_inmate,
            on_probation_parole: record.background.on_probation_parole,
            visited_inmate: record.background.visited_inmate,
            restricted_access: record.background.restricted_access,
            felony_conviction: record.background.felony_conviction,
            pending_charges: record.background.pending_charges,
            documents,
            submitted_at_ns: record.submitted_at.map(|t| t.0),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct StatusUpdateDto {
    pub status: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatusChangeResponseDto {
    pub status: String,
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

fn now_ns() -> MonotonicTimeNs {
    let ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
        .max(1);
    MonotonicTimeNs(ns)
}

fn today() -> CalendarDate {
    let days = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| (d.as_secs() / 86_400) as i64)
        .unwrap_or(0);
    // The fallback only triggers if the host clock is wildly out of range.
    CalendarDate::from_days_from_epoch(days).unwrap_or(CalendarDate::EPOCH)
}

fn parse_application_id(raw: &str) -> Result<ApplicationId, ApiError> {
    ApplicationId::new(raw)
        .map_err(|v| ApiError::validation_single("application_id", v.reason()))
}

/// Everything the HTTP surface needs, behind one synchronous runtime the
/// binary shares via `Arc<Mutex<..>>`. Service clients are injected, never
/// global.
pub struct AdapterRuntime {
    store: GateStore,
    drafts: DraftWiring,
    admin: AdminWiring,
    submission: SubmissionWiring<BoxedUploader, StaticTemplate>,
    sessions: StaticSessionTable,
    admin_token_hash: Option<String>,
}

impl AdapterRuntime {
    pub fn new(
        sessions: StaticSessionTable,
        admin_token: Option<&str>,
        uploader: BoxedUploader,
        template_bytes: Vec<u8>,
        submit_config: SubmitConfig,
    ) -> Self {
        Self {
            store: GateStore::new(),
            drafts: DraftWiring,
            admin: AdminWiring,
            submission: SubmissionWiring::new(
                submit_config,
                uploader,
                StaticTemplate::new(template_bytes),
            ),
            sessions,
            admin_token_hash: admin_token.map(sha256_hex),
        }
    }

    pub fn resolve_owner(&self, bearer_token: Option<&str>) -> Result<OwnerId, ApiError> {
        bearer_token
            .and_then(|token| self.sessions.resolve(token))
            .ok_or_else(ApiError::unauthorized)
    }

    pub fn check_admin(&self, bearer_token: Option<&str>) -> Result<(), ApiError> {
        match (&self.admin_token_hash, bearer_token) {
            (Some(expected), Some(token)) if *expected == sha256_hex(token) => Ok(()),
            _ => Err(ApiError::unauthorized()),
        }
    }

    pub fn create_draft(
        &mut self,
        owner_id: OwnerId,
        dto: &CreateDraftDto,
    ) -> Result<CreateDraftResponseDto, ApiError> {
        let application_id = parse_application_id(&dto.application_id)?;
        let created = self
            .drafts
            .create_draft(
                &mut self.store,
                &CreateDraftRequest {
                    application_id,
                    owner_id,
                    personal: dto.personal.clone(),
                    now: now_ns(),
                },
            )
            .map_err(draft_api_error)?;
        Ok(CreateDraftResponseDto {
            status: "created".to_string(),
            application_id: created.as_str().to_string(),
        })
    }

    pub fn patch_step(
        &mut self,
        owner_id: OwnerId,
        application_id: &str,
        step: &str,
        body: serde_json::Value,
    ) -> Result<PatchStepResponseDto, ApiError> {
        let application_id = parse_application_id(application_id)?;
        let step_name = StepName::parse(step)
            .ok_or_else(|| ApiError::bad_request("unknown step name"))?;
        let form = parse_step_form(step_name, body)?;
        let patch = self
            .drafts
            .patch_step(
                &mut self.store,
                &PatchStepRequest {
                    application_id,
                    owner_id,
                    form,
                    now: now_ns(),
                },
            )
            .map_err(draft_api_error)?;
        Ok(PatchStepResponseDto {
            status: "ok".to_string(),
            step: patch.step_name(),
        })
    }

    pub fn get_draft(
        &self,
        owner_id: OwnerId,
        application_id: &str,
    ) -> Result<DraftViewDto, ApiError> {
        let application_id = parse_application_id(application_id)?;
        let view = self
            .drafts
            .get_draft(&self.store, &application_id, &owner_id)
            .map_err(draft_api_error)?;
        Ok(DraftViewDto::from_view(view))
    }

    pub fn submit(
        &mut self,
        owner_id: OwnerId,
        application_id: &str,
        dto: &SubmitDto,
    ) -> Result<SubmitResponseDto, ApiError> {
        let application_id = parse_application_id(application_id)?;
        let mut files = Vec::with_capacity(dto.files.len());
        for file in &dto.files {
            files.push(parse_submit_file(file)?);
        }
        let outcome = self
            .submission
            .run_submit(
                &mut self.store,
                &SubmitRequest {
                    application_id,
                    owner_id,
                    now: now_ns(),
                    today: today(),
                    form: dto.form.clone(),
                    files,
                },
            )
            .map_err(submit_api_error)?;
        Ok(SubmitResponseDto {
            status: "submitted".to_string(),
            submitted_at_ns: outcome.submitted_at.0,
            documents: outcome.documents.iter().map(DocumentDto::from).collect(),
            pdf_error: outcome.pdf_error,
            upload_failures: outcome
                .upload_failures
                .into_iter()
                .map(|f| UploadFailureDto {
                    filename: f.filename,
                    reason: f.reason,
                })
                .collect(),
            skipped_fields: outcome
                .skipped_fields
                .into_iter()
                .map(|s| SkippedFieldDto {
                    field: s.field.to_string(),
                    reason: s.reason.to_string(),
                })
                .collect(),
        })
    }

    pub fn admin_list(
        &self,
        status: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<AdminListResponseDto, ApiError> {
        let status = match status {
            Some(raw) => Some(
                ApplicationStatus::parse(raw)
                    .ok_or_else(|| ApiError::bad_request("unknown status filter"))?,
            ),
            None => None,
        };
        let page = ListPage::v1(offset, limit)
            .map_err(|v| ApiError::validation_single(v.field(), v.reason()))?;
        let result =
            self.admin
                .list_applications(&self.store, &ListFilter { status }, &page);
        Ok(AdminListResponseDto {
            items: result
                .items
                .into_iter()
                .map(|s| AdminSummaryDto {
                    application_id: s.id.as_str().to_string(),
                    owner_id: s.owner_id.as_str().to_string(),
                    status: s.status,
                    applicant_name: s.applicant_name,
                    updated_at_ns: s.updated_at.0,
                    submitted_at_ns: s.submitted_at.map(|t| t.0),
                })
                .collect(),
            total: result.total,
        })
    }

    pub fn admin_get(&self, application_id: &str) -> Result<AdminApplicationDto, ApiError> {
        let application_id = parse_application_id(application_id)?;
        let record = self
            .admin
            .get_application(&self.store, &application_id)
            .map_err(admin_api_error)?;
        let documents = self
            .store
            .documents_for_application(&application_id)
            .into_iter()
            .map(DocumentDto::from)
            .collect();
        Ok(AdminApplicationDto::from_record(&record, documents))
    }

    pub fn admin_update_status(
        &mut self,
        application_id: &str,
        dto: &StatusUpdateDto,
        actor: &str,
    ) -> Result<StatusChangeResponseDto, ApiError> {
        let application_id = parse_application_id(application_id)?;
        let to = ApplicationStatus::parse(&dto.status)
            .ok_or_else(|| ApiError::bad_request("unknown status"))?;
        let change = self
            .admin
            .update_status(&mut self.store, &application_id, to, actor, now_ns())
            .map_err(admin_api_error)?;
        Ok(StatusChangeResponseDto {
            status: "ok".to_string(),
            from: change.from,
            to: change.to,
        })
    }
}

fn parse_step_form(step: StepName, body: serde_json::Value) -> Result<StepForm, ApiError> {
    let malformed = |_| ApiError::bad_request("malformed step payload");
    Ok(match step {
        StepName::Personal => {
            StepForm::Personal(serde_json::from_value::<PersonalForm>(body).map_err(malformed)?)
        }
        StepName::Contact => {
            StepForm::Contact(serde_json::from_value::<ContactForm>(body).map_err(malformed)?)
        }
        StepName::Experience => StepForm::Experience(
            serde_json::from_value::<ExperienceForm>(body).map_err(malformed)?,
        ),
        StepName::Rules => {
            StepForm::Rules(serde_json::from_value::<RulesForm>(body).map_err(malformed)?)
        }
        StepName::Security => {
            StepForm::Security(serde_json::from_value::<SecurityForm>(body).map_err(malformed)?)
        }
    })
}

fn parse_submit_file(dto: &SubmitFileDto) -> Result<SupplementaryFile, ApiError> {
    let kind = DocumentKind::parse(&dto.kind)
        .filter(|k| *k != DocumentKind::FilledForm)
        .ok_or_else(|| {
            ApiError::validation_single("files.kind", "must be passport_scan or warden_letter")
        })?;
    let bytes = BASE64
        .decode(dto.content_base64.as_bytes())
        .map_err(|_| ApiError::validation_single("files.content_base64", "must be base64"))?;
    if bytes.is_empty() {
        return Err(ApiError::validation_single(
            "files.content_base64",
            "must not be empty",
        ));
    }
    Ok(SupplementaryFile {
        kind,
        filename: dto.filename.clone(),
        mime_type: dto.mime_type.clone(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateclear_os::pdf::builtin_template;
    use gateclear_os::uploader::{UploadError, UploadReceipt, UploadRequest};

    struct StubUploader;

    impl DocumentUploader for StubUploader {
        fn upload(&self, request: &UploadRequest) -> Result<UploadReceipt, UploadError> {
            Ok(UploadReceipt {
                blob_ref: format!("blob://{}", request.filename),
                size_bytes: request.bytes.len() as u64,
            })
        }
    }

    fn runtime() -> AdapterRuntime {
        let mut sessions = StaticSessionTable::default();
        sessions.insert("token-jane", OwnerId::new("user-jane").unwrap());
        sessions.insert("token-mallory", OwnerId::new("user-mallory").unwrap());
        AdapterRuntime::new(
            sessions,
            Some("admin-token"),
            Box::new(StubUploader),
            builtin_template().unwrap(),
            SubmitConfig::mvp_v1(),
        )
    }

    fn jane(runtime: &AdapterRuntime) -> OwnerId {
        runtime.resolve_owner(Some("token-jane")).unwrap()
    }

    fn create(runtime: &mut AdapterRuntime) {
        let owner = jane(runtime);
        runtime
            .create_draft(
                owner,
                &CreateDraftDto {
                    application_id: "app-1".to_string(),
                    personal: PersonalForm {
                        first_name: Some("Jane".to_string()),
                        last_name: Some("Doe".to_string()),
                        other_names: None,
                        date_of_birth: Some("05-01-1990".to_string()),
                        gender: Some("female".to_string()),
                    },
                },
            )
            .unwrap();
    }

    fn submit_body() -> SubmitDto {
        serde_json::from_value(serde_json::json!({
            "form": {
                "contact": {
                    "email": "jane@x.com",
                    "email_confirm": "jane@x.com",
                    "phone_number": "4155551234",
                    "company_or_organization": "Acme",
                    "purpose_of_visit": "Tour"
                },
                "experience": {
                    "engaged_directly": "Volunteered",
                    "perceptions": "Shifted",
                    "expectations": "Listening",
                    "justice_reform_before": "Read about it",
                    "interests_most": "Education",
                    "reform_future": "More access"
                },
                "rules": {
                    "escort_required": true,
                    "contraband_declared": true,
                    "dress_code_acknowledged": true,
                    "contact_with_residents": false,
                    "recording_devices": false,
                    "acknowledged": true
                },
                "security": {
                    "government_id_type": "driver_license",
                    "government_id_number": "D1234567",
                    "id_state": "CA",
                    "id_expiration": "01-01-2030",
                    "digital_signature": signature_uri(),
                    "us_citizen": true
                }
            },
            "files": []
        }))
        .unwrap()
    }

    fn signature_uri() -> String {
        // Minimal JPEG header: SOI + SOF0 declaring 2x3. The filler only
        // needs the dimensions; the bytes pass through as DCTDecode data.
        let jpeg: [u8; 15] = [
            0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00, 0x03, 0x00, 0x02, 0x01, 0x11, 0xFF,
            0xD9,
        ];
        format!("data:image/jpeg;base64,{}", BASE64.encode(jpeg))
    }

    #[test]
    fn at_api_01_missing_or_unknown_token_is_unauthorized_without_detail() {
        let runtime = runtime();
        let missing = runtime.resolve_owner(None).unwrap_err();
        assert_eq!(missing.status, 401);
        assert_eq!(missing.message, "unauthorized");
        let unknown = runtime.resolve_owner(Some("nope")).unwrap_err();
        assert_eq!(unknown, missing);
        assert!(runtime.check_admin(Some("token-jane")).is_err());
        assert!(runtime.check_admin(Some("admin-token")).is_ok());
    }

    #[test]
    fn at_api_02_foreign_owner_sees_not_found_not_forbidden() {
        let mut rt = runtime();
        create(&mut rt);
        let mallory = rt.resolve_owner(Some("token-mallory")).unwrap();
        let err = rt.get_draft(mallory, "app-1").unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[test]
    fn at_api_03_wizard_flow_over_the_runtime_surface() {
        let mut rt = runtime();
        create(&mut rt);
        let owner = jane(&rt);

        rt.patch_step(
            owner.clone(),
            "app-1",
            "contact",
            serde_json::json!({ "email": "jane@x.com", "phone_number": "+1 (415) 555-1234" }),
        )
        .unwrap();

        let draft = rt.get_draft(owner.clone(), "app-1").unwrap();
        assert_eq!(draft.email.as_deref(), Some("jane@x.com"));
        assert_eq!(draft.phone_number.as_deref(), Some("4155551234"));
        assert_eq!(draft.company_or_organization, None);

        let response = rt.submit(owner, "app-1", &submit_body()).unwrap();
        assert_eq!(response.status, "submitted");
        assert!(response.pdf_error.is_none());
        assert_eq!(response.documents.len(), 1);
        assert_eq!(response.documents[0].mime_type, "application/pdf");
    }

    #[test]
    fn at_api_04_validation_errors_carry_the_full_field_list() {
        let mut rt = runtime();
        create(&mut rt);
        let owner = jane(&rt);
        let mut dto = submit_body();
        dto.form.contact.email = Some("nope".to_string());
        dto.form.contact.email_confirm = Some("nope".to_string());
        dto.form.rules.acknowledged = Some(false);

        let err = rt.submit(owner, "app-1", &dto).unwrap_err();
        assert_eq!(err.status, 422);
        let fields: Vec<&str> = err
            .validation_errors
            .iter()
            .map(|e| e.field.as_str())
            .collect();
        assert!(fields.contains(&"contact.email"));
        assert!(fields.contains(&"rules.acknowledged"));
    }

    #[test]
    fn at_api_05_admin_flow_lists_reviews_and_advances() {
        let mut rt = runtime();
        create(&mut rt);
        let owner = jane(&rt);
        rt.submit(owner, "app-1", &submit_body()).unwrap();

        let listed = rt.admin_list(Some("submitted"), 0, 50).unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.items[0].applicant_name, "Jane Doe");

        let detail = rt.admin_get("app-1").unwrap();
        assert_eq!(detail.email, "jane@x.com");
        assert_eq!(detail.documents.len(), 1);

        let change = rt
            .admin_update_status(
                "app-1",
                &StatusUpdateDto {
                    status: "under_review".to_string(),
                },
                "admin-1",
            )
            .unwrap();
        assert_eq!(change.to, ApplicationStatus::UnderReview);

        let err = rt
            .admin_update_status(
                "app-1",
                &StatusUpdateDto {
                    status: "draft".to_string(),
                },
                "admin-1",
            )
            .unwrap_err();
        assert_eq!(err.status, 409);
    }

    #[test]
    fn at_api_06_duplicate_create_conflicts() {
        let mut rt = runtime();
        create(&mut rt);
        let owner = jane(&rt);
        let err = rt
            .create_draft(
                owner,
                &CreateDraftDto {
                    application_id: "app-1".to_string(),
                    personal: PersonalForm {
                        first_name: Some("Jane".to_string()),
                        last_name: Some("Doe".to_string()),
                        other_names: None,
                        date_of_birth: Some("05-01-1990".to_string()),
                        gender: Some("female".to_string()),
                    },
                },
            )
            .unwrap_err();
        assert_eq!(err.status, 409);
    }

    #[test]
    fn at_api_07_submit_files_must_be_supplementary_kinds() {
        let bad = SubmitFileDto {
            kind: "filled_form".to_string(),
            filename: "sneaky.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            content_base64: BASE64.encode(b"x"),
        };
        assert!(parse_submit_file(&bad).is_err());

        let good = SubmitFileDto {
            kind: "warden_letter".to_string(),
            filename: "letter.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            content_base64: BASE64.encode(b"letter"),
        };
        let parsed = parse_submit_file(&good).unwrap();
        assert_eq!(parsed.kind, DocumentKind::WardenLetter);
        assert_eq!(parsed.bytes, b"letter");
    }
}
