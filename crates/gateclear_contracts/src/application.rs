#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::date::CalendarDate;
use crate::placeholder::{
    SENTINEL_COMPANY, SENTINEL_EMAIL, SENTINEL_GOV_ID_NUMBER, SENTINEL_GOV_ID_TYPE, SENTINEL_PHONE,
};
use crate::{ContractViolation, MonotonicTimeNs, SchemaVersion, Validate};

pub const APPLICATION_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

fn validate_id(field: &'static str, s: &str, max_len: usize) -> Result<(), ContractViolation> {
    if s.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if s.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        });
    }
    if !s.is_ascii() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be ASCII",
        });
    }
    Ok(())
}

fn validate_text(
    field: &'static str,
    s: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if s.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if s.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "too long",
        });
    }
    Ok(())
}

fn validate_opt_text(
    field: &'static str,
    s: &Option<String>,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if let Some(v) = s {
        validate_text(field, v, max_len)?;
    }
    Ok(())
}

/// Client-generated application identity. Create is conflict-checked by id,
/// so retrying a create with the same id cannot duplicate the row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApplicationId(String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for ApplicationId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("application_id", &self.0, 64)
    }
}

/// The authenticated caller, as resolved by the fronting identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for OwnerId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("owner_id", &self.0, 128)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "under_review" => Some(Self::UnderReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Status transitions are monotonic and forward-only; there is no path back
/// to an earlier state and no self-transition.
pub fn is_forward_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    matches!(
        (from, to),
        (ApplicationStatus::Draft, ApplicationStatus::Submitted)
            | (ApplicationStatus::Submitted, ApplicationStatus::UnderReview)
            | (ApplicationStatus::UnderReview, ApplicationStatus::Approved)
            | (ApplicationStatus::UnderReview, ApplicationStatus::Rejected)
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Female,
    Male,
    NonBinary,
    PreferNotToSay,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::NonBinary => "non_binary",
            Self::PreferNotToSay => "prefer_not_to_say",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "female" => Some(Self::Female),
            "male" => Some(Self::Male),
            "non_binary" => Some(Self::NonBinary),
            "prefer_not_to_say" => Some(Self::PreferNotToSay),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Female => "Female",
            Self::Male => "Male",
            Self::NonBinary => "Non-binary",
            Self::PreferNotToSay => "Prefer not to say",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernmentIdType {
    DriverLicense,
    Passport,
}

impl GovernmentIdType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DriverLicense => "driver_license",
            Self::Passport => "passport",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "driver_license" => Some(Self::DriverLicense),
            "passport" => Some(Self::Passport),
            _ => None,
        }
    }
}

/// A signature captured by the UI as a base64 data URI. Only the URI shape
/// is validated here; byte-level decoding happens at PDF-fill time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureDataUri(String);

pub const SIGNATURE_PNG_PREFIX: &str = "data:image/png;base64,";
pub const SIGNATURE_JPEG_PREFIX: &str = "data:image/jpeg;base64,";

impl SignatureDataUri {
    pub fn new(raw: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(raw.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base64 payload after the recognized prefix.
    pub fn payload(&self) -> &str {
        if let Some(rest) = self.0.strip_prefix(SIGNATURE_PNG_PREFIX) {
            return rest;
        }
        if let Some(rest) = self.0.strip_prefix(SIGNATURE_JPEG_PREFIX) {
            return rest;
        }
        ""
    }
}

impl Validate for SignatureDataUri {
    fn validate(&self) -> Result<(), ContractViolation> {
        let payload = if let Some(rest) = self.0.strip_prefix(SIGNATURE_PNG_PREFIX) {
            rest
        } else if let Some(rest) = self.0.strip_prefix(SIGNATURE_JPEG_PREFIX) {
            rest
        } else {
            return Err(ContractViolation::InvalidValue {
                field: "digital_signature",
                reason: "must be a data:image/png or data:image/jpeg base64 URI",
            });
        };
        if payload.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "digital_signature",
                reason: "payload must not be empty",
            });
        }
        if self.0.len() > 4_000_000 {
            return Err(ContractViolation::InvalidValue {
                field: "digital_signature",
                reason: "payload too large",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub other_names: Option<String>,
    pub date_of_birth: CalendarDate,
    pub gender: Gender,
}

impl PersonalInfo {
    pub fn v1(
        first_name: String,
        last_name: String,
        other_names: Option<String>,
        date_of_birth: CalendarDate,
        gender: Gender,
    ) -> Result<Self, ContractViolation> {
        let p = Self {
            first_name,
            last_name,
            other_names,
            date_of_birth,
            gender,
        };
        p.validate()?;
        Ok(p)
    }
}

impl Validate for PersonalInfo {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("personal.first_name", &self.first_name, 100)?;
        validate_text("personal.last_name", &self.last_name, 100)?;
        validate_opt_text("personal.other_names", &self.other_names, 100)?;
        self.date_of_birth.validate()?;
        Ok(())
    }
}

/// Contact section of the stored record. While the application is a draft,
/// email/phone/company may hold their placeholder sentinels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub email: String,
    pub phone_number: String,
    pub company_or_organization: String,
    pub purpose_of_visit: Option<String>,
}

impl ContactInfo {
    pub fn placeholder() -> Self {
        Self {
            email: SENTINEL_EMAIL.to_string(),
            phone_number: SENTINEL_PHONE.to_string(),
            company_or_organization: SENTINEL_COMPANY.to_string(),
            purpose_of_visit: None,
        }
    }
}

impl Validate for ContactInfo {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("contact.email", &self.email, 254)?;
        validate_text("contact.phone_number", &self.phone_number, 32)?;
        validate_text(
            "contact.company_or_organization",
            &self.company_or_organization,
            200,
        )?;
        validate_opt_text("contact.purpose_of_visit", &self.purpose_of_visit, 500)?;
        Ok(())
    }
}

/// Free-form program answers. Every field is optional while drafting;
/// full-mode validation decides which are required at submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperienceAnswers {
    pub engaged_directly: Option<String>,
    pub perceptions: Option<String>,
    pub expectations: Option<String>,
    pub justice_reform_before: Option<String>,
    pub interests_most: Option<String>,
    pub reform_future: Option<String>,
    pub additional_notes: Option<String>,
}

impl Validate for ExperienceAnswers {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_text("experience.engaged_directly", &self.engaged_directly, 2000)?;
        validate_opt_text("experience.perceptions", &self.perceptions, 2000)?;
        validate_opt_text("experience.expectations", &self.expectations, 2000)?;
        validate_opt_text(
            "experience.justice_reform_before",
            &self.justice_reform_before,
            2000,
        )?;
        validate_opt_text("experience.interests_most", &self.interests_most, 2000)?;
        validate_opt_text("experience.reform_future", &self.reform_future, 2000)?;
        validate_opt_text("experience.additional_notes", &self.additional_notes, 2000)?;
        Ok(())
    }
}

/// Facility-rules quiz answers. `None` means the question has not been
/// answered yet; correctness is judged by the quiz predicate at submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RulesQuizAnswers {
    pub escort_required: Option<bool>,
    pub contraband_declared: Option<bool>,
    pub dress_code_acknowledged: Option<bool>,
    pub contact_with_residents: Option<bool>,
    pub recording_devices: Option<bool>,
    pub acknowledged: bool,
}

/// Security/ID section of the stored record. Id type and number carry
/// placeholder sentinels until the security step is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityRecord {
    pub government_id_type: GovernmentIdType,
    pub government_id_number: String,
    pub id_state: Option<String>,
    pub id_expiration: Option<CalendarDate>,
    pub digital_signature: Option<SignatureDataUri>,
    pub us_citizen: bool,
}

impl SecurityRecord {
    pub fn placeholder() -> Self {
        Self {
            government_id_type: SENTINEL_GOV_ID_TYPE,
            government_id_number: SENTINEL_GOV_ID_NUMBER.to_string(),
            id_state: None,
            id_expiration: None,
            digital_signature: None,
            us_citizen: false,
        }
    }
}

impl Validate for SecurityRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text(
            "security.government_id_number",
            &self.government_id_number,
            64,
        )?;
        validate_opt_text("security.id_state", &self.id_state, 32)?;
        if let Some(d) = &self.id_expiration {
            d.validate()?;
        }
        if let Some(s) = &self.digital_signature {
            s.validate()?;
        }
        Ok(())
    }
}

/// Background screening flags. Defaults are all-false; they only carry
/// meaning once the application has been submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackgroundFlags {
    pub former_inmate: bool,
    pub on_probation_parole: bool,
    pub visited_inmate: bool,
    pub restricted_access: bool,
    pub felony_conviction: bool,
    pub pending_charges: bool,
}

/// The central stored entity: one row per gate-clearance application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub owner_id: OwnerId,
    pub status: ApplicationStatus,
    pub personal: PersonalInfo,
    pub contact: ContactInfo,
    pub experience: ExperienceAnswers,
    pub rules_quiz: RulesQuizAnswers,
    pub security: SecurityRecord,
    pub background: BackgroundFlags,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
    pub submitted_at: Option<MonotonicTimeNs>,
}

impl ApplicationRecord {
    /// A fresh draft: real personal fields, sentinels everywhere a storage
    /// column is not-null but the user has not reached that step yet.
    pub fn new_draft(
        id: ApplicationId,
        owner_id: OwnerId,
        personal: PersonalInfo,
        now: MonotonicTimeNs,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            id,
            owner_id,
            status: ApplicationStatus::Draft,
            personal,
            contact: ContactInfo::placeholder(),
            experience: ExperienceAnswers::default(),
            rules_quiz: RulesQuizAnswers::default(),
            security: SecurityRecord::placeholder(),
            background: BackgroundFlags::default(),
            created_at: now,
            updated_at: now,
            submitted_at: None,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for ApplicationRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        self.owner_id.validate()?;
        self.personal.validate()?;
        self.contact.validate()?;
        self.experience.validate()?;
        self.security.validate()?;
        if self.status == ApplicationStatus::Draft && self.submitted_at.is_some() {
            return Err(ContractViolation::InvalidValue {
                field: "application.submitted_at",
                reason: "must be unset while status is draft",
            });
        }
        if self.status != ApplicationStatus::Draft && self.submitted_at.is_none() {
            return Err(ContractViolation::InvalidValue {
                field: "application.submitted_at",
                reason: "must be set once status leaves draft",
            });
        }
        Ok(())
    }
}
