#![forbid(unsafe_code)]

use serde::Serialize;

use gateclear_contracts::application::{
    ApplicationRecord, Gender, GovernmentIdType, PersonalInfo, SignatureDataUri,
};
use gateclear_contracts::date::CalendarDate;
use gateclear_contracts::placeholder::{
    is_placeholder, SENTINEL_COMPANY, SENTINEL_EMAIL, SENTINEL_GOV_ID_NUMBER, SENTINEL_PHONE,
};
use gateclear_contracts::steps::{
    ContactPatch, ExperiencePatch, PersonalPatch, RulesPatch, SecurityPatch, StepPatch,
};
use gateclear_contracts::ContractViolation;

use crate::forms::{
    ContactForm, ExperienceForm, PersonalForm, RulesForm, SecurityForm, StepForm,
};
use crate::normalize::{email_shape_ok, normalize_phone, PhoneError};
use crate::quiz::quiz_errors;

/// One validation failure. Full-mode validation returns every error at
/// once so the client can highlight all offending fields together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

const MSG_REQUIRED: &str = "is required";
const MSG_BLANK: &str = "must not be blank";
const MSG_TOO_LONG: &str = "too long";
const MSG_BAD_DATE: &str = "must be a valid MM-DD-YYYY date";
const MSG_BAD_EMAIL: &str = "must be a valid email address";
const MSG_BAD_PHONE: &str = "must contain 10 digits, or 11 digits with a leading 1";
const MSG_BAD_SIGNATURE: &str = "must be a data:image/png or data:image/jpeg base64 URI";

fn check_text(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    max_len: usize,
) -> bool {
    if value.trim().is_empty() {
        errors.push(FieldError {
            field,
            message: MSG_BLANK,
        });
        return false;
    }
    if value.len() > max_len {
        errors.push(FieldError {
            field,
            message: MSG_TOO_LONG,
        });
        return false;
    }
    true
}

fn check_date(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    raw: &str,
) -> Option<CalendarDate> {
    match CalendarDate::parse_display(raw) {
        Ok(d) => Some(d),
        Err(_) => {
            errors.push(FieldError {
                field,
                message: MSG_BAD_DATE,
            });
            None
        }
    }
}

/// Incremental mode: validates only the fields present in a partial step
/// payload. Absent fields are ignored so partial progress is never blocked
/// on fields the user has not reached.
pub fn check_step_form(form: &StepForm) -> Result<StepPatch, Vec<FieldError>> {
    match form {
        StepForm::Personal(f) => check_personal_form(f).map(StepPatch::Personal),
        StepForm::Contact(f) => check_contact_form(f).map(StepPatch::Contact),
        StepForm::Experience(f) => check_experience_form(f).map(StepPatch::Experience),
        StepForm::Rules(f) => Ok(StepPatch::Rules(rules_patch(f))),
        StepForm::Security(f) => check_security_form(f).map(StepPatch::Security),
    }
}

pub fn check_personal_form(form: &PersonalForm) -> Result<PersonalPatch, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut patch = PersonalPatch::default();

    if let Some(v) = &form.first_name {
        if check_text(&mut errors, "personal.first_name", v, 100) {
            patch.first_name = Some(v.trim().to_string());
        }
    }
    if let Some(v) = &form.last_name {
        if check_text(&mut errors, "personal.last_name", v, 100) {
            patch.last_name = Some(v.trim().to_string());
        }
    }
    if let Some(v) = &form.other_names {
        if check_text(&mut errors, "personal.other_names", v, 100) {
            patch.other_names = Some(v.trim().to_string());
        }
    }
    if let Some(v) = &form.date_of_birth {
        patch.date_of_birth = check_date(&mut errors, "personal.date_of_birth", v);
    }
    if let Some(v) = &form.gender {
        match Gender::parse(v) {
            Some(g) => patch.gender = Some(g),
            None => errors.push(FieldError {
                field: "personal.gender",
                message: "must be one of female, male, non_binary, prefer_not_to_say",
            }),
        }
    }

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

/// Create-draft validation: the four identity fields are mandatory up
/// front, everything else starts as a placeholder.
pub fn check_personal_create(form: &PersonalForm) -> Result<PersonalInfo, Vec<FieldError>> {
    let mut errors = Vec::new();
    let required: [(&'static str, &Option<String>); 4] = [
        ("personal.first_name", &form.first_name),
        ("personal.last_name", &form.last_name),
        ("personal.date_of_birth", &form.date_of_birth),
        ("personal.gender", &form.gender),
    ];
    for (field, value) in required {
        if value.is_none() {
            errors.push(FieldError {
                field,
                message: MSG_REQUIRED,
            });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let patch = check_personal_form(form)?;
    match (
        patch.first_name,
        patch.last_name,
        patch.date_of_birth,
        patch.gender,
    ) {
        (Some(first_name), Some(last_name), Some(date_of_birth), Some(gender)) => {
            PersonalInfo::v1(first_name, last_name, patch.other_names, date_of_birth, gender)
                .map_err(|v| vec![violation_error(&v)])
        }
        _ => Err(vec![FieldError {
            field: "personal",
            message: "incomplete personal section",
        }]),
    }
}

pub fn check_contact_form(form: &ContactForm) -> Result<ContactPatch, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut patch = ContactPatch::default();

    if let Some(v) = &form.email {
        if !email_shape_ok(v) {
            errors.push(FieldError {
                field: "contact.email",
                message: MSG_BAD_EMAIL,
            });
        } else {
            patch.email = Some(v.clone());
        }
    }
    if let (Some(email), Some(confirm)) = (&form.email, &form.email_confirm) {
        if email != confirm {
            errors.push(FieldError {
                field: "contact.email_confirm",
                message: "must match email",
            });
        }
    }
    if let Some(v) = &form.phone_number {
        match normalize_phone(v) {
            Ok(digits) => patch.phone_number = Some(digits.as_str().to_string()),
            Err(PhoneError::Empty) => errors.push(FieldError {
                field: "contact.phone_number",
                message: MSG_BLANK,
            }),
            Err(PhoneError::WrongDigitCount) => errors.push(FieldError {
                field: "contact.phone_number",
                message: MSG_BAD_PHONE,
            }),
        }
    }
    if let Some(v) = &form.company_or_organization {
        if check_text(&mut errors, "contact.company_or_organization", v, 200) {
            patch.company_or_organization = Some(v.trim().to_string());
        }
    }
    if let Some(v) = &form.purpose_of_visit {
        if check_text(&mut errors, "contact.purpose_of_visit", v, 500) {
            patch.purpose_of_visit = Some(v.trim().to_string());
        }
    }

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

pub fn check_experience_form(form: &ExperienceForm) -> Result<ExperiencePatch, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut patch = ExperiencePatch::default();

    let fields: [(&'static str, &Option<String>, &mut Option<String>); 7] = [
        (
            "experience.engaged_directly",
            &form.engaged_directly,
            &mut patch.engaged_directly,
        ),
        (
            "experience.perceptions",
            &form.perceptions,
            &mut patch.perceptions,
        ),
        (
            "experience.expectations",
            &form.expectations,
            &mut patch.expectations,
        ),
        (
            "experience.justice_reform_before",
            &form.justice_reform_before,
            &mut patch.justice_reform_before,
        ),
        (
            "experience.interests_most",
            &form.interests_most,
            &mut patch.interests_most,
        ),
        (
            "experience.reform_future",
            &form.reform_future,
            &mut patch.reform_future,
        ),
        (
            "experience.additional_notes",
            &form.additional_notes,
            &mut patch.additional_notes,
        ),
    ];
    for (field, value, slot) in fields {
        if let Some(v) = value {
            if check_text(&mut errors, field, v, 2000) {
                *slot = Some(v.trim().to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

fn rules_patch(form: &RulesForm) -> RulesPatch {
    RulesPatch {
        escort_required: form.escort_required,
        contraband_declared: form.contraband_declared,
        dress_code_acknowledged: form.dress_code_acknowledged,
        contact_with_residents: form.contact_with_residents,
        recording_devices: form.recording_devices,
        acknowledged: form.acknowledged,
    }
}

pub fn check_security_form(form: &SecurityForm) -> Result<SecurityPatch, Vec<FieldError>> {
    let mut errors = Vec::new();
    let mut patch = SecurityPatch::default();

    if let Some(v) = &form.government_id_type {
        match GovernmentIdType::parse(v) {
            Some(t) => patch.government_id_type = Some(t),
            None => errors.push(FieldError {
                field: "security.government_id_type",
                message: "must be driver_license or passport",
            }),
        }
    }
    if let Some(v) = &form.government_id_number {
        if check_text(&mut errors, "security.government_id_number", v, 64) {
            patch.government_id_number = Some(v.trim().to_string());
        }
    }
    if let Some(v) = &form.id_state {
        let trimmed = v.trim();
        if trimmed.len() == 2 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            patch.id_state = Some(trimmed.to_ascii_uppercase());
        } else {
            errors.push(FieldError {
                field: "security.id_state",
                message: "must be a two-letter state code",
            });
        }
    }
    if let Some(v) = &form.id_expiration {
        patch.id_expiration = check_date(&mut errors, "security.id_expiration", v);
    }
    if let Some(v) = &form.digital_signature {
        match SignatureDataUri::new(v.clone()) {
            Ok(s) => patch.digital_signature = Some(s),
            Err(_) => errors.push(FieldError {
                field: "security.digital_signature",
                message: MSG_BAD_SIGNATURE,
            }),
        }
    }
    patch.us_citizen = form.us_citizen;

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

/// Configuration for full-mode validation. `today` is supplied by the
/// caller so the check itself never reads a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullCheckConfig {
    pub expiration_grace_days: u16,
    pub today: CalendarDate,
}

impl FullCheckConfig {
    pub fn v1(today: CalendarDate, expiration_grace_days: u16) -> Result<Self, ContractViolation> {
        if expiration_grace_days > 3650 {
            return Err(ContractViolation::InvalidValue {
                field: "full_check_config.expiration_grace_days",
                reason: "must be <= 3650",
            });
        }
        Ok(Self {
            expiration_grace_days,
            today,
        })
    }
}

/// Submit-only values that are validated against the record but never
/// stored on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitExtras {
    pub email_confirm: Option<String>,
}

fn require_real(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    value: &str,
    sentinel: &str,
) -> bool {
    if is_placeholder(Some(value), sentinel) {
        errors.push(FieldError {
            field,
            message: MSG_REQUIRED,
        });
        false
    } else {
        true
    }
}

/// Full mode: every field's final constraint over the assembled record,
/// errors collected rather than short-circuited.
pub fn check_full(
    record: &ApplicationRecord,
    extras: &SubmitExtras,
    config: &FullCheckConfig,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    check_text(&mut errors, "personal.first_name", &record.personal.first_name, 100);
    check_text(&mut errors, "personal.last_name", &record.personal.last_name, 100);

    if require_real(&mut errors, "contact.email", &record.contact.email, SENTINEL_EMAIL)
        && !email_shape_ok(&record.contact.email)
    {
        errors.push(FieldError {
            field: "contact.email",
            message: MSG_BAD_EMAIL,
        });
    }
    if let Some(confirm) = &extras.email_confirm {
        if confirm != &record.contact.email {
            errors.push(FieldError {
                field: "contact.email_confirm",
                message: "must match email",
            });
        }
    }
    if require_real(
        &mut errors,
        "contact.phone_number",
        &record.contact.phone_number,
        SENTINEL_PHONE,
    ) && normalize_phone(&record.contact.phone_number).is_err()
    {
        errors.push(FieldError {
            field: "contact.phone_number",
            message: MSG_BAD_PHONE,
        });
    }
    require_real(
        &mut errors,
        "contact.company_or_organization",
        &record.contact.company_or_organization,
        SENTINEL_COMPANY,
    );

    let experience: [(&'static str, &Option<String>); 6] = [
        ("experience.engaged_directly", &record.experience.engaged_directly),
        ("experience.perceptions", &record.experience.perceptions),
        ("experience.expectations", &record.experience.expectations),
        (
            "experience.justice_reform_before",
            &record.experience.justice_reform_before,
        ),
        ("experience.interests_most", &record.experience.interests_most),
        ("experience.reform_future", &record.experience.reform_future),
    ];
    for (field, value) in experience {
        match value {
            None => errors.push(FieldError {
                field,
                message: MSG_REQUIRED,
            }),
            Some(v) if v.trim().is_empty() => errors.push(FieldError {
                field,
                message: MSG_BLANK,
            }),
            Some(_) => {}
        }
    }

    errors.extend(quiz_errors(&record.rules_quiz));

    require_real(
        &mut errors,
        "security.government_id_number",
        &record.security.government_id_number,
        SENTINEL_GOV_ID_NUMBER,
    );
    if record.security.government_id_type == GovernmentIdType::DriverLicense
        && record.security.id_state.is_none()
    {
        errors.push(FieldError {
            field: "security.id_state",
            message: "is required for driver licenses",
        });
    }
    match record.security.id_expiration {
        None => errors.push(FieldError {
            field: "security.id_expiration",
            message: MSG_REQUIRED,
        }),
        Some(expiration) => {
            let earliest =
                config.today.days_from_epoch() - i64::from(config.expiration_grace_days);
            if expiration.days_from_epoch() < earliest {
                errors.push(FieldError {
                    field: "security.id_expiration",
                    message: "identification is expired",
                });
            }
        }
    }
    if record.security.digital_signature.is_none() {
        errors.push(FieldError {
            field: "security.digital_signature",
            message: MSG_REQUIRED,
        });
    }

    errors
}

fn violation_error(v: &ContractViolation) -> FieldError {
    FieldError {
        field: v.field(),
        message: v.reason(),
    }
}
