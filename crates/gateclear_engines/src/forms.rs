#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use gateclear_contracts::steps::StepName;

/// Raw wire-shaped step forms. These are the only loosely-typed payloads in
/// the system; the step validator converts them to typed patches at the
/// boundary so everything past it operates on typed records. Unknown JSON
/// keys are ignored, matching incremental-save semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub other_names: Option<String>,
    /// Display form, `MM-DD-YYYY`.
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub email: Option<String>,
    pub email_confirm: Option<String>,
    pub phone_number: Option<String>,
    pub company_or_organization: Option<String>,
    pub purpose_of_visit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceForm {
    pub engaged_directly: Option<String>,
    pub perceptions: Option<String>,
    pub expectations: Option<String>,
    pub justice_reform_before: Option<String>,
    pub interests_most: Option<String>,
    pub reform_future: Option<String>,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesForm {
    pub escort_required: Option<bool>,
    pub contraband_declared: Option<bool>,
    pub dress_code_acknowledged: Option<bool>,
    pub contact_with_residents: Option<bool>,
    pub recording_devices: Option<bool>,
    pub acknowledged: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityForm {
    pub government_id_type: Option<String>,
    pub government_id_number: Option<String>,
    pub id_state: Option<String>,
    /// Display form, `MM-DD-YYYY`.
    pub id_expiration: Option<String>,
    pub digital_signature: Option<String>,
    pub us_citizen: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundForm {
    pub former_inmate: Option<bool>,
    pub on_probation_parole: Option<bool>,
    pub visited_inmate: Option<bool>,
    pub restricted_access: Option<bool>,
    pub felony_conviction: Option<bool>,
    pub pending_charges: Option<bool>,
}

/// One step's raw payload, tagged by which step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepForm {
    Personal(PersonalForm),
    Contact(ContactForm),
    Experience(ExperienceForm),
    Rules(RulesForm),
    Security(SecurityForm),
}

impl StepForm {
    pub fn step_name(&self) -> StepName {
        match self {
            Self::Personal(_) => StepName::Personal,
            Self::Contact(_) => StepName::Contact,
            Self::Experience(_) => StepName::Experience,
            Self::Rules(_) => StepName::Rules,
            Self::Security(_) => StepName::Security,
        }
    }
}

/// The full payload posted at final submission: every section at once, the
/// background flags, and submit-only extras that are never persisted (the
/// confirm field and the out-of-band SSN used only for the PDF fill).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub personal: PersonalForm,
    #[serde(default)]
    pub contact: ContactForm,
    #[serde(default)]
    pub experience: ExperienceForm,
    #[serde(default)]
    pub rules: RulesForm,
    #[serde(default)]
    pub security: SecurityForm,
    #[serde(default)]
    pub background: BackgroundForm,
    pub ssn: Option<String>,
}
