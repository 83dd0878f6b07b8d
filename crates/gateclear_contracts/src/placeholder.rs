#![forbid(unsafe_code)]

use crate::application::{
    ApplicationId, ApplicationRecord, ApplicationStatus, ExperienceAnswers, GovernmentIdType,
    OwnerId, PersonalInfo, RulesQuizAnswers,
};
use crate::date::CalendarDate;
use crate::MonotonicTimeNs;

/// Sentinel values used to satisfy not-null storage constraints before the
/// user reaches the step that provides the real value. Each
/// placeholder-bearing field has exactly one designated sentinel.
pub const SENTINEL_EMAIL: &str = "pending@example.com";
pub const SENTINEL_PHONE: &str = "0000000000";
pub const SENTINEL_COMPANY: &str = "PENDING";
pub const SENTINEL_GOV_ID_NUMBER: &str = "PENDING";
pub const SENTINEL_GOV_ID_TYPE: GovernmentIdType = GovernmentIdType::DriverLicense;

/// True when a stored value is still "not yet provided": absent, blank, or
/// exactly equal to its designated sentinel. Pure predicate, no side effect.
pub fn is_placeholder(value: Option<&str>, sentinel: &str) -> bool {
    match value {
        None => true,
        Some(v) => v.trim().is_empty() || v == sentinel,
    }
}

/// Substitution used by draft readers: sentinel or blank in, `None` out, so
/// the user is never shown synthetic data.
pub fn present_or_none(value: &str, sentinel: &str) -> Option<String> {
    if is_placeholder(Some(value), sentinel) {
        None
    } else {
        Some(value.to_string())
    }
}

/// A draft as presented back to its owner: every placeholder-bearing field
/// is substituted to `None` per the placeholder policy. The raw signature
/// payload is not echoed back; only its presence is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftView {
    pub id: ApplicationId,
    pub owner_id: OwnerId,
    pub status: ApplicationStatus,
    pub personal: PersonalInfo,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_or_organization: Option<String>,
    pub purpose_of_visit: Option<String>,
    pub experience: ExperienceAnswers,
    pub rules_quiz: RulesQuizAnswers,
    pub government_id_type: Option<GovernmentIdType>,
    pub government_id_number: Option<String>,
    pub id_state: Option<String>,
    pub id_expiration: Option<CalendarDate>,
    pub digital_signature_present: bool,
    pub us_citizen: bool,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
    pub submitted_at: Option<MonotonicTimeNs>,
}

impl DraftView {
    pub fn from_record(record: &ApplicationRecord) -> Self {
        // The id-type sentinel is a legitimate enum value; the paired id
        // number disambiguates whether the security step was ever saved.
        let id_number_pending = is_placeholder(
            Some(&record.security.government_id_number),
            SENTINEL_GOV_ID_NUMBER,
        );
        let government_id_type = if record.security.government_id_type == SENTINEL_GOV_ID_TYPE
            && id_number_pending
        {
            None
        } else {
            Some(record.security.government_id_type)
        };
        Self {
            id: record.id.clone(),
            owner_id: record.owner_id.clone(),
            status: record.status,
            personal: record.personal.clone(),
            email: present_or_none(&record.contact.email, SENTINEL_EMAIL),
            phone_number: present_or_none(&record.contact.phone_number, SENTINEL_PHONE),
            company_or_organization: present_or_none(
                &record.contact.company_or_organization,
                SENTINEL_COMPANY,
            ),
            purpose_of_visit: record.contact.purpose_of_visit.clone(),
            experience: record.experience.clone(),
            rules_quiz: record.rules_quiz,
            government_id_type,
            government_id_number: present_or_none(
                &record.security.government_id_number,
                SENTINEL_GOV_ID_NUMBER,
            ),
            id_state: record.security.id_state.clone(),
            id_expiration: record.security.id_expiration,
            digital_signature_present: record.security.digital_signature.is_some(),
            us_citizen: record.security.us_citizen,
            created_at: record.created_at,
            updated_at: record.updated_at,
            submitted_at: record.submitted_at,
        }
    }
}
