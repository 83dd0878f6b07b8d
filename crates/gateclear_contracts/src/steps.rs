#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::application::{
    ApplicationRecord, Gender, GovernmentIdType, PersonalInfo, SignatureDataUri,
};
use crate::date::CalendarDate;
use crate::{ContractViolation, Validate};

/// The five sequential wizard phases. Each step owns a strict field subset;
/// a patch can never reach across to another step's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Personal,
    Contact,
    Experience,
    Rules,
    Security,
}

impl StepName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Contact => "contact",
            Self::Experience => "experience",
            Self::Rules => "rules",
            Self::Security => "security",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "personal" => Some(Self::Personal),
            "contact" => Some(Self::Contact),
            "experience" => Some(Self::Experience),
            "rules" => Some(Self::Rules),
            "security" => Some(Self::Security),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub other_names: Option<String>,
    pub date_of_birth: Option<CalendarDate>,
    pub gender: Option<Gender>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactPatch {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_or_organization: Option<String>,
    pub purpose_of_visit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperiencePatch {
    pub engaged_directly: Option<String>,
    pub perceptions: Option<String>,
    pub expectations: Option<String>,
    pub justice_reform_before: Option<String>,
    pub interests_most: Option<String>,
    pub reform_future: Option<String>,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RulesPatch {
    pub escort_required: Option<bool>,
    pub contraband_declared: Option<bool>,
    pub dress_code_acknowledged: Option<bool>,
    pub contact_with_residents: Option<bool>,
    pub recording_devices: Option<bool>,
    pub acknowledged: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityPatch {
    pub government_id_type: Option<GovernmentIdType>,
    pub government_id_number: Option<String>,
    pub id_state: Option<String>,
    pub id_expiration: Option<CalendarDate>,
    pub digital_signature: Option<SignatureDataUri>,
    pub us_citizen: Option<bool>,
}

/// A validated, typed partial update scoped to exactly one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPatch {
    Personal(PersonalPatch),
    Contact(ContactPatch),
    Experience(ExperiencePatch),
    Rules(RulesPatch),
    Security(SecurityPatch),
}

impl StepPatch {
    pub fn step_name(&self) -> StepName {
        match self {
            Self::Personal(_) => StepName::Personal,
            Self::Contact(_) => StepName::Contact,
            Self::Experience(_) => StepName::Experience,
            Self::Rules(_) => StepName::Rules,
            Self::Security(_) => StepName::Security,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Personal(p) => {
                p.first_name.is_none()
                    && p.last_name.is_none()
                    && p.other_names.is_none()
                    && p.date_of_birth.is_none()
                    && p.gender.is_none()
            }
            Self::Contact(p) => {
                p.email.is_none()
                    && p.phone_number.is_none()
                    && p.company_or_organization.is_none()
                    && p.purpose_of_visit.is_none()
            }
            Self::Experience(p) => {
                p.engaged_directly.is_none()
                    && p.perceptions.is_none()
                    && p.expectations.is_none()
                    && p.justice_reform_before.is_none()
                    && p.interests_most.is_none()
                    && p.reform_future.is_none()
                    && p.additional_notes.is_none()
            }
            Self::Rules(p) => {
                p.escort_required.is_none()
                    && p.contraband_declared.is_none()
                    && p.dress_code_acknowledged.is_none()
                    && p.contact_with_residents.is_none()
                    && p.recording_devices.is_none()
                    && p.acknowledged.is_none()
            }
            Self::Security(p) => {
                p.government_id_type.is_none()
                    && p.government_id_number.is_none()
                    && p.id_state.is_none()
                    && p.id_expiration.is_none()
                    && p.digital_signature.is_none()
                    && p.us_citizen.is_none()
            }
        }
    }
}

impl Validate for StepPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "step_patch",
                reason: "must set at least one field",
            });
        }
        if let Self::Security(p) = self {
            if let Some(s) = &p.digital_signature {
                s.validate()?;
            }
        }
        Ok(())
    }
}

fn take(target: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *target = v.clone();
    }
}

fn take_opt(target: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        *target = value.clone();
    }
}

fn take_bool_opt(target: &mut Option<bool>, value: Option<bool>) {
    if value.is_some() {
        *target = value;
    }
}

impl ApplicationRecord {
    /// Merges a step patch into the record. Present fields overwrite,
    /// absent fields are left untouched; fields of other steps are
    /// unreachable by construction.
    pub fn apply_step_patch(&mut self, patch: &StepPatch) {
        match patch {
            StepPatch::Personal(p) => {
                take(&mut self.personal.first_name, &p.first_name);
                take(&mut self.personal.last_name, &p.last_name);
                take_opt(&mut self.personal.other_names, &p.other_names);
                if let Some(d) = p.date_of_birth {
                    self.personal.date_of_birth = d;
                }
                if let Some(g) = p.gender {
                    self.personal.gender = g;
                }
            }
            StepPatch::Contact(p) => {
                take(&mut self.contact.email, &p.email);
                take(&mut self.contact.phone_number, &p.phone_number);
                take(
                    &mut self.contact.company_or_organization,
                    &p.company_or_organization,
                );
                take_opt(&mut self.contact.purpose_of_visit, &p.purpose_of_visit);
            }
            StepPatch::Experience(p) => {
                take_opt(&mut self.experience.engaged_directly, &p.engaged_directly);
                take_opt(&mut self.experience.perceptions, &p.perceptions);
                take_opt(&mut self.experience.expectations, &p.expectations);
                take_opt(
                    &mut self.experience.justice_reform_before,
                    &p.justice_reform_before,
                );
                take_opt(&mut self.experience.interests_most, &p.interests_most);
                take_opt(&mut self.experience.reform_future, &p.reform_future);
                take_opt(&mut self.experience.additional_notes, &p.additional_notes);
            }
            StepPatch::Rules(p) => {
                take_bool_opt(&mut self.rules_quiz.escort_required, p.escort_required);
                take_bool_opt(
                    &mut self.rules_quiz.contraband_declared,
                    p.contraband_declared,
                );
                take_bool_opt(
                    &mut self.rules_quiz.dress_code_acknowledged,
                    p.dress_code_acknowledged,
                );
                take_bool_opt(
                    &mut self.rules_quiz.contact_with_residents,
                    p.contact_with_residents,
                );
                take_bool_opt(&mut self.rules_quiz.recording_devices, p.recording_devices);
                if let Some(a) = p.acknowledged {
                    self.rules_quiz.acknowledged = a;
                }
            }
            StepPatch::Security(p) => {
                if let Some(t) = p.government_id_type {
                    self.security.government_id_type = t;
                }
                take(
                    &mut self.security.government_id_number,
                    &p.government_id_number,
                );
                take_opt(&mut self.security.id_state, &p.id_state);
                if let Some(d) = p.id_expiration {
                    self.security.id_expiration = Some(d);
                }
                if let Some(s) = &p.digital_signature {
                    self.security.digital_signature = Some(s.clone());
                }
                if let Some(c) = p.us_citizen {
                    self.security.us_citizen = c;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ApplicationId, OwnerId};
    use crate::MonotonicTimeNs;

    fn draft() -> ApplicationRecord {
        ApplicationRecord::new_draft(
            ApplicationId::new("app-s").unwrap(),
            OwnerId::new("user-s").unwrap(),
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
        .unwrap()
    }

    #[test]
    fn at_step_01_patches_touch_only_their_own_step() {
        let mut r = draft();
        let contact = StepPatch::Contact(ContactPatch {
            email: Some("jane@x.com".to_string()),
            ..ContactPatch::default()
        });
        let security = StepPatch::Security(SecurityPatch {
            government_id_number: Some("D1234567".to_string()),
            ..SecurityPatch::default()
        });

        // Either interleaving order leaves both field sets intact.
        r.apply_step_patch(&contact);
        r.apply_step_patch(&security);
        assert_eq!(r.contact.email, "jane@x.com");
        assert_eq!(r.security.government_id_number, "D1234567");
        assert_eq!(r.personal.first_name, "Jane");

        let mut r2 = draft();
        r2.apply_step_patch(&security);
        r2.apply_step_patch(&contact);
        assert_eq!(r2.contact.email, r.contact.email);
        assert_eq!(
            r2.security.government_id_number,
            r.security.government_id_number
        );
    }

    #[test]
    fn at_step_02_same_step_patches_are_last_write_wins() {
        let mut r = draft();
        r.apply_step_patch(&StepPatch::Contact(ContactPatch {
            email: Some("first@x.com".to_string()),
            ..ContactPatch::default()
        }));
        r.apply_step_patch(&StepPatch::Contact(ContactPatch {
            email: Some("second@x.com".to_string()),
            ..ContactPatch::default()
        }));
        assert_eq!(r.contact.email, "second@x.com");
    }

    #[test]
    fn at_step_03_empty_patch_is_a_contract_violation() {
        let patch = StepPatch::Rules(RulesPatch::default());
        assert!(patch.validate().is_err());
    }
}
