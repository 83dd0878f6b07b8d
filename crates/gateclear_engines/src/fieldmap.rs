#![forbid(unsafe_code)]

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use gateclear_contracts::application::{
    ApplicationRecord, GovernmentIdType, SignatureDataUri,
};

use crate::normalize::{normalize_phone, split_ssn, PhoneParts, SsnParts};

/// A value destined for one named field of the fixed government form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillValue {
    Text(String),
    Checkbox(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFill {
    pub template_field: &'static str,
    pub value: FillValue,
}

/// A mapping that could not be applied. Non-fatal by design: the template
/// still renders usefully without the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedField {
    pub field: &'static str,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedForm {
    pub fills: Vec<FieldFill>,
    pub skipped: Vec<SkippedField>,
}

/// Where a template field's value comes from in the application record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    FirstName,
    LastName,
    OtherNames,
    DateOfBirth,
    Gender,
    Email,
    PhoneArea,
    PhonePrefix,
    PhoneLine,
    Organization,
    PurposeOfVisit,
    SsnPart1,
    SsnPart2,
    SsnPart3,
    IdTypeDriverLicense,
    IdTypePassport,
    IdNumber,
    IdState,
    IdExpiration,
    UsCitizen,
    FormerInmate,
    OnProbationParole,
    VisitedInmate,
    RestrictedAccess,
    FelonyConviction,
    PendingCharges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillKind {
    Text,
    Checkbox,
}

impl FieldSource {
    pub fn fill_kind(self) -> FillKind {
        match self {
            Self::IdTypeDriverLicense
            | Self::IdTypePassport
            | Self::UsCitizen
            | Self::FormerInmate
            | Self::OnProbationParole
            | Self::VisitedInmate
            | Self::RestrictedAccess
            | Self::FelonyConviction
            | Self::PendingCharges => FillKind::Checkbox,
            _ => FillKind::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub template_field: &'static str,
    pub source: FieldSource,
}

/// The single mapping table between record semantics and the fixed
/// template's field names. Template names are an external contract and may
/// drift; a miss degrades to a diagnostic, never an abort.
pub const FIELD_MAP: &[FieldMapping] = &[
    FieldMapping { template_field: "FIRST_NAME", source: FieldSource::FirstName },
    FieldMapping { template_field: "LAST_NAME", source: FieldSource::LastName },
    FieldMapping { template_field: "OTHER_NAMES", source: FieldSource::OtherNames },
    FieldMapping { template_field: "DATE_OF_BIRTH", source: FieldSource::DateOfBirth },
    FieldMapping { template_field: "GENDER", source: FieldSource::Gender },
    FieldMapping { template_field: "EMAIL", source: FieldSource::Email },
    FieldMapping { template_field: "PHONE_AREA", source: FieldSource::PhoneArea },
    FieldMapping { template_field: "PHONE_PREFIX", source: FieldSource::PhonePrefix },
    FieldMapping { template_field: "PHONE_LINE", source: FieldSource::PhoneLine },
    FieldMapping { template_field: "ORGANIZATION", source: FieldSource::Organization },
    FieldMapping { template_field: "PURPOSE_OF_VISIT", source: FieldSource::PurposeOfVisit },
    FieldMapping { template_field: "SSN_PART_1", source: FieldSource::SsnPart1 },
    FieldMapping { template_field: "SSN_PART_2", source: FieldSource::SsnPart2 },
    FieldMapping { template_field: "SSN_PART_3", source: FieldSource::SsnPart3 },
    FieldMapping { template_field: "ID_TYPE_DRIVER_LICENSE", source: FieldSource::IdTypeDriverLicense },
    FieldMapping { template_field: "ID_TYPE_PASSPORT", source: FieldSource::IdTypePassport },
    FieldMapping { template_field: "ID_NUMBER", source: FieldSource::IdNumber },
    FieldMapping { template_field: "ID_STATE", source: FieldSource::IdState },
    FieldMapping { template_field: "ID_EXPIRATION", source: FieldSource::IdExpiration },
    FieldMapping { template_field: "US_CITIZEN", source: FieldSource::UsCitizen },
    FieldMapping { template_field: "FORMER_INMATE", source: FieldSource::FormerInmate },
    FieldMapping { template_field: "ON_PROBATION_PAROLE", source: FieldSource::OnProbationParole },
    FieldMapping { template_field: "VISITED_INMATE", source: FieldSource::VisitedInmate },
    FieldMapping { template_field: "RESTRICTED_ACCESS", source: FieldSource::RestrictedAccess },
    FieldMapping { template_field: "FELONY_CONVICTION", source: FieldSource::FelonyConviction },
    FieldMapping { template_field: "PENDING_CHARGES", source: FieldSource::PendingCharges },
];

const REASON_BAD_PHONE: &str = "phone number does not contain 10 or 11 digits";

enum Resolved {
    Fill(FillValue),
    Skip(&'static str),
    Absent,
}

/// Transforms a record into positional fills for the template. The caller
/// guarantees placeholders are gone for final submissions; draft-rendering
/// paths may still pass partial records and get a smaller fill set. The
/// optional SSN is supplied out-of-band and never read from the record.
pub fn map_record(record: &ApplicationRecord, ssn: Option<&str>) -> MappedForm {
    let phone: Option<PhoneParts> = normalize_phone(&record.contact.phone_number)
        .ok()
        .map(|d| d.split());
    let ssn_parts: Option<SsnParts> = ssn.and_then(split_ssn);

    let mut fills = Vec::new();
    let mut skipped = Vec::new();

    for mapping in FIELD_MAP {
        match resolve(mapping.source, record, &phone, &ssn_parts) {
            Resolved::Fill(value) => fills.push(FieldFill {
                template_field: mapping.template_field,
                value,
            }),
            Resolved::Skip(reason) => skipped.push(SkippedField {
                field: mapping.template_field,
                reason,
            }),
            Resolved::Absent => {}
        }
    }

    MappedForm { fills, skipped }
}

fn text(value: &str) -> Resolved {
    Resolved::Fill(FillValue::Text(value.to_string()))
}

fn opt_text(value: &Option<String>) -> Resolved {
    match value {
        Some(v) => text(v),
        None => Resolved::Absent,
    }
}

fn checkbox(value: bool) -> Resolved {
    Resolved::Fill(FillValue::Checkbox(value))
}

fn resolve(
    source: FieldSource,
    record: &ApplicationRecord,
    phone: &Option<PhoneParts>,
    ssn: &Option<SsnParts>,
) -> Resolved {
    match source {
        FieldSource::FirstName => text(&record.personal.first_name),
        FieldSource::LastName => text(&record.personal.last_name),
        FieldSource::OtherNames => opt_text(&record.personal.other_names),
        FieldSource::DateOfBirth => text(&record.personal.date_of_birth.to_display()),
        FieldSource::Gender => text(record.personal.gender.label()),
        FieldSource::Email => text(&record.contact.email),
        FieldSource::PhoneArea => match phone {
            Some(p) => text(&p.area),
            None => Resolved::Skip(REASON_BAD_PHONE),
        },
        FieldSource::PhonePrefix => match phone {
            Some(p) => text(&p.prefix),
            None => Resolved::Skip(REASON_BAD_PHONE),
        },
        FieldSource::PhoneLine => match phone {
            Some(p) => text(&p.line),
            None => Resolved::Skip(REASON_BAD_PHONE),
        },
        FieldSource::Organization => text(&record.contact.company_or_organization),
        FieldSource::PurposeOfVisit => opt_text(&record.contact.purpose_of_visit),
        // SSN absence is policy-allowed, so it maps to nothing at all.
        FieldSource::SsnPart1 => match ssn {
            Some(p) => text(&p.part1),
            None => Resolved::Absent,
        },
        FieldSource::SsnPart2 => match ssn {
            Some(p) => text(&p.part2),
            None => Resolved::Absent,
        },
        FieldSource::SsnPart3 => match ssn {
            Some(p) => text(&p.part3),
            None => Resolved::Absent,
        },
        FieldSource::IdTypeDriverLicense => checkbox(
            record.security.government_id_type == GovernmentIdType::DriverLicense,
        ),
        FieldSource::IdTypePassport => {
            checkbox(record.security.government_id_type == GovernmentIdType::Passport)
        }
        FieldSource::IdNumber => text(&record.security.government_id_number),
        FieldSource::IdState => opt_text(&record.security.id_state),
        FieldSource::IdExpiration => match record.security.id_expiration {
            Some(d) => text(&d.to_display()),
            None => Resolved::Absent,
        },
        FieldSource::UsCitizen => checkbox(record.security.us_citizen),
        FieldSource::FormerInmate => checkbox(record.background.former_inmate),
        FieldSource::OnProbationParole => checkbox(record.background.on_probation_parole),
        FieldSource::VisitedInmate => checkbox(record.background.visited_inmate),
        FieldSource::RestrictedAccess => checkbox(record.background.restricted_access),
        FieldSource::FelonyConviction => checkbox(record.background.felony_conviction),
        FieldSource::PendingCharges => checkbox(record.background.pending_charges),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFormat {
    Png,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureImage {
    pub format: SignatureFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureDecodeError {
    InvalidBase64,
    UnrecognizedImage,
}

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// Strips the data-URI prefix, decodes the payload, and sniffs the real
/// image format from the magic bytes (the declared media type is not
/// trusted).
pub fn decode_signature(sig: &SignatureDataUri) -> Result<SignatureImage, SignatureDecodeError> {
    let bytes = BASE64
        .decode(sig.payload().as_bytes())
        .map_err(|_| SignatureDecodeError::InvalidBase64)?;
    if bytes.len() >= PNG_MAGIC.len() && bytes[..PNG_MAGIC.len()] == PNG_MAGIC {
        return Ok(SignatureImage {
            format: SignatureFormat::Png,
            bytes,
        });
    }
    if bytes.len() >= JPEG_MAGIC.len() && bytes[..JPEG_MAGIC.len()] == JPEG_MAGIC {
        return Ok(SignatureImage {
            format: SignatureFormat::Jpeg,
            bytes,
        });
    }
    Err(SignatureDecodeError::UnrecognizedImage)
}
