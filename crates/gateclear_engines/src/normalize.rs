#![forbid(unsafe_code)]

/// A phone number normalized to exactly ten US digits (country code already
/// stripped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneDigits(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneError {
    Empty,
    WrongDigitCount,
}

/// Punctuation accepted in raw phone input. Anything else is a hard reject
/// rather than being silently dropped.
fn is_phone_punctuation(c: char) -> bool {
    matches!(c, ' ' | '-' | '.' | '(' | ')' | '+')
}

/// Accepts ten local digits, or eleven digits with a leading country-code
/// `1` which is dropped. Any other digit count is an error, never a partial
/// fill.
pub fn normalize_phone(raw: &str) -> Result<PhoneDigits, PhoneError> {
    if raw.trim().is_empty() {
        return Err(PhoneError::Empty);
    }
    if raw
        .chars()
        .any(|c| !c.is_ascii_digit() && !is_phone_punctuation(c))
    {
        return Err(PhoneError::WrongDigitCount);
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        10 => Ok(PhoneDigits(digits)),
        11 if digits.starts_with('1') => Ok(PhoneDigits(digits[1..].to_string())),
        _ => Err(PhoneError::WrongDigitCount),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneParts {
    pub area: String,
    pub prefix: String,
    pub line: String,
}

impl PhoneDigits {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 3/3/4 split for the fixed form layout.
    pub fn split(&self) -> PhoneParts {
        PhoneParts {
            area: self.0[0..3].to_string(),
            prefix: self.0[3..6].to_string(),
            line: self.0[6..10].to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsnParts {
    pub part1: String,
    pub part2: String,
    pub part3: String,
}

/// 3/2/4 split, present only when exactly nine digits are supplied. Any
/// other count yields `None`; SSN collection is out-of-band, so absence is
/// never an error.
pub fn split_ssn(raw: &str) -> Option<SsnParts> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 9 {
        return None;
    }
    Some(SsnParts {
        part1: digits[0..3].to_string(),
        part2: digits[3..5].to_string(),
        part3: digits[5..9].to_string(),
    })
}

/// Minimal shape check; deliverability is not our concern.
pub fn email_shape_ok(raw: &str) -> bool {
    if raw.len() > 254 || raw.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = raw.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }
    true
}
