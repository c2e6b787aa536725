use validator::ValidateEmail;

use crate::domain::entities::waitlist_entry::WaitlistRole;

const MAX_NAME_LEN: usize = 120;
const MAX_INSTITUTION_LEN: usize = 200;

/// Validates that the input looks like a valid email address
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Optional free-text profile fields: blank collapses to `None`, overlong is rejected.
pub fn normalize_optional_text(value: Option<&str>, max_len: usize) -> Result<Option<String>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max_len => Err(format!("must be at most {max_len} characters")),
        Some(v) => Ok(Some(v.to_string())),
    }
}

pub fn normalize_name(value: Option<&str>) -> Result<Option<String>, String> {
    normalize_optional_text(value, MAX_NAME_LEN).map_err(|e| format!("name {e}"))
}

pub fn normalize_institution(value: Option<&str>) -> Result<Option<String>, String> {
    normalize_optional_text(value, MAX_INSTITUTION_LEN).map_err(|e| format!("institution {e}"))
}

/// Parses the signup form's role. Blank means "not given".
pub fn parse_role(value: Option<&str>) -> Result<Option<WaitlistRole>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => WaitlistRole::parse(raw)
            .map(Some)
            .ok_or_else(|| format!("unknown role '{raw}'")),
    }
}
