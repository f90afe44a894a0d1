use crate::error::{Error, Result};

/// Longest address accepted, per RFC 5321 path limits.
const MAX_EMAIL_LEN: usize = 254;

/// Trims and lowercases an email. Used as the lookup key by every source.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates an email and returns its normalized form.
///
/// This is a shape check, not RFC 5322 parsing: one `@`, non-empty local
/// part, a dotted domain and no whitespace.
pub fn validate_email(email: &str) -> Result<String> {
    let normalized = normalize_email(email);
    let reject = |reason: &'static str| Error::InvalidEmail {
        email: email.to_string(),
        reason,
    };

    if normalized.is_empty() {
        return Err(reject("email is required"));
    }
    if normalized.len() > MAX_EMAIL_LEN {
        return Err(reject("too long"));
    }
    if normalized.chars().any(char::is_whitespace) {
        return Err(reject("contains whitespace"));
    }

    let (local, domain) = normalized
        .split_once('@')
        .ok_or_else(|| reject("missing '@'"))?;

    if domain.contains('@') {
        return Err(reject("more than one '@'"));
    }
    if local.is_empty() {
        return Err(reject("empty local part"));
    }
    if domain.is_empty() {
        return Err(reject("empty domain"));
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(reject("domain is not fully qualified"));
    }

    Ok(normalized)
}
