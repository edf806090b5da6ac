use once_cell::sync::Lazy;
use regex::Regex;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9@.+_-]{1,150}$").expect("valid username regex"));

/// Email validation
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    if email.len() > 255 {
        return Err("Email cannot be longer than 255 characters".to_string());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format".to_string());
    };

    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Usernames: letters, digits and `@.+-_`, at most 150 characters
pub fn validate_username(username: &str) -> Result<(), String> {
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err("Username may only contain letters, digits and @/./+/-/_ (max 150)".to_string())
    }
}

/// Derive a username from the local part of an email address,
/// dropping characters that are not allowed in usernames.
pub fn username_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-' | '_'))
        .take(140)
        .collect();

    if cleaned.is_empty() {
        "user".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("test@").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("test@example.").is_err());
    }

    #[test]
    fn test_username_validation() {
        assert!(validate_username("jane.doe+fit").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(151)).is_err());
    }

    #[test]
    fn test_username_from_email() {
        assert_eq!(username_from_email("jane.doe@example.com"), "jane.doe");
        assert_eq!(username_from_email("j!a#n$e@example.com"), "jane");
        assert_eq!(username_from_email("!!!@example.com"), "user");
    }
}
