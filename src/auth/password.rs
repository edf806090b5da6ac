use bcrypt::{hash, verify, DEFAULT_COST};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("This password is too short. It must contain at least {0} characters.")]
    TooShort(usize),
    #[error("This password is too long. It must contain at most {0} characters.")]
    TooLong(usize),
    #[error("This password is entirely numeric.")]
    EntirelyNumeric,
    #[error("Failed to hash password")]
    HashingFailed,
    #[error("Failed to verify password")]
    VerificationFailed,
}

/// Password strength requirements
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_entirely_numeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            allow_entirely_numeric: false,
        }
    }
}

/// Validate password strength according to policy
pub fn validate_password_strength(password: &str, policy: &PasswordPolicy) -> Result<(), PasswordError> {
    let length = password.chars().count();
    if length < policy.min_length {
        return Err(PasswordError::TooShort(policy.min_length));
    }

    if length > policy.max_length {
        return Err(PasswordError::TooLong(policy.max_length));
    }

    if !policy.allow_entirely_numeric && password.chars().all(|c| c.is_ascii_digit()) {
        return Err(PasswordError::EntirelyNumeric);
    }

    Ok(())
}

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password_strength(password, &PasswordPolicy::default())?;

    hash(password, DEFAULT_COST).map_err(|_| PasswordError::HashingFailed)
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    verify(password, hash).map_err(|_| PasswordError::VerificationFailed)
}
