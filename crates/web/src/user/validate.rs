//! Field checks for account input.
//!
//! Each check reports the first rule a value breaks. [`ValidationErrors`]
//! collects the reports of several fields so a client sees all of them at
//! once.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid email regex"));
static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_\-.]{3,64}$").expect("valid username regex"));

const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;
const FORBIDDEN_PASSWORD_PARTS: [&str; 3] = ["password", "12345678", "qwerty"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every failed field check of one request, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    /// Records the outcome of one check.
    pub fn check(&mut self, result: Result<(), FieldError>) {
        if let Err(error) = result {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok` when nothing failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self { errors: vec![error] }
    }
}

pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if email.is_empty() {
        return Err(FieldError::new("email", "email is required"));
    }
    if !EMAIL.is_match(email) {
        return Err(FieldError::new("email", "invalid email format"));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(FieldError::new("email", "email is too long"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), FieldError> {
    if username.is_empty() {
        return Err(FieldError::new("username", "username is required"));
    }
    if !USERNAME.is_match(username) {
        return Err(FieldError::new(
            "username",
            "username must be 3-64 characters long and contain only letters, numbers and underscores",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Err(FieldError::new("password", "password is required"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(FieldError::new("password", format!("password must be at least {MIN_PASSWORD_LEN} characters long")));
    }

    let has = |predicate: fn(char) -> bool| password.chars().any(predicate);
    if !has(char::is_uppercase) {
        return Err(FieldError::new("password", "password must contain at least one uppercase letter"));
    }
    if !has(char::is_lowercase) {
        return Err(FieldError::new("password", "password must contain at least one lowercase letter"));
    }
    if !has(|c| c.is_ascii_digit()) {
        return Err(FieldError::new("password", "password must contain at least one digit"));
    }
    if !has(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control()) {
        return Err(FieldError::new("password", "password must contain at least one special character"));
    }

    let lowered = password.to_lowercase();
    if FORBIDDEN_PASSWORD_PARTS.iter().any(|part| lowered.contains(part)) {
        return Err(FieldError::new("password", "password is too common or contains forbidden patterns"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails() {
        assert_eq!(validate_email("alice@example.com"), Ok(()));
        assert_eq!(validate_email("").unwrap_err().message, "email is required");
        assert_eq!(validate_email("alice@localhost").unwrap_err().message, "invalid email format");

        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(validate_email(&long).unwrap_err().message, "email is too long");
    }

    #[test]
    fn usernames() {
        assert_eq!(validate_username("alice_01"), Ok(()));
        assert_eq!(validate_username("").unwrap_err().message, "username is required");
        assert_eq!(validate_username("bob"), Ok(()));
        assert!(validate_username("ab").is_err());
        assert!(validate_username("alice smith").is_err());
        assert!(validate_username(&"a".repeat(65)).is_err());
    }

    #[test]
    fn passwords() {
        let message = |password: &str| validate_password(password).unwrap_err().message;

        assert_eq!(validate_password("Secr3t!x"), Ok(()));
        assert_eq!(message(""), "password is required");
        assert_eq!(message("Sh0rt!"), "password must be at least 8 characters long");
        assert_eq!(message("secr3t!xx"), "password must contain at least one uppercase letter");
        assert_eq!(message("SECR3T!XX"), "password must contain at least one lowercase letter");
        assert_eq!(message("Secret!xx"), "password must contain at least one digit");
        assert_eq!(message("Secr3txxx"), "password must contain at least one special character");
        assert_eq!(message("MyPassword1!"), "password is too common or contains forbidden patterns");
        assert_eq!(message("Qwerty12!"), "password is too common or contains forbidden patterns");
    }

    #[test]
    fn aggregated() {
        let mut errors = ValidationErrors::new();
        errors.check(validate_email("nope"));
        errors.check(validate_username("alice"));
        errors.check(validate_password(""));

        assert_eq!(errors.errors().len(), 2);
        assert_eq!(errors.to_string(), "email: invalid email format; password: password is required");
        assert!(errors.into_result().is_err());
        assert_eq!(ValidationErrors::new().into_result(), Ok(()));
    }
}
