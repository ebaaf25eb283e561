//! Field rules for the sign-in form.
//!
//! Each field carries an ordered list of rules; the first rule whose
//! predicate fails supplies the message shown next to the field.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

pub const EMAIL_REQUIRED: &str = "Please input your email!";
pub const EMAIL_INVALID: &str = "Invalid email format!";
pub const PASSWORD_REQUIRED: &str = "Please input your password!";
pub const PASSWORD_TOO_SHORT: &str = "Password minimum 6 characters!";

pub const PASSWORD_MIN_CHARS: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .expect("email pattern compiles")
});

#[derive(Clone, Copy)]
pub struct Rule {
    check: fn(&str) -> bool,
    message: &'static str,
}

impl Rule {
    pub const fn new(check: fn(&str) -> bool, message: &'static str) -> Self {
        Self { check, message }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }
}

pub const EMAIL_RULES: &[Rule] = &[
    Rule::new(is_present, EMAIL_REQUIRED),
    Rule::new(is_email, EMAIL_INVALID),
];

pub const PASSWORD_RULES: &[Rule] = &[
    Rule::new(is_present, PASSWORD_REQUIRED),
    Rule::new(has_min_password_chars, PASSWORD_TOO_SHORT),
];

fn is_present(value: &str) -> bool {
    !value.is_empty()
}

fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

fn has_min_password_chars(value: &str) -> bool {
    value.chars().count() >= PASSWORD_MIN_CHARS
}

/// Runs `rules` in order and returns the message of the first one that fails.
pub fn first_violation(value: &str, rules: &[Rule]) -> Option<&'static str> {
    rules
        .iter()
        .find(|rule| !(rule.check)(value))
        .map(Rule::message)
}

/// Raw form body of `POST /login`.
#[derive(Deserialize, Default)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl CredentialsForm {
    pub fn validate(self) -> Result<Credentials, FieldErrors> {
        let email = self.email.trim().to_string();
        let errors = FieldErrors {
            email: first_violation(&email, EMAIL_RULES),
            password: first_violation(&self.password, PASSWORD_RULES),
        };

        if errors.is_empty() {
            Ok(Credentials {
                email,
                password: self.password,
            })
        } else {
            Err(errors)
        }
    }
}

/// Per-field messages from a rejected submission.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.password.is_none()
    }
}

/// Validated email/password pair, handed to the adapter and then dropped.
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
