use thiserror::Error;

use crate::models::ApplicationStatus;
use crate::validation::ValidationError;

pub type HubResult<T> = Result<T, HubError>;

/// Everything a user action can fail with.
#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("duplicate application for this internship")]
    DuplicateApplication,

    #[error("cannot move an application from {from} to {to}")]
    IllegalTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailTaken,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("upload rejected: {0}")]
    Upload(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("corrupt stored value: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for HubError {
    fn from(e: serde_json::Error) -> Self {
        HubError::Decode(e.to_string())
    }
}

impl HubError {
    /// The one line shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            HubError::Validation(e) => e.message.clone(),
            HubError::DuplicateApplication => {
                "You have already applied for this internship".to_string()
            }
            HubError::IllegalTransition { from, to } => {
                format!("An application that is {} cannot be set to {}", from, to)
            }
            HubError::NotFound(what) => format!("{} not found", capitalize(what)),
            HubError::Forbidden(reason) => reason.clone(),
            HubError::InvalidCredentials => "Invalid email or password".to_string(),
            HubError::EmailTaken => "This email is already registered".to_string(),
            HubError::Upload(reason) => reason.clone(),
            HubError::Store(_)
            | HubError::Decode(_)
            | HubError::Io(_)
            | HubError::PasswordHash(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// True when a SQLite error is a UNIQUE constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            HubError::DuplicateApplication.user_message(),
            "You have already applied for this internship"
        );
        assert_eq!(
            HubError::NotFound("internship #4".to_string()).user_message(),
            "Internship #4 not found"
        );
        let store = HubError::Store(rusqlite::Error::QueryReturnedNoRows);
        assert_eq!(store.user_message(), "Something went wrong. Please try again.");
    }
}
