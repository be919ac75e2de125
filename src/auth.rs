//! Local identity: sign-up and credential checks.
//!
//! Passwords are only ever stored as Argon2id PHC strings.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

use crate::db::Database;
use crate::error::{HubError, HubResult};
use crate::models::{Account, Role};
use crate::validation::{NewAccount, SignUpInput};

pub fn hash_password(password: &str) -> HubResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HubError::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn sign_up(db: &Database, input: &SignUpInput) -> HubResult<Account> {
    let account = input.validate()?;
    let hash = hash_password(&account.password)?;
    db.create_account(&account, &hash)
}

/// Bootstrap an admin account. Sign-up never creates admins.
pub fn create_admin(db: &Database, email: &str, password: &str) -> HubResult<Account> {
    // Validate email and password through the student schema, then swap the role.
    let checked = SignUpInput {
        email: email.to_string(),
        password: password.to_string(),
        role: Role::Student,
        display_name: "admin".to_string(),
    }
    .validate()?;
    let account = NewAccount {
        role: Role::Admin,
        ..checked
    };
    let hash = hash_password(&account.password)?;
    db.create_account(&account, &hash)
}

/// Resolve credentials to an account. Unknown email and wrong password
/// produce the same error.
pub fn sign_in(db: &Database, email: &str, password: &str) -> HubResult<Account> {
    let email = email.trim().to_lowercase();
    match db.get_credentials(&email)? {
        Some((account, hash)) if verify_password(password, &hash) => {
            tracing::info!(user_id = %account.user_id, "signed in");
            Ok(account)
        }
        _ => {
            tracing::debug!("sign-in rejected");
            Err(HubError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not a phc string"));
    }

    #[test]
    fn test_sign_up_then_sign_in() {
        let db = Database::open_in_memory().unwrap();
        let input = SignUpInput {
            email: "Ada@Example.com".to_string(),
            password: "analytical".to_string(),
            role: Role::Student,
            display_name: "Ada".to_string(),
        };
        let account = sign_up(&db, &input).unwrap();

        let signed_in = sign_in(&db, "ada@example.com", "analytical").unwrap();
        assert_eq!(signed_in.user_id, account.user_id);

        assert!(matches!(
            sign_in(&db, "ada@example.com", "engine"),
            Err(HubError::InvalidCredentials)
        ));
        assert!(matches!(
            sign_in(&db, "nobody@example.com", "analytical"),
            Err(HubError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_create_admin() {
        let db = Database::open_in_memory().unwrap();
        let admin = create_admin(&db, "root@example.com", "changeme").unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(db.get_student_profile(&admin.user_id).unwrap().is_none());
        assert!(create_admin(&db, "root2@example.com", "short").is_err());
    }
}
