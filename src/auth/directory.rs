// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User directory: account lookup, password verification, role membership.
//!
//! The session protocol only depends on the [`UserDirectory`] trait.
//! [`InMemoryDirectory`] is the bundled implementation; it hashes passwords
//! with Argon2id and can be seeded from a JSON file at startup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use serde::Deserialize;
use unicode_normalization::UnicodeNormalization;

use super::roles::Role;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("user already exists: {0}")]
    AlreadyExists(String),

    #[error("failed to read users file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse users file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("directory lock poisoned")]
    Poisoned,
}

/// Account as seen by the session protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub email_confirmed: bool,
}

/// Account lookup and credential checks.
pub trait UserDirectory: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, DirectoryError>;

    fn find_by_username(&self, username: &str) -> Result<Option<DirectoryUser>, DirectoryError>;

    fn find_by_id(&self, user_id: &str) -> Result<Option<DirectoryUser>, DirectoryError>;

    fn check_password(&self, user: &DirectoryUser, password: &str) -> Result<bool, DirectoryError>;

    fn get_roles(&self, user: &DirectoryUser) -> Result<Vec<Role>, DirectoryError>;

    fn is_in_role(&self, user: &DirectoryUser, role: Role) -> Result<bool, DirectoryError> {
        Ok(self.get_roles(user)?.contains(&role))
    }
}

/// Normalize an email for lookup (NFKC, trimmed, lowercase).
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

/// Hash a password using Argon2id (PHC string format).
pub fn hash_password(password: &str) -> Result<String, DirectoryError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DirectoryError::Hash(e.to_string()))
}

/// Verify a password against a PHC hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, DirectoryError> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| DirectoryError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Account to be added to an [`InMemoryDirectory`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub id: Option<String>,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub email_confirmed: bool,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: DirectoryUser,
    password_hash: String,
    roles: Vec<Role>,
}

/// Process-local directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load accounts from a JSON array of [`NewUser`] objects.
    pub fn from_json_file(path: &Path) -> Result<Self, DirectoryError> {
        let raw = std::fs::read_to_string(path)?;
        let seeds: Vec<NewUser> = serde_json::from_str(&raw)?;
        let directory = Self::new();
        for seed in seeds {
            directory.add_user(seed)?;
        }
        Ok(directory)
    }

    /// Add an account. Returns the assigned user id.
    pub fn add_user(&self, new_user: NewUser) -> Result<String, DirectoryError> {
        let password_hash = hash_password(&new_user.password)?;
        let email = normalize_email(&new_user.email);
        let id = new_user
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let mut users = self.users.write().map_err(|_| DirectoryError::Poisoned)?;
        let clash = users
            .values()
            .any(|u| u.user.email == email || u.user.username == new_user.username);
        if clash || users.contains_key(&id) {
            return Err(DirectoryError::AlreadyExists(new_user.username));
        }

        users.insert(
            id.clone(),
            StoredUser {
                user: DirectoryUser {
                    id: id.clone(),
                    username: new_user.username,
                    email,
                    email_confirmed: new_user.email_confirmed,
                },
                password_hash,
                roles: new_user.roles,
            },
        );
        Ok(id)
    }

    /// Replace the roles of an account. Returns false if the id is unknown.
    pub fn set_roles(&self, user_id: &str, roles: Vec<Role>) -> Result<bool, DirectoryError> {
        let mut users = self.users.write().map_err(|_| DirectoryError::Poisoned)?;
        Ok(match users.get_mut(user_id) {
            Some(stored) => {
                stored.roles = roles;
                true
            }
            None => false,
        })
    }

    /// Remove an account. Returns false if the id is unknown.
    pub fn remove_user(&self, user_id: &str) -> Result<bool, DirectoryError> {
        let mut users = self.users.write().map_err(|_| DirectoryError::Poisoned)?;
        Ok(users.remove(user_id).is_some())
    }

    fn find<P>(&self, predicate: P) -> Result<Option<DirectoryUser>, DirectoryError>
    where
        P: Fn(&StoredUser) -> bool,
    {
        let users = self.users.read().map_err(|_| DirectoryError::Poisoned)?;
        Ok(users.values().find(|u| predicate(u)).map(|u| u.user.clone()))
    }

    fn stored(&self, user_id: &str) -> Result<Option<StoredUser>, DirectoryError> {
        let users = self.users.read().map_err(|_| DirectoryError::Poisoned)?;
        Ok(users.get(user_id).cloned())
    }
}

impl UserDirectory for InMemoryDirectory {
    fn find_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        let email = normalize_email(email);
        self.find(|u| u.user.email == email)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        self.find(|u| u.user.username == username)
    }

    fn find_by_id(&self, user_id: &str) -> Result<Option<DirectoryUser>, DirectoryError> {
        Ok(self.stored(user_id)?.map(|u| u.user))
    }

    fn check_password(&self, user: &DirectoryUser, password: &str) -> Result<bool, DirectoryError> {
        match self.stored(&user.id)? {
            Some(stored) => verify_password(password, &stored.password_hash),
            None => Ok(false),
        }
    }

    fn get_roles(&self, user: &DirectoryUser) -> Result<Vec<Role>, DirectoryError> {
        Ok(self.stored(&user.id)?.map(|u| u.roles).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (InMemoryDirectory, String) {
        let directory = InMemoryDirectory::new();
        let id = directory
            .add_user(NewUser {
                id: None,
                username: "ada".to_string(),
                email: "Ada@Example.com".to_string(),
                password: "correct-horse".to_string(),
                email_confirmed: true,
                roles: vec![Role::User],
            })
            .unwrap();
        (directory, id)
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-valid-hash").is_err());
    }

    #[test]
    fn email_lookup_is_normalized() {
        let (directory, id) = seeded();
        let user = directory.find_by_email("  ada@EXAMPLE.com ").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(directory.find_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn lookups_by_username_and_id() {
        let (directory, id) = seeded();
        assert_eq!(directory.find_by_username("ada").unwrap().unwrap().id, id);
        assert_eq!(directory.find_by_id(&id).unwrap().unwrap().username, "ada");
        assert!(directory.find_by_username("Ada").unwrap().is_none());
    }

    #[test]
    fn check_password_and_roles() {
        let (directory, id) = seeded();
        let user = directory.find_by_id(&id).unwrap().unwrap();
        assert!(directory.check_password(&user, "correct-horse").unwrap());
        assert!(!directory.check_password(&user, "bad").unwrap());

        assert!(directory.is_in_role(&user, Role::User).unwrap());
        assert!(!directory.is_in_role(&user, Role::Admin).unwrap());

        directory.set_roles(&id, vec![Role::Admin]).unwrap();
        assert!(directory.is_in_role(&user, Role::Admin).unwrap());
        assert!(!directory.is_in_role(&user, Role::User).unwrap());
    }

    #[test]
    fn duplicate_username_or_email_rejected() {
        let (directory, _) = seeded();
        let result = directory.add_user(NewUser {
            id: None,
            username: "someone".to_string(),
            email: "ada@example.com".to_string(),
            password: "x".to_string(),
            email_confirmed: false,
            roles: vec![],
        });
        assert!(matches!(result, Err(DirectoryError::AlreadyExists(_))));
    }

    #[test]
    fn seed_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(
            &path,
            r#"[{"username":"root","email":"root@example.com","password":"pw","email_confirmed":true,"roles":["Admin","User"]}]"#,
        )
        .unwrap();

        let directory = InMemoryDirectory::from_json_file(&path).unwrap();
        let root = directory.find_by_username("root").unwrap().unwrap();
        assert_eq!(directory.get_roles(&root).unwrap(), vec![Role::Admin, Role::User]);
    }
}
