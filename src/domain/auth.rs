//! Caller Identity and Authorization
//!
//! The engine has exactly one administrative identity. Instead of ambient
//! global state, authorization is an explicit policy object injected into
//! the engine at construction time; every admin operation passes the caller
//! identity through it.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("caller '{0}' is not the authorized administrator")]
    NotAuthorized(AccountId),
}

/// Opaque account identity (wallet address, service principal, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The null identity is never a valid recipient or caller.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Single-admin authorization policy.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    admin: AccountId,
}

impl AuthPolicy {
    pub fn new(admin: AccountId) -> Self {
        Self { admin }
    }

    pub fn admin(&self) -> &AccountId {
        &self.admin
    }

    /// Fails unless `caller` is the configured administrator.
    pub fn ensure_admin(&self, caller: &AccountId) -> Result<(), AuthError> {
        if caller == &self.admin {
            Ok(())
        } else {
            Err(AuthError::NotAuthorized(caller.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_accepted() {
        let policy = AuthPolicy::new(AccountId::from("admin"));
        assert!(policy.ensure_admin(&AccountId::from("admin")).is_ok());
    }

    #[test]
    fn test_other_caller_rejected() {
        let policy = AuthPolicy::new(AccountId::from("admin"));
        let err = policy.ensure_admin(&AccountId::from("mallory")).unwrap_err();
        assert_eq!(err, AuthError::NotAuthorized(AccountId::from("mallory")));
    }

    #[test]
    fn test_empty_identity() {
        assert!(AccountId::from("").is_empty());
        assert!(!AccountId::from("x").is_empty());
    }
}
