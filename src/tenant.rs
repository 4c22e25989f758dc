//! Tenant identity.
//!
//! Every ledger operation takes an explicit `TenantId`. The notion of a "current user" that is
//! substituted when a caller omits the id belongs to the session boundary (`CurrentUser`), not to
//! the ledger itself.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;

const MAX_TENANT_ID_LEN: usize = 128;

/// An opaque user identifier that owns one isolated ledger.
///
/// The id is used as a directory name, so it is restricted to ASCII letters, digits, `-`, `_`,
/// `.` and `@`, and may not be `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("user_id must not be blank"));
        }
        if trimmed.len() > MAX_TENANT_ID_LEN {
            return Err(Error::validation(format!(
                "user_id must be at most {MAX_TENANT_ID_LEN} characters"
            )));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(Error::validation(format!("user_id '{trimmed}' is reserved")));
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@')))
        {
            return Err(Error::validation(format!(
                "user_id '{trimmed}' contains the invalid character {c:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// The process-wide "current user" that is used when a request does not name a tenant.
///
/// Clones share the same pointer. Access is synchronized, so a read never observes a partial
/// write, but concurrent sessions from different users that share one process still overwrite
/// each other's default. Callers that need isolation must pass an explicit user id.
#[derive(Debug, Clone)]
pub struct CurrentUser(Arc<RwLock<TenantId>>);

impl CurrentUser {
    pub fn new(initial: TenantId) -> Self {
        Self(Arc::new(RwLock::new(initial)))
    }

    pub async fn get(&self) -> TenantId {
        self.0.read().await.clone()
    }

    /// Replaces the current user and returns the previous one.
    pub async fn set(&self, tenant: TenantId) -> TenantId {
        let mut guard = self.0.write().await;
        std::mem::replace(&mut *guard, tenant)
    }

    /// Resolves the tenant for a request: the explicit `user_id` if one is given (and not blank),
    /// otherwise the current user.
    pub async fn resolve(&self, user_id: Option<&str>) -> Result<TenantId> {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => TenantId::new(id),
            _ => Ok(self.get().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;

    #[test]
    fn test_tenant_id_valid() {
        for id in ["default_user", "alice@example.com", "user-42", "A.B"] {
            assert_eq!(TenantId::new(id).unwrap().as_str(), id);
        }
        assert_eq!(TenantId::new("  bob ").unwrap().as_str(), "bob");
    }

    #[test]
    fn test_tenant_id_invalid() {
        for id in ["", "  ", ".", "..", "../etc", "a/b", "a\\b", "white space", "émile"] {
            let err = TenantId::new(id).unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Validation, "{id}");
        }
        assert!(TenantId::new("x".repeat(MAX_TENANT_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_tenant_id_serde() {
        let id: TenantId = serde_json::from_str("\"carol\"").unwrap();
        assert_eq!(id.as_str(), "carol");
        assert!(serde_json::from_str::<TenantId>("\"../x\"").is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"carol\"");
    }

    #[tokio::test]
    async fn test_current_user_resolution() {
        let current = CurrentUser::new(TenantId::new("default_user").unwrap());
        assert_eq!(current.resolve(None).await.unwrap().as_str(), "default_user");
        assert_eq!(current.resolve(Some(" ")).await.unwrap().as_str(), "default_user");
        assert_eq!(current.resolve(Some("alice")).await.unwrap().as_str(), "alice");
        assert!(current.resolve(Some("a/b")).await.is_err());

        let previous = current.set(TenantId::new("bob").unwrap()).await;
        assert_eq!(previous.as_str(), "default_user");
        assert_eq!(current.resolve(None).await.unwrap().as_str(), "bob");
    }

    #[tokio::test]
    async fn test_current_user_is_shared_between_clones() {
        let a = CurrentUser::new(TenantId::new("default_user").unwrap());
        let b = a.clone();
        b.set(TenantId::new("mallory").unwrap()).await;
        assert_eq!(a.get().await.as_str(), "mallory");
    }
}
