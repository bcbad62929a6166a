//! # Client Scopes
//!
//! Principals and the per-collection scopes granted to clients.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{AuthError, AuthResult};

/// Operation class checked against a client's grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeType {
    Create,
    Update,
    Delete,
    Get,
    Query,
}

impl ScopeType {
    pub const READ: [ScopeType; 2] = [ScopeType::Get, ScopeType::Query];

    pub const READ_WRITE: [ScopeType; 5] = [
        ScopeType::Create,
        ScopeType::Update,
        ScopeType::Delete,
        ScopeType::Get,
        ScopeType::Query,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Create => "CREATE",
            ScopeType::Update => "UPDATE",
            ScopeType::Delete => "DELETE",
            ScopeType::Get => "GET",
            ScopeType::Query => "QUERY",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller identity attached to every request
///
/// Wire form: `"admin"` or `{"client": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Principal {
    Admin,
    Client(String),
}

impl Principal {
    pub fn client(id: impl Into<String>) -> Self {
        Principal::Client(id.into())
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::Admin)
    }

    /// Name used in logs
    pub fn label(&self) -> &str {
        match self {
            Principal::Admin => "admin",
            Principal::Client(id) => id,
        }
    }
}

/// Scopes granted on one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientScope {
    pub collection: String,
    pub scopes: BTreeSet<ScopeType>,
}

impl ClientScope {
    pub fn new(collection: impl Into<String>, scopes: impl IntoIterator<Item = ScopeType>) -> Self {
        Self {
            collection: collection.into(),
            scopes: scopes.into_iter().collect(),
        }
    }
}

/// A client and everything it may do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientAuthorization {
    pub client_id: String,
    #[serde(default)]
    pub client_scopes: Vec<ClientScope>,
}

impl ClientAuthorization {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_scopes: Vec::new(),
        }
    }

    /// GET and QUERY on the collection
    pub fn read(client_id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::new(client_id).grant(collection, ScopeType::READ)
    }

    /// Every scope on the collection
    pub fn read_write(client_id: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::new(client_id).grant(collection, ScopeType::READ_WRITE)
    }

    /// Adds scopes on a collection, merging with any existing grant
    pub fn grant(
        mut self,
        collection: impl Into<String>,
        scopes: impl IntoIterator<Item = ScopeType>,
    ) -> Self {
        let collection = collection.into();
        match self.client_scopes.iter_mut().find(|s| s.collection == collection) {
            Some(existing) => existing.scopes.extend(scopes),
            None => self.client_scopes.push(ClientScope::new(collection, scopes)),
        }
        self
    }

    pub fn allows(&self, collection: &str, scope: ScopeType) -> bool {
        self.client_scopes
            .iter()
            .any(|s| s.collection == collection && s.scopes.contains(&scope))
    }

    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::InvalidAuthorization(
                "clientId must not be empty".to_string(),
            ));
        }
        if let Some(scope) = self.client_scopes.iter().find(|s| s.collection.is_empty()) {
            return Err(AuthError::InvalidAuthorization(format!(
                "scope {:?} names no collection",
                scope.scopes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_principal_wire_form() {
        let admin: Principal = serde_json::from_value(json!("admin")).unwrap();
        assert!(admin.is_admin());
        let client: Principal = serde_json::from_value(json!({"client": "c1"})).unwrap();
        assert_eq!(client, Principal::client("c1"));
        assert_eq!(client.label(), "c1");
    }

    #[test]
    fn test_read_grant() {
        let auth = ClientAuthorization::read("c1", "book");
        assert!(auth.allows("book", ScopeType::Get));
        assert!(auth.allows("book", ScopeType::Query));
        assert!(!auth.allows("book", ScopeType::Create));
        assert!(!auth.allows("category", ScopeType::Get));
    }

    #[test]
    fn test_grant_merges() {
        let auth = ClientAuthorization::read("c1", "book").grant("book", [ScopeType::Update]);
        assert_eq!(auth.client_scopes.len(), 1);
        assert!(auth.allows("book", ScopeType::Update));
    }

    #[test]
    fn test_wire_shape() {
        let auth: ClientAuthorization = serde_json::from_value(json!({
            "clientId": "c1",
            "clientScopes": [{"collection": "book", "scopes": ["GET", "QUERY"]}]
        }))
        .unwrap();
        assert_eq!(auth, ClientAuthorization::read("c1", "book"));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        assert!(ClientAuthorization::new(" ").validate().is_err());
    }
}
