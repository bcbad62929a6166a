//! # Authorizer
//!
//! Decides whether a principal may perform an operation on a collection.
//! Checks run before the store touches any state.

use std::collections::HashMap;
use std::sync::RwLock;

use super::errors::{AuthError, AuthResult};
use super::scope::{ClientAuthorization, Principal, ScopeType};

/// Authorization seam used by the store
pub trait Authorizer: Send + Sync {
    /// Check a scoped operation on a collection
    fn authorize(&self, principal: &Principal, collection: &str, scope: ScopeType) -> AuthResult<()>;

    /// Check an operation reserved to the admin principal
    fn authorize_admin(&self, principal: &Principal, action: &str) -> AuthResult<()> {
        match principal {
            Principal::Admin => Ok(()),
            Principal::Client(id) => Err(AuthError::AdminRequired {
                client: id.clone(),
                action: action.to_string(),
            }),
        }
    }
}

/// Authorizer backed by an in-memory registry of client authorizations
#[derive(Debug, Default)]
pub struct ScopeAuthorizer {
    clients: RwLock<HashMap<String, ClientAuthorization>>,
}

impl ScopeAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client, replacing any previous grant under the same id
    pub fn create_client_authorization(
        &self,
        authorization: ClientAuthorization,
    ) -> AuthResult<ClientAuthorization> {
        authorization.validate()?;
        let mut clients = self.clients.write().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;
        clients.insert(authorization.client_id.clone(), authorization.clone());
        Ok(authorization)
    }

    pub fn get_client_authorization(&self, client_id: &str) -> AuthResult<ClientAuthorization> {
        let clients = self.clients.read().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;
        clients
            .get(client_id)
            .cloned()
            .ok_or_else(|| AuthError::UnknownClient(client_id.to_string()))
    }

    pub fn delete_client_authorization(&self, client_id: &str) -> AuthResult<()> {
        let mut clients = self.clients.write().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;
        clients
            .remove(client_id)
            .map(|_| ())
            .ok_or_else(|| AuthError::UnknownClient(client_id.to_string()))
    }
}

impl Authorizer for ScopeAuthorizer {
    fn authorize(&self, principal: &Principal, collection: &str, scope: ScopeType) -> AuthResult<()> {
        let client_id = match principal {
            Principal::Admin => return Ok(()),
            Principal::Client(id) => id,
        };
        let clients = self.clients.read().map_err(|_| {
            AuthError::StorageError("Lock poisoned".to_string())
        })?;
        // Unregistered clients are denied like any missing grant
        let allowed = clients
            .get(client_id)
            .map(|auth| auth.allows(collection, scope))
            .unwrap_or(false);
        if allowed {
            Ok(())
        } else {
            Err(AuthError::ScopeDenied {
                client: client_id.clone(),
                collection: collection.to_string(),
                scope,
            })
        }
    }
}
