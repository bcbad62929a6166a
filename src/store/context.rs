//! Request context

use uuid::Uuid;

use crate::auth::Principal;

/// Caller and correlation id for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub principal: Principal,
}

impl RequestContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            principal,
        }
    }

    pub fn admin() -> Self {
        Self::new(Principal::Admin)
    }

    pub fn client(id: impl Into<String>) -> Self {
        Self::new(Principal::client(id))
    }
}
