use uuid::Uuid;

use crate::ports::TokenClaims;

/// The principal a call is made on behalf of.
///
/// Passed explicitly into every service operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    /// `None` for unauthenticated callers.
    pub id: Option<Uuid>,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn user(id: Uuid, roles: Vec<String>) -> Self {
        Self {
            id: Some(id),
            roles,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<TokenClaims> for Actor {
    fn from(claims: TokenClaims) -> Self {
        Self::user(claims.user_id, claims.roles)
    }
}
