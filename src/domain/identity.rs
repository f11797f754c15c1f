//! Authenticated actor identity
//!
//! The identity provider is an external collaborator: every operation receives
//! an already-verified `Actor` and the core trusts it without re-checking
//! credentials.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Role of an authenticated actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "BUYER")]
    Buyer,
    #[serde(rename = "SOLVER")]
    Solver,
    #[serde(rename = "ADMIN")]
    Admin
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            Role::Buyer => "BUYER",
            Role::Solver => "SOLVER",
            Role::Admin => "ADMIN"
        };
        write!(f, "{}", role)
    }
}

/// Authenticated identity issuing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable identifier supplied by the identity provider
    pub id:   String,
    /// Verified role
    pub role: Role
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    pub fn buyer(id: impl Into<String>) -> Self {
        Self::new(id, Role::Buyer)
    }

    pub fn solver(id: impl Into<String>) -> Self {
        Self::new(id, Role::Solver)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }
}
