use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreResult;

/// Platform roles as issued by the auth service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Restaurant,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Restaurant => "restaurant",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "restaurant" => Ok(Role::Restaurant),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// The authenticated caller behind a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

/// A principal plus the restaurant it operates, when that matters for the
/// request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
    pub restaurant_id: Option<String>,
}

impl Actor {
    pub fn new(principal: Principal, restaurant_id: Option<String>) -> Self {
        Self {
            user_id: principal.user_id,
            role: principal.role,
            restaurant_id,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// True when the actor operates the given restaurant.
    pub fn operates(&self, restaurant_id: &str) -> bool {
        self.role == Role::Restaurant && self.restaurant_id.as_deref() == Some(restaurant_id)
    }
}

impl From<Principal> for Actor {
    fn from(principal: Principal) -> Self {
        Self::new(principal, None)
    }
}

/// Resolves a bearer credential to a principal.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fails with `CoreError::Unauthenticated` for missing, expired or
    /// forged credentials.
    async fn resolve(&self, token: &str) -> CoreResult<Principal>;
}

/// Looks up the restaurant a principal operates.
#[async_trait]
pub trait RestaurantDirectory: Send + Sync {
    /// `Ok(None)` when the principal owns no restaurant.
    async fn restaurant_for(&self, principal: &Principal, token: &str) -> CoreResult<Option<String>>;
}
