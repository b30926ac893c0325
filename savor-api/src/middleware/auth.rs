use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use savor_core::{Actor, CoreError, CoreResult, IdentityProvider, Principal, Role};

use crate::{error::AppError, state::AppState};

const NOT_AUTHORIZED: &str = "Not authorized to access this route";

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims issued by the auth service. Older tokens carry only `id`; the role
/// defaults to `user` when absent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default = "default_role")]
    pub role: Role,
    pub exp: usize,
}

fn default_role() -> Role {
    Role::User
}

/// Verifies HS256 bearer tokens locally with the shared secret.
#[derive(Clone)]
pub struct JwtIdentity {
    key: DecodingKey,
}

impl JwtIdentity {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentity {
    async fn resolve(&self, token: &str) -> CoreResult<Principal> {
        let data = decode::<TokenClaims>(token, &self.key, &Validation::default())
            .map_err(|e| CoreError::Unauthenticated(e.to_string()))?;

        let claims = data.claims;
        let user_id = claims
            .id
            .or(claims.sub)
            .ok_or_else(|| CoreError::Unauthenticated("token carries no user id".to_string()))?;

        Ok(Principal {
            user_id,
            role: claims.role,
        })
    }
}

// ============================================================================
// Authentication Middleware
// ============================================================================

/// The resolved caller, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub principal: Principal,
    /// Raw bearer credential, forwarded to the restaurant service
    pub token: String,
}

impl Authenticated {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.principal.role != role {
            return Err(AppError::AuthorizationError(format!(
                "User role {} is not authorized to access this route",
                self.principal.role
            )));
        }
        Ok(())
    }

    /// The caller as an actor, with the restaurant it operates when it holds
    /// the restaurant role.
    pub async fn actor(&self, state: &AppState) -> Result<Actor, AppError> {
        let restaurant_id = match self.principal.role {
            Role::Restaurant => state.restaurants.restaurant_for(&self.principal, &self.token).await?,
            Role::User | Role::Admin => None,
        };

        Ok(Actor::new(self.principal.clone(), restaurant_id))
    }
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError(NOT_AUTHORIZED.to_string()))?;
    let token = bearer.token().to_string();

    let principal = state.identity.resolve(&token).await.map_err(|err| match err {
        CoreError::Unauthenticated(reason) => {
            tracing::debug!("Rejected bearer token: {}", reason);
            AppError::AuthenticationError(NOT_AUTHORIZED.to_string())
        }
        other => other.into(),
    })?;

    req.extensions_mut().insert(Authenticated { principal, token });

    Ok(next.run(req).await)
}
