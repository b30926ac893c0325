//! Clients for the neighbouring platform services. All of them answer with
//! the `{ success, data }` envelope.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use savor_catalog::{CatalogClient, CatalogError, MenuItem};
use savor_core::{CoreError, CoreResult, IdentityProvider, Principal, RestaurantDirectory, Role};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, service: &str) -> CoreResult<T> {
    let body: Envelope<T> = resp
        .json()
        .await
        .map_err(|e| CoreError::InvalidResponse(format!("{} response decode failed: {}", service, e)))?;
    Ok(body.data)
}

fn base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Menu service client (`GET /menu-items/{id}`).
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base(base_url),
        }
    }

    /// `{base}/menu-items/{id}` with `id` as a single escaped path segment.
    fn item_url(&self, id: &str) -> Result<reqwest::Url, CatalogError> {
        // dot segments would be dropped by the URL serializer
        if id.is_empty() || id == "." || id == ".." {
            return Err(CatalogError::NotFound(id.to_string()));
        }

        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| CatalogError::Upstream(format!("invalid menu service url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| CatalogError::Upstream("menu service url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("menu-items")
            .push(id);
        Ok(url)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn menu_item(&self, id: &str) -> Result<MenuItem, CatalogError> {
        let resp = self
            .http
            .get(self.item_url(id)?)
            .send()
            .await
            .map_err(|e| CatalogError::Upstream(e.to_string()))?;

        let status = resp.status();
        // the menu service answers 400/500 for malformed ids
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(CatalogError::Upstream(format!("menu service status={}", status.as_u16())));
        }

        decode::<MenuItem>(resp, "menu service")
            .await
            .map_err(|e| CatalogError::Upstream(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    #[serde(alias = "_id")]
    id: String,
    role: Role,
}

/// Resolves bearer tokens through the auth service (`GET /auth/me`).
#[derive(Debug, Clone)]
pub struct AuthServiceIdentity {
    http: reqwest::Client,
    base_url: String,
}

impl AuthServiceIdentity {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base(base_url),
        }
    }
}

#[async_trait]
impl IdentityProvider for AuthServiceIdentity {
    async fn resolve(&self, token: &str) -> CoreResult<Principal> {
        let resp = self
            .http
            .get(format!("{}/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("auth service request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CoreError::Unauthenticated("Not authorized to access this route".to_string()));
        }
        if !status.is_success() {
            return Err(CoreError::Upstream(format!("auth service status={}", status.as_u16())));
        }

        let user: AuthUser = decode(resp, "auth service").await?;
        Ok(Principal {
            user_id: user.id,
            role: user.role,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RestaurantRef {
    #[serde(alias = "_id")]
    id: String,
}

/// Restaurant service client (`GET /restaurants/user`), called with the
/// caller's own credential.
#[derive(Debug, Clone)]
pub struct HttpRestaurantDirectory {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRestaurantDirectory {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base(base_url),
        }
    }
}

#[async_trait]
impl RestaurantDirectory for HttpRestaurantDirectory {
    async fn restaurant_for(&self, _principal: &Principal, token: &str) -> CoreResult<Option<String>> {
        let resp = self
            .http
            .get(format!("{}/restaurants/user", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| CoreError::Upstream(format!("restaurant service request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CoreError::Upstream(format!("restaurant service status={}", status.as_u16())));
        }

        let restaurant: Option<RestaurantRef> = decode(resp, "restaurant service").await?;
        Ok(restaurant.map(|r| r.id))
    }
}
