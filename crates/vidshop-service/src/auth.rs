//! Caller authentication.
//!
//! Every `/v1` request comes from the chat command layer, which proves itself
//! with the shared `x-api-key` and then says who it is acting for:
//!
//! - `x-user-id`: the acting user (required)
//! - `x-platform-owner`: `true` when the user owns the community
//! - `x-scope-id`: the community the command was issued in

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use vidshop_core::{AdminContext, ScopeId, UserId};
use vidshop_shop::AdminActor;

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the service API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying the acting user.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header flagging the acting user as the platform owner.
pub const PLATFORM_OWNER_HEADER: &str = "x-platform-owner";
/// Header carrying the request's scope.
pub const SCOPE_ID_HEADER: &str = "x-scope-id";

/// An authenticated request from the command layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// The acting user.
    pub user: UserId,
    /// Platform facts about the acting user.
    pub context: AdminContext,
    /// Scope the request came from, if any.
    pub scope: Option<ScopeId>,
}

impl Caller {
    /// The caller as an admin actor.
    #[must_use]
    pub const fn actor(&self) -> AdminActor {
        AdminActor {
            user: self.user,
            context: self.context,
        }
    }

    /// The request scope, required by scope-specific operations.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::BadRequest` if no scope header was sent.
    pub fn require_scope(&self) -> Result<ScopeId, ApiError> {
        self.scope
            .ok_or_else(|| ApiError::BadRequest(format!("missing {SCOPE_ID_HEADER} header")))
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let api_key = header(&parts.headers, API_KEY_HEADER).ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .service_api_key
            .as_deref()
            .ok_or(ApiError::Unauthorized)?;

        if !constant_time_eq(api_key, expected_key) {
            tracing::warn!("Rejected request with invalid API key");
            return Err(ApiError::Unauthorized);
        }

        let user = header(&parts.headers, USER_ID_HEADER)
            .ok_or_else(|| ApiError::BadRequest(format!("missing {USER_ID_HEADER} header")))?
            .parse::<UserId>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        if user.get() <= 0 {
            return Err(ApiError::BadRequest(format!("{user} is not a user")));
        }

        let scope = header(&parts.headers, SCOPE_ID_HEADER)
            .map(str::parse::<ScopeId>)
            .transpose()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        let is_platform_owner = header(&parts.headers, PLATFORM_OWNER_HEADER)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Ok(Caller {
            user,
            context: AdminContext { is_platform_owner },
            scope,
        })
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
