//! Authentication middleware
//!
//! Validates the bearer token and exposes the caller to handlers. Role checks
//! go through the shared access policy.

use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::{required_role, Action, Resource, Role};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_access_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    /// Fail with `403` unless the policy allows the operation
    pub fn require(&self, resource: Resource, action: Action) -> AppResult<()> {
        let required = required_role(resource, action);
        if self.role.satisfies(required) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                ?resource,
                ?action,
                "access denied"
            );
            Err(AppError::Forbidden(required.to_string()))
        }
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return AppError::Unauthorized("Missing or invalid Authorization header".into())
            .into_response();
    };

    let claims = match decode_access_token(bearer.token(), &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return AppError::Unauthorized("Invalid user ID in token".into()).into_response(),
    };

    let Some(role) = Role::parse(&claims.role) else {
        return AppError::Unauthorized("Invalid role in token".into()).into_response();
    };

    request.extensions_mut().insert(AuthUser { user_id, role });

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}
