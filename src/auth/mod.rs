pub mod policy;
pub mod token;

pub use policy::{AccessPolicy, Action, Resource};
pub use token::{Claims, TokenError, TokenKeys, ROLE_ADMIN, ROLE_USER};

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

/// 已通过令牌校验的当前用户
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub access: Vec<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
            access: claims.access,
        }
    }
}

/// 读取 `Authorization: Bearer <token>`
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;
        let keys = Arc::<TokenKeys>::from_ref(state);
        let claims = keys
            .verify(token, chrono::Utc::now().timestamp())
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;
        Ok(AuthUser::from(claims))
    }
}
