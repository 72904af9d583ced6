use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Seller,
}

impl std::str::FromStr for UserRole {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "seller" | "user" => Ok(Self::Seller),
            other => Err(AuthError::InvalidToken(format!("Unknown role: {other}"))),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Seller => write!(f, "seller"),
        }
    }
}

/// Claims issued by the login endpoint of the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub view_all_reports: bool,
}

/// Authenticated user context extracted from the bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub role: UserRole,
    pub can_view_all_reports: bool,
}

impl AuthenticatedUser {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self {
            user_id,
            name: None,
            role,
            can_view_all_reports: false,
        }
    }

    pub fn with_report_visibility(mut self, can_view_all_reports: bool) -> Self {
        self.can_view_all_reports = can_view_all_reports;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins and users flagged to see every seller's data get unrestricted scopes.
    pub fn sees_all_records(&self) -> bool {
        self.is_admin() || self.can_view_all_reports
    }

    fn from_claims(claims: TokenClaims) -> Result<Self, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("Invalid user ID".to_string()))?;
        let role = match claims.role.as_deref() {
            Some(role) => role.parse()?,
            None => UserRole::Seller,
        };
        Ok(Self {
            user_id,
            name: claims.name,
            role,
            can_view_all_reports: claims.view_all_reports,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization format")]
    InvalidFormat,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Token expired")]
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": "unauthorized",
            "message": self.to_string(),
            "code": "UNAUTHORIZED"
        });

        (
            StatusCode::UNAUTHORIZED,
            [("WWW-Authenticate", "Bearer")],
            Json(body),
        )
            .into_response()
    }
}

pub fn validate_jwt(token: &str, key: &DecodingKey) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.set_required_spec_claims(&["sub", "exp"]);

    decode::<TokenClaims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidFormat)
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = validate_jwt(token, &state.jwt_decoding_key)?;
        Self::from_claims(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(claims: &TokenClaims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn claims(role: Option<&str>) -> TokenClaims {
        TokenClaims {
            sub: Uuid::new_v4().to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            name: Some("Ana".to_string()),
            role: role.map(str::to_string),
            view_all_reports: false,
        }
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("User".parse::<UserRole>().unwrap(), UserRole::Seller);
        assert!("guest".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_validate_roundtrip_claims() {
        let original = claims(Some("admin"));
        let key = DecodingKey::from_secret(SECRET.as_bytes());
        let decoded = validate_jwt(&token(&original), &key).unwrap();
        let user = AuthenticatedUser::from_claims(decoded).unwrap();
        assert!(user.is_admin());
        assert!(user.sees_all_records());
        assert_eq!(user.user_id.to_string(), original.sub);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let key = DecodingKey::from_secret(b"another-secret");
        let result = validate_jwt(&token(&claims(None)), &key);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut expired = claims(None);
        expired.exp = chrono::Utc::now().timestamp() - 3600;
        let key = DecodingKey::from_secret(SECRET.as_bytes());
        let result = validate_jwt(&token(&expired), &key);
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_seller_visibility_flag() {
        let mut flagged = claims(Some("seller"));
        flagged.view_all_reports = true;
        let user = AuthenticatedUser::from_claims(flagged).unwrap();
        assert!(!user.is_admin());
        assert!(user.sees_all_records());

        let plain = AuthenticatedUser::from_claims(claims(None)).unwrap();
        assert_eq!(plain.role, UserRole::Seller);
        assert!(!plain.sees_all_records());
    }
}
