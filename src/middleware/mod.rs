use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::User;

/// The authenticated caller, resolved from HTTP Basic credentials.
/// Order endpoints use it to scope reads and to own created orders.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Splits a Basic `Authorization` header value into (email, password).
pub fn parse_basic_credentials(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (email, password) = credentials.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let (email, password) =
            parse_basic_credentials(auth_header).ok_or(ApiError::Unauthorized)?;

        let user: User = User::find_by_email(&email, &state.db)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !user.verify_password(&password) {
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_basic_header() {
        let encoded = general_purpose::STANDARD.encode("user@example.com:hunter2");
        let header = format!("Basic {encoded}");
        assert_eq!(
            parse_basic_credentials(&header),
            Some(("user@example.com".to_string(), "hunter2".to_string()))
        );
    }

    #[test]
    fn password_may_contain_colons() {
        let encoded = general_purpose::STANDARD.encode("a@b.c:pa:ss");
        let header = format!("Basic {encoded}");
        let (_, password) = parse_basic_credentials(&header).unwrap();
        assert_eq!(password, "pa:ss");
    }

    #[test]
    fn rejects_non_basic_schemes() {
        assert_eq!(parse_basic_credentials("Bearer abc"), None);
        assert_eq!(parse_basic_credentials("Basic %%%"), None);
        assert_eq!(parse_basic_credentials(""), None);
    }
}
