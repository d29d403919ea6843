//! Staff session extractor for the backoffice routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use salon_core::error::CoreError;
use salon_core::roles::is_known_role;
use salon_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Staff member authenticated by a Bearer token in the `Authorization` header.
///
/// Every backoffice request acts at the token's location.
#[derive(Debug, Clone)]
pub struct AuthStaff {
    pub staff_id: DbId,
    pub location_id: DbId,
    pub role: String,
}

impl AuthStaff {
    /// Reject access to records that belong to another location.
    pub fn ensure_location(&self, location_id: DbId) -> Result<(), AppError> {
        if location_id != self.location_id {
            return Err(AppError::Core(CoreError::Forbidden(
                "Record belongs to another location".into(),
            )));
        }
        Ok(())
    }
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.into()))
}

/// The token of a `Bearer` authorization header. The scheme is matched
/// case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>",
        )),
    }
}

impl FromRequestParts<AppState> for AuthStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        // Roles are copied into the token at login; one that has since been
        // retired from the schema must not grant anything.
        if !is_known_role(&claims.role) {
            tracing::warn!(staff_id = claims.sub, role = %claims.role, "Token carries unknown role");
            return Err(unauthorized("Invalid or expired token"));
        }

        Ok(AuthStaff {
            staff_id: claims.sub,
            location_id: claims.location_id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(&headers("bearer abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert_matches!(
            bearer_token(&headers("Basic dXNlcjpwdw==")),
            Err(AppError::Core(CoreError::Unauthorized(_)))
        );
        assert!(bearer_token(&headers("Bearer ")).is_err());
        assert!(bearer_token(&HeaderMap::new()).is_err());
    }

    #[test]
    fn location_guard() {
        let staff = AuthStaff {
            staff_id: 1,
            location_id: 7,
            role: "staff".into(),
        };
        assert!(staff.ensure_location(7).is_ok());
        assert_matches!(
            staff.ensure_location(8),
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
    }
}
