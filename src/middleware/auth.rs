use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Error, Result};
use crate::models::user::{Caller, Role};
use crate::AppState;

/// Claims issued by the identity provider. `role` is `candidate` or
/// `interviewer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
}

fn reject(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

/// Resolves the bearer token into a [`Caller`] request extension.
pub async fn require_caller(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(AUTHORIZATION) else {
        return reject("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return reject("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return reject("unsupported_scheme");
    };

    match resolve_caller(token, &state.jwt_secret) {
        Ok(caller) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            reject("invalid_token")
        }
    }
}

pub fn resolve_caller(token: &str, secret: &str) -> Result<Caller> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| Error::Unauthorized(e.to_string()))?;

    if data.claims.sub.trim().is_empty() {
        return Err(Error::Unauthorized("token has no subject".to_string()));
    }
    let role: Role = data.claims.role.parse().map_err(Error::Unauthorized)?;
    Ok(Caller::new(data.claims.sub, role))
}

/// Signs a token for `user_id`. Used by local tooling and tests.
pub fn issue_token(secret: &str, user_id: &str, role: Role, ttl: Duration) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + ttl).timestamp().max(0) as usize,
        role: role.as_str().to_string(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("could not sign token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_resolves_to_caller() {
        let token = issue_token(SECRET, "u1", Role::Interviewer, Duration::hours(1)).unwrap();
        let caller = resolve_caller(&token, SECRET).unwrap();
        assert_eq!(caller, Caller::new("u1", Role::Interviewer));
    }

    #[test]
    fn wrong_secret_and_expired_tokens_fail() {
        let token = issue_token(SECRET, "u1", Role::Candidate, Duration::hours(1)).unwrap();
        assert!(resolve_caller(&token, "other").is_err());

        let expired = issue_token(SECRET, "u1", Role::Candidate, Duration::hours(-2)).unwrap();
        assert!(matches!(
            resolve_caller(&expired, SECRET),
            Err(Error::Unauthorized(_))
        ));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let claims = Claims {
            sub: "u1".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
            role: "admin".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(resolve_caller(&token, SECRET).is_err());
    }
}
