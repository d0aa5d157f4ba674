use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::models::auth::Claims;
use crate::AppState;

pub const TOKEN_TTL_SECS: usize = 12 * 3600;

/// Extractor for editor requests. Carries the editor name, the store the
/// token was issued for and the token's session id.
pub struct AuthEditor {
    pub editor: String,
    pub store_id: String,
    pub session_id: Uuid,
}

impl AuthEditor {
    /// Tokens only grant access to the store they were issued for.
    pub fn can_edit(&self, store_id: &str) -> bool {
        self.store_id == store_id
    }
}

impl FromRequestParts<AppState> for AuthEditor {
    type Rejection = (StatusCode, &'static str);

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let jwt_secret = state.jwt_secret.clone();
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        async move {
            let header = auth_header
                .ok_or((StatusCode::UNAUTHORIZED, "Missing Authorization header"))?;

            let token = header
                .strip_prefix("Bearer ")
                .ok_or((StatusCode::UNAUTHORIZED, "Invalid Authorization format"))?;

            let claims = validate_token(token, &jwt_secret)
                .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

            Ok(AuthEditor {
                editor: claims.sub,
                store_id: claims.store_id,
                session_id: claims.sid,
            })
        }
    }
}

/// Issue an editor token for one store. Returns the token and its expiry
/// (unix seconds).
pub fn create_token(
    editor: &str,
    store_id: &str,
    secret: &str,
) -> Result<(String, usize), jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: editor.to_string(),
        store_id: store_id.to_string(),
        sid: Uuid::new_v4(),
        exp: now + TOKEN_TTL_SECS,
        iat: now,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok((token, claims.exp))
}

/// Validate a token string and return claims. Used by WebSocket auth.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_and_reject_other_secrets() {
        let (token, exp) = create_token("ana", "store-1", "secret").unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "ana");
        assert_eq!(claims.store_id, "store-1");
        assert_eq!(claims.exp, exp);
        assert!(validate_token(&token, "other").is_err());
        assert!(validate_token("garbage", "secret").is_err());
    }
}
