//! Token validation: who is behind a join request.
//!
//! Tokens are issued by the REST subsystem at sign-in. The realtime
//! layer never issues them; it only checks them with the same key and
//! algorithm and reads the `userId` claim.
//!
//! [`TokenValidator`] is the seam: production uses [`JwtValidator`],
//! tests can plug in anything that maps a string to a [`UserId`].

use gridspace_protocol::UserId;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::SessionError;

/// Validates a join token and returns the user it was issued to.
///
/// Every failure must be reported as [`SessionError::InvalidToken`];
/// callers never learn why a token was refused. No role check is made:
/// any authenticated user may join a space.
pub trait TokenValidator: Send + Sync + 'static {
    fn validate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, SessionError>> + Send;
}

/// The claims we read. Other claims (`role`, `iat`, ...) are ignored.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(rename = "userId")]
    user_id: String,
}

/// HS256 JSON Web Token validator sharing its secret with the
/// authentication subsystem.
///
/// The secret is always injected by the caller. Tokens without an
/// `exp` claim are accepted unless [`require_exp`](Self::require_exp)
/// is set; an `exp` that is present is always enforced.
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Builds a validator for tokens signed with `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Requires tokens to carry an `exp` claim.
    pub fn require_exp(mut self, required: bool) -> Self {
        if required {
            self.validation.set_required_spec_claims(&["exp"]);
        } else {
            self.validation.required_spec_claims.clear();
        }
        self
    }
}

impl TokenValidator for JwtValidator {
    async fn validate(&self, token: &str) -> Result<UserId, SessionError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            SessionError::InvalidToken
        })?;

        if data.claims.user_id.is_empty() {
            tracing::debug!("token has empty userId");
            return Err(SessionError::InvalidToken);
        }
        Ok(UserId(data.claims.user_id))
    }
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn sign(claims: serde_json::Value, secret: &[u8]) -> String {
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn now() -> u64 {
        jsonwebtoken::get_current_timestamp()
    }

    #[tokio::test]
    async fn test_valid_token_yields_user_id() {
        let token = sign(json!({ "userId": "u-1", "role": "Admin" }), SECRET);

        let user = JwtValidator::new(SECRET).validate(&token).await.unwrap();

        assert_eq!(user, UserId::from("u-1"));
    }

    #[tokio::test]
    async fn test_wrong_signature_is_invalid() {
        let token = sign(json!({ "userId": "u-1" }), b"other-secret");

        let result = JwtValidator::new(SECRET).validate(&token).await;

        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_malformed_token_is_invalid() {
        let result = JwtValidator::new(SECRET).validate("not.a.jwt").await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_expired_token_is_invalid() {
        let token = sign(json!({ "userId": "u-1", "exp": now() - 3600 }), SECRET);

        let result = JwtValidator::new(SECRET).validate(&token).await;

        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_missing_user_id_is_invalid() {
        let token = sign(json!({ "role": "User" }), SECRET);
        let result = JwtValidator::new(SECRET).validate(&token).await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_require_exp_rejects_tokens_without_exp() {
        let without = sign(json!({ "userId": "u-1" }), SECRET);
        let with = sign(json!({ "userId": "u-1", "exp": now() + 3600 }), SECRET);
        let validator = JwtValidator::new(SECRET).require_exp(true);

        assert!(matches!(
            validator.validate(&without).await,
            Err(SessionError::InvalidToken)
        ));
        assert_eq!(validator.validate(&with).await.unwrap(), UserId::from("u-1"));
    }
}
