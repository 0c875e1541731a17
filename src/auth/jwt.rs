use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Claims carried by access tokens. Tokens are issued by the identity
/// service; this service only verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub exp: usize,
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|d| d.claims)
    .map_err(|e| AppError::unauthorized(format!("Invalid or expired token: {e}")))
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn accepts_tokens_signed_with_the_secret() {
        let token = test_tokens::sign(42, "s3cret", Duration::hours(1));
        let claims = verify_token(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "user42@example.com");
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = test_tokens::sign(42, "s3cret", Duration::hours(1));
        assert!(matches!(
            verify_token(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn rejects_expired_tokens() {
        let token = test_tokens::sign(42, "s3cret", Duration::hours(-2));
        assert!(verify_token(&token, "s3cret").is_err());
    }
}
