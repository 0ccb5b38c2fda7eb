use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;
use tracing::debug;

use crate::claims::Claims;
use crate::config::JwtConfig;
use crate::error::AuthResult;

/// Verifies HS256 bearer tokens issued by the salon's auth backend.
#[derive(Clone)]
pub struct JwtVerifier {
    config: JwtConfig,
    key: DecodingKey,
}

impl JwtVerifier {
    pub fn new(config: JwtConfig) -> Self {
        let key = DecodingKey::from_secret(config.secret.as_bytes());
        Self { config, key }
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.clone()]);
        validation.set_audience(&[self.config.audience.clone()]);
        validation.leeway = self.config.leeway_seconds.into();

        let token_data = decode::<Value>(token, &self.key, &validation)?;
        let claims = Claims::try_from(token_data.claims)?;
        debug!(subject = %claims.subject, "verified bearer token");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encode token")
    }

    fn config() -> JwtConfig {
        JwtConfig::new("salon-pos", "salon-api", "test-secret")
    }

    fn valid_claims() -> serde_json::Value {
        serde_json::json!({
            "sub": uuid::Uuid::new_v4().to_string(),
            "roles": ["staff"],
            "exp": 4_102_444_800i64,
            "iss": "salon-pos",
            "aud": "salon-api",
        })
    }

    #[test]
    fn verify_accepts_valid_token() {
        let verifier = JwtVerifier::new(config());
        let token = sign(&valid_claims(), "test-secret");
        let claims = verifier.verify(&token).expect("claims");
        assert!(claims.has_role("staff"));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let verifier = JwtVerifier::new(config());
        let token = sign(&valid_claims(), "other-secret");
        let err = verifier.verify(&token).expect_err("should reject");
        assert!(matches!(err, AuthError::Verification(_)));
    }

    #[test]
    fn verify_rejects_wrong_issuer() {
        let verifier = JwtVerifier::new(config());
        let mut claims = valid_claims();
        claims["iss"] = serde_json::json!("someone-else");
        let token = sign(&claims, "test-secret");
        assert!(verifier.verify(&token).is_err());
    }
}
