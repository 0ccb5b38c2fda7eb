use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Application-focused representation of verified token claims.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    pub subject: Uuid,
    pub roles: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub issuer: String,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|value| value == role)
    }
}

#[derive(Debug, Deserialize)]
struct ClaimsRepr {
    sub: String,
    #[serde(default)]
    roles: Vec<String>,
    exp: i64,
    #[serde(default)]
    iat: Option<i64>,
    iss: String,
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = AuthError;

    fn try_from(value: ClaimsRepr) -> AuthResult<Self> {
        let subject = Uuid::parse_str(&value.sub)
            .map_err(|_| AuthError::InvalidClaim("sub", value.sub.clone()))?;

        let expires_at = Utc
            .timestamp_opt(value.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidClaim("exp", value.exp.to_string()))?;

        let issued_at = match value.iat {
            Some(iat) => Some(
                Utc.timestamp_opt(iat, 0)
                    .single()
                    .ok_or_else(|| AuthError::InvalidClaim("iat", iat.to_string()))?,
            ),
            None => None,
        };

        Ok(Self {
            subject,
            roles: value.roles,
            expires_at,
            issued_at,
            issuer: value.iss,
        })
    }
}

impl TryFrom<serde_json::Value> for Claims {
    type Error = AuthError;

    fn try_from(value: serde_json::Value) -> AuthResult<Self> {
        let repr: ClaimsRepr = serde_json::from_value(value)
            .map_err(|err| AuthError::InvalidJson(err.to_string()))?;
        Claims::try_from(repr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_parse_from_json() {
        let value = serde_json::json!({
            "sub": "8f7d3a1e-0000-4000-8000-000000000001",
            "roles": ["staff"],
            "exp": 4_102_444_800i64,
            "iss": "salon-pos",
            "aud": "salon-api",
        });
        let claims = Claims::try_from(value).expect("claims");
        assert!(claims.has_role("staff"));
        assert!(!claims.has_role("admin"));
        assert_eq!(claims.issuer, "salon-pos");
    }

    #[test]
    fn claims_reject_malformed_subject() {
        let value = serde_json::json!({
            "sub": "not-a-uuid",
            "exp": 4_102_444_800i64,
            "iss": "salon-pos",
        });
        let err = Claims::try_from(value).expect_err("should reject");
        assert!(matches!(err, AuthError::InvalidClaim("sub", _)));
    }
}
