//! JWT access tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::{AuthConfig, ConfigError};

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username at the time the token was issued
    pub sub: String,
    /// User id
    pub id: String,
    /// Expiry (Unix timestamp, seconds)
    pub exp: i64,
}

/// Signs and verifies access tokens with a shared HMAC secret.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let algorithm = Algorithm::from_str(&config.algorithm).map_err(|_| {
            ConfigError::Validation(format!("Unknown token algorithm '{}'", config.algorithm))
        })?;

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret_key.as_bytes()),
            algorithm,
            lifetime: Duration::minutes(config.access_token_expire_minutes),
        })
    }

    /// Issue a token for `username` / `user_id`, valid for the configured lifetime.
    pub fn issue(&self, username: &str, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: username.to_string(),
            id: user_id.to_string(),
            exp: (Utc::now() + self.lifetime).timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let validation = Validation::new(self.algorithm);
        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config(secret: &str) -> AuthConfig {
        AuthConfig {
            secret_key: secret.to_string(),
            algorithm: "HS256".to_string(),
            access_token_expire_minutes: 30,
            bcrypt_cost: 4,
            min_password_score: 3,
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let issuer = TokenIssuer::new(&auth_config("secret")).unwrap();
        let token = issuer.issue("alice", "user-1").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.id, "user-1");
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = TokenIssuer::new(&auth_config("secret")).unwrap();
        let other = TokenIssuer::new(&auth_config("different")).unwrap();
        let token = issuer.issue("alice", "user-1").unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = TokenIssuer::new(&auth_config("secret")).unwrap();
        let claims = Claims {
            sub: "alice".to_string(),
            id: "user-1".to_string(),
            exp: (Utc::now() - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let issuer = TokenIssuer::new(&auth_config("secret")).unwrap();
        assert!(issuer.verify("not.a.token").is_err());
        assert!(issuer.verify("").is_err());
    }

    #[test]
    fn test_algorithm_mismatch_is_rejected() {
        let hs256 = TokenIssuer::new(&auth_config("secret")).unwrap();
        let mut config = auth_config("secret");
        config.algorithm = "HS512".to_string();
        let hs512 = TokenIssuer::new(&config).unwrap();

        let token = hs512.issue("alice", "user-1").unwrap();
        assert!(hs512.verify(&token).is_ok());
        assert!(hs256.verify(&token).is_err());
    }
}
