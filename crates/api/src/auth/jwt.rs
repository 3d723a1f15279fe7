//! Session tokens.
//!
//! An access token is an HS256 JWT issued by `tally` that names the user and
//! their role. A refresh token is an opaque UUID; sessions keep only its
//! SHA-256 digest.

use chrono::Duration;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tally_core::roles::Role;
use tally_core::types::{DbId, Timestamp};
use uuid::Uuid;

pub const ISSUER: &str = "tally";

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: DbId,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or a lifetime is not a
    /// positive integer.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        Self {
            secret,
            access_token_expiry_mins: lifetime_from_env(
                "JWT_ACCESS_EXPIRY_MINS",
                DEFAULT_ACCESS_EXPIRY_MINS,
            ),
            refresh_token_expiry_days: lifetime_from_env(
                "JWT_REFRESH_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
            ),
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }

    pub fn refresh_expires_at(&self, issued_at: Timestamp) -> Timestamp {
        issued_at + Duration::days(self.refresh_token_expiry_days)
    }
}

fn lifetime_from_env(name: &str, default: i64) -> i64 {
    let value = match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be an integer, got '{raw}'")),
        Err(_) => default,
    };
    assert!(value > 0, "{name} must be positive");
    value
}

/// Everything a login or refresh hands out.
#[derive(Debug)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Digest of `refresh_token`, the only form that is persisted.
    pub refresh_token_hash: String,
    pub expires_in: i64,
}

pub fn issue_tokens(
    user_id: DbId,
    role: Role,
    config: &JwtConfig,
) -> Result<IssuedTokens, jsonwebtoken::errors::Error> {
    let access_token = encode_access_token(user_id, role, config)?;
    let refresh_token = Uuid::new_v4().to_string();
    Ok(IssuedTokens {
        access_token,
        refresh_token_hash: refresh_token_digest(&refresh_token),
        refresh_token,
        expires_in: config.access_ttl_secs(),
    })
}

pub fn encode_access_token(
    user_id: DbId,
    role: Role,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role,
        iss: ISSUER.to_string(),
        iat: now,
        exp: now + config.access_ttl_secs(),
        jti: Uuid::new_v4(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify signature, expiry and issuer.
pub fn decode_access_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);
    // `sub` is numeric, so it is not listed here; jsonwebtoken only
    // recognises string subjects as present.
    validation.set_required_spec_claims(&["exp", "iss"]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}

/// Hex SHA-256 of a refresh token, used as the session lookup key.
pub fn refresh_token_digest(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        }
    }

    fn sign(claims: &Claims, config: &JwtConfig) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_access_token_round_trips_role() {
        let config = config();
        let issued = issue_tokens(42, Role::Accountant, &config).unwrap();

        let claims = decode_access_token(&issued.access_token, &config).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Accountant);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 900);
        assert_eq!(issued.expires_in, 900);
        assert_eq!(issued.refresh_token_hash, refresh_token_digest(&issued.refresh_token));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        let now = chrono::Utc::now().timestamp();
        // Beyond the default 60-second leeway.
        let token = sign(
            &Claims {
                sub: 1,
                role: Role::Viewer,
                iss: ISSUER.into(),
                iat: now - 600,
                exp: now - 300,
                jti: Uuid::new_v4(),
            },
            &config,
        );
        assert!(decode_access_token(&token, &config).is_err());
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let config = config();
        let now = chrono::Utc::now().timestamp();
        let token = sign(
            &Claims {
                sub: 1,
                role: Role::Admin,
                iss: "someone-else".into(),
                iat: now,
                exp: now + 600,
                jti: Uuid::new_v4(),
            },
            &config,
        );
        assert!(decode_access_token(&token, &config).is_err());
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = encode_access_token(1, Role::Admin, &config()).unwrap();
        let other = JwtConfig {
            secret: "a-different-secret".to_string(),
            ..config()
        };
        assert!(decode_access_token(&token, &other).is_err());
    }

    #[test]
    fn token_without_issuer_is_rejected() {
        #[derive(Serialize)]
        struct NoIssuer {
            sub: DbId,
            role: Role,
            iat: i64,
            exp: i64,
        }
        let config = config();
        let now = chrono::Utc::now().timestamp();
        let token = encode(
            &Header::default(),
            &NoIssuer {
                sub: 7,
                role: Role::Admin,
                iat: now,
                exp: now + 600,
            },
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();
        assert!(decode_access_token(&token, &config).is_err());
    }

    #[test]
    fn refresh_digest_is_hex_sha256() {
        let digest = refresh_token_digest("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
