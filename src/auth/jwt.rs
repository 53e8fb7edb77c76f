use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token generation failed: {0}")]
    GenerationFailed(jsonwebtoken::errors::Error),
    #[error("Token verification failed: {0}")]
    VerificationFailed(jsonwebtoken::errors::Error),
    #[error("Token expired")]
    Expired,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
    pub iss: String,
}

/// A freshly signed session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expiration: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, issuer: &str, expiration_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            issuer: issuer.to_string(),
            expiration: Duration::minutes(expiration_minutes.max(1)),
        }
    }

    pub fn expiration(&self) -> Duration {
        self.expiration
    }

    /// Signe un token HS256 valable exactement `expiration` à partir de `now`.
    pub fn issue(
        &self,
        account_id: Uuid,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, JwtError> {
        let token_id = Uuid::new_v4();
        let expires_at = now + self.expiration;

        let claims = Claims {
            sub: account_id,
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: token_id,
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::GenerationFailed)?;

        Ok(IssuedToken {
            token,
            token_id,
            expires_at,
        })
    }

    /// Checks signature and issuer, then expiry against `now` with no leeway:
    /// the token is valid while `now < exp`.
    pub fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::VerificationFailed)?;

        if now.timestamp() >= claims.exp {
            return Err(JwtError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_jwt_manager() -> JwtManager {
        JwtManager::new("my_secret_key_for_tests_0123456789", "timesheet-portal", 60)
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let jwt = make_jwt_manager();
        let account_id = Uuid::new_v4();
        let now = Utc::now();

        let issued = jwt.issue(account_id, "a@example.com", now).expect("issue");
        let claims = jwt.verify_token(&issued.token, now).expect("verify");

        assert_eq!(claims.sub, account_id);
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.jti, issued.token_id);
        assert_eq!(claims.iss, "timesheet-portal");
    }

    #[test]
    fn expiry_is_exactly_iat_plus_duration() {
        let jwt = make_jwt_manager();
        let now = Utc::now();

        let issued = jwt.issue(Uuid::new_v4(), "a@example.com", now).unwrap();
        let claims = jwt.verify_token(&issued.token, now).unwrap();

        assert!(issued.expires_at > now);
        assert_eq!(issued.expires_at, now + Duration::minutes(60));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_is_rejected_from_exp_on() {
        let jwt = make_jwt_manager();
        let now = Utc::now();
        let issued = jwt.issue(Uuid::new_v4(), "a@example.com", now).unwrap();

        let just_before = issued.expires_at - Duration::seconds(1);
        assert!(jwt.verify_token(&issued.token, just_before).is_ok());
        assert!(matches!(
            jwt.verify_token(&issued.token, issued.expires_at),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn each_token_has_its_own_id() {
        let jwt = make_jwt_manager();
        let now = Utc::now();
        let id = Uuid::new_v4();

        let first = jwt.issue(id, "a@example.com", now).unwrap();
        let second = jwt.issue(id, "a@example.com", now).unwrap();
        assert_ne!(first.token_id, second.token_id);
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let now = Utc::now();
        let other = JwtManager::new("my_secret_key_for_tests_0123456789", "someone-else", 60);
        let issued = other.issue(Uuid::new_v4(), "a@example.com", now).unwrap();

        assert!(matches!(
            make_jwt_manager().verify_token(&issued.token, now),
            Err(JwtError::VerificationFailed(_))
        ));
    }

    #[test]
    fn verify_token_fails_with_invalid_input() {
        let result = make_jwt_manager().verify_token("invalid.token.here", Utc::now());

        assert!(matches!(result.unwrap_err(), JwtError::VerificationFailed(_)));
    }
}
