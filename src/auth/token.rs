// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session token signing and validation.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::SessionClaims;
use super::protector::{random_identifier, ProtectorError};
use super::roles::Role;
use crate::config::SessionSettings;

/// The only algorithm accepted or produced.
pub const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token algorithm is not accepted")]
    InvalidAlgorithm,
    #[error("token issuer is invalid")]
    InvalidIssuer,
    #[error("token audience is invalid")]
    InvalidAudience,
    #[error("token is not yet valid")]
    NotYetValid,
    #[error("token is malformed")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error("failed to generate token id: {0}")]
    Random(#[from] ProtectorError),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => TokenError::InvalidAlgorithm,
            ErrorKind::InvalidIssuer => TokenError::InvalidIssuer,
            ErrorKind::InvalidAudience => TokenError::InvalidAudience,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            _ => TokenError::Malformed,
        }
    }
}

/// Signs and validates session tokens with the shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl TokenSigner {
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&settings.signing_secret),
            decoding_key: DecodingKey::from_secret(&settings.signing_secret),
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }

    /// Claims for a fresh sign-in at `now`, valid for `lifetime`.
    pub fn claims_for(
        &self,
        user_id: &str,
        username: &str,
        roles: &[Role],
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<SessionClaims, TokenError> {
        Ok(SessionClaims {
            sub: username.to_string(),
            jti: random_identifier(16)?,
            user_id: user_id.to_string(),
            logged_on: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        })
    }

    pub fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        encode(&Header::new(SESSION_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm, lifetime, issuer and audience.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(SESSION_ALGORITHM);
        validation.algorithms = vec![SESSION_ALGORITHM];
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.validate_nbf = true;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud", "sub"]);

        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret-of-32-bytes!";

    fn signer() -> TokenSigner {
        TokenSigner::new(&SessionSettings::new(SECRET))
    }

    fn fresh_claims(signer: &TokenSigner, lifetime: Duration) -> SessionClaims {
        signer
            .claims_for("user-1", "ada", &[Role::User], Utc::now(), lifetime)
            .unwrap()
    }

    #[test]
    fn sign_and_validate() {
        let signer = signer();
        let claims = fresh_claims(&signer, Duration::minutes(10));
        let token = signer.sign(&claims).unwrap();

        let validated = signer.validate(&token).unwrap();
        assert_eq!(validated, claims);
        assert_eq!(validated.roles, vec!["User".to_string()]);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let signer = signer();
        let claims = signer
            .claims_for(
                "user-1",
                "ada",
                &[],
                Utc::now() - Duration::hours(2),
                Duration::minutes(30),
            )
            .unwrap();
        let token = signer.sign(&claims).unwrap();
        assert!(matches!(signer.validate(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn other_secret_fails_signature() {
        let token = signer()
            .sign(&fresh_claims(&signer(), Duration::minutes(10)))
            .unwrap();
        let other = TokenSigner::new(&SessionSettings::new(
            b"another-signing-secret-32-bytes!".to_vec(),
        ));
        assert!(matches!(
            other.validate(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_audience_and_issuer_rejected() {
        let token = signer()
            .sign(&fresh_claims(&signer(), Duration::minutes(10)))
            .unwrap();

        let mut settings = SessionSettings::new(SECRET);
        settings.audience = "other-clients".to_string();
        assert!(matches!(
            TokenSigner::new(&settings).validate(&token),
            Err(TokenError::InvalidAudience)
        ));

        let mut settings = SessionSettings::new(SECRET);
        settings.issuer = "someone-else".to_string();
        assert!(matches!(
            TokenSigner::new(&settings).validate(&token),
            Err(TokenError::InvalidIssuer)
        ));
    }

    #[test]
    fn other_hmac_algorithm_rejected() {
        let signer = signer();
        let claims = fresh_claims(&signer, Duration::minutes(10));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(matches!(
            signer.validate(&token),
            Err(TokenError::InvalidAlgorithm)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            signer().validate("not.a.token"),
            Err(TokenError::Malformed)
        ));
    }
}
