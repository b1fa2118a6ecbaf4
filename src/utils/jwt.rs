use std::collections::HashSet;
use std::env;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::routes::auth::claims::Claims;

/// Floor for the shared signing secret; anything shorter is refused at boot.
const MIN_SECRET_BYTES: usize = 32;
/// A real secret has byte variety; "aaaa..." padded to length does not count.
const MIN_DISTINCT_BYTES: usize = 8;

#[derive(Debug, Error)]
pub enum TokenKeyError {
    #[error("AUTH_JWT_SECRET must be set")]
    MissingSecret,
    #[error("AUTH_JWT_SECRET must be at least {MIN_SECRET_BYTES} bytes long")]
    SecretTooShort,
    #[error("AUTH_JWT_SECRET is too repetitive to be a real secret")]
    SecretTooUniform,
}

/// Verifies identity-provider tokens, with issuer and audience pinned at
/// construction so no call site can forget to check them. Signing exists for
/// tests and local tooling; production tokens come from the provider.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn from_env(issuer: &str, audience: &str) -> Result<Self, TokenKeyError> {
        let secret = env::var("AUTH_JWT_SECRET").map_err(|_| TokenKeyError::MissingSecret)?;
        Self::new(secret.as_bytes(), issuer, audience)
    }

    pub fn new(secret: &[u8], issuer: &str, audience: &str) -> Result<Self, TokenKeyError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenKeyError::SecretTooShort);
        }
        let distinct = secret.iter().collect::<HashSet<_>>().len();
        if distinct < MIN_DISTINCT_BYTES {
            return Err(TokenKeyError::SecretTooUniform);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            issuer: issuer.to_owned(),
            audience: audience.to_owned(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    pub fn sign(&self, mut claims: Claims) -> Result<String, jsonwebtoken::errors::Error> {
        claims.iss = self.issuer.clone();
        claims.aud = self.audience.clone();
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn keys() -> TokenKeys {
        TokenKeys::new(SECRET, "test-issuer", "test-audience").expect("secret should be accepted")
    }

    fn claims_expiring_in(seconds: u64) -> Claims {
        Claims {
            sub: "user_2x7f".into(),
            email: "user@example.com".into(),
            name: "Jane Doe".into(),
            avatar: None,
            exp: (SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs()
                + seconds) as usize,
            iss: String::new(),
            aud: String::new(),
        }
    }

    #[test]
    fn rejects_short_secret() {
        let err = TokenKeys::new(b"too-short", "iss", "aud").unwrap_err();
        assert!(matches!(err, TokenKeyError::SecretTooShort));
    }

    #[test]
    fn rejects_repetitive_secret() {
        let err = TokenKeys::new(&[b'a'; MIN_SECRET_BYTES], "iss", "aud").unwrap_err();
        assert!(matches!(err, TokenKeyError::SecretTooUniform));
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let keys = keys();
        let token = keys.sign(claims_expiring_in(60)).expect("token should encode");
        let verified = keys.verify(&token).expect("token should verify");
        assert_eq!(verified.sub, "user_2x7f");
        assert_eq!(verified.iss, "test-issuer");
    }

    #[test]
    fn rejects_foreign_audience() {
        let signer = TokenKeys::new(SECRET, "test-issuer", "someone-else").unwrap();
        let token = signer.sign(claims_expiring_in(60)).unwrap();
        assert!(keys().verify(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let keys = keys();
        let mut claims = claims_expiring_in(0);
        claims.exp = 1_000; // long past
        let token = keys.sign(claims).unwrap();
        assert!(keys.verify(&token).is_err());
    }
}
