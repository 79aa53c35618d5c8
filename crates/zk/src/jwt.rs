//! Unverified JWT claim extraction.
//!
//! Signature verification belongs to the OAuth provider integration and the
//! proving service; this only reads the payload to learn which claims the
//! proof will commit to.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::ZkLoginError;

/// Claims a zkLogin proof commits to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawClaims {
    iss: String,
    aud: Audience,
    sub: String,
    #[serde(default)]
    nonce: Option<String>,
}

impl JwtClaims {
    /// Decode the payload segment of a compact JWT without checking its signature.
    ///
    /// Tokens with several audiences are rejected: the circuit commits to exactly one.
    pub fn from_unverified_jwt(jwt: &str) -> Result<Self, ZkLoginError> {
        let mut segments = jwt.trim().split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(ZkLoginError::InvalidJwt(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let payload = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ZkLoginError::InvalidJwt(format!("payload is not base64url: {e}")))?;

        let raw: RawClaims = serde_json::from_slice(&payload)
            .map_err(|e| ZkLoginError::InvalidJwt(format!("payload is not valid claims JSON: {e}")))?;

        let aud = match raw.aud {
            Audience::One(aud) => aud,
            Audience::Many(mut audiences) if audiences.len() == 1 => audiences.remove(0),
            Audience::Many(audiences) => {
                return Err(ZkLoginError::InvalidJwt(format!(
                    "expected a single audience, got {}",
                    audiences.len()
                )));
            }
        };

        Ok(Self {
            iss: raw.iss,
            aud,
            sub: raw.sub,
            nonce: raw.nonce,
        })
    }
}

#[cfg(test)]
pub(crate) fn encode_test_jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reads_claims() {
        let jwt = encode_test_jwt(&json!({
            "iss": "https://accounts.google.com",
            "aud": "client-id",
            "sub": "1234",
            "nonce": "abc",
            "iat": 1
        }));

        let claims = JwtClaims::from_unverified_jwt(&jwt).unwrap();
        assert_eq!(claims.iss, "https://accounts.google.com");
        assert_eq!(claims.aud, "client-id");
        assert_eq!(claims.sub, "1234");
        assert_eq!(claims.nonce.as_deref(), Some("abc"));
    }

    #[test]
    fn test_single_element_audience_array() {
        let jwt = encode_test_jwt(&json!({"iss": "i", "aud": ["a"], "sub": "s"}));
        assert_eq!(JwtClaims::from_unverified_jwt(&jwt).unwrap().aud, "a");

        let jwt = encode_test_jwt(&json!({"iss": "i", "aud": ["a", "b"], "sub": "s"}));
        assert!(JwtClaims::from_unverified_jwt(&jwt).is_err());
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(JwtClaims::from_unverified_jwt("not-a-jwt").is_err());
        assert!(JwtClaims::from_unverified_jwt("a.!!!.c").is_err());
        assert!(JwtClaims::from_unverified_jwt("a.b.c.d").is_err());
    }
}
