//! Extraction of identity claims from compact tokens
//!
//! Identity tokens arrive as three base64url-encoded sections separated by
//! `.`: a header, a payload, and a signature. Only the payload is read here.
//!
//! **WARNING:** *The signature is never checked.* Anyone able to reach the
//! service can mint a token with the expected `iss` and any `email`. The
//! issuer check guards against tokens from the wrong identity provider being
//! sent by mistake, not against forgery.

use aliri::{jwt, JwtRef};
use aliri_base64::Base64Url;
use serde_json::{Map, Value};

use crate::{
    error::{self, ClaimsError},
    Email, EmailRef, RecipientName,
};

/// The claims that identify the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityClaims {
    issuer: jwt::Issuer,
    email: Email,
}

impl IdentityClaims {
    /// The issuer that asserted the identity
    pub fn issuer(&self) -> &jwt::IssuerRef {
        &self.issuer
    }

    /// The caller's email address
    pub fn email(&self) -> &EmailRef {
        &self.email
    }

    /// The recipient name derived from the caller's email address
    pub fn recipient_name(&self) -> RecipientName {
        RecipientName::from_email(&self.email)
    }
}

macro_rules! expect_three {
    ($iter:expr) => {{
        let mut i = $iter;
        match (i.next(), i.next(), i.next(), i.next()) {
            (Some(first), Some(second), Some(third), None) => Some((first, second, third)),
            _ => None,
        }
    }};
}

/// Extracts the caller's identity from a compact token
///
/// # Errors
///
/// Returns an error if the token does not have exactly three sections, if
/// the payload is not base64url-encoded (unpadded) JSON, if the `iss` claim
/// is not exactly `expected_issuer`, or if the `email` claim is absent or not
/// a string.
///
/// The payload must be a JSON object. Other claims are ignored, and when a
/// claim is repeated the last occurrence wins.
pub fn extract_claims(
    token: &JwtRef,
    expected_issuer: &jwt::IssuerRef,
) -> Result<IdentityClaims, ClaimsError> {
    let (_, payload, _) =
        expect_three!(token.as_str().split('.')).ok_or_else(error::malformed_token)?;

    let raw = Base64Url::from_encoded(payload).map_err(error::malformed_payload)?;
    let mut claims: Map<String, Value> =
        serde_json::from_slice(raw.as_slice()).map_err(error::malformed_payload)?;

    let issuer = match claims.remove("iss") {
        Some(Value::String(iss)) if iss == expected_issuer.as_str() => jwt::Issuer::new(iss),
        _ => return Err(ClaimsError::IssuerMismatch),
    };

    let email = match claims.remove("email") {
        Some(Value::String(email)) => Email::new(email),
        _ => return Err(ClaimsError::MissingClaim("email")),
    };

    Ok(IdentityClaims { issuer, email })
}


#[cfg(test)]
mod tests {
    use aliri::Jwt;
    use color_eyre::Result;
    use serde_json::json;

    use super::{test_tokens::*, *};

    fn issuer() -> jwt::Issuer {
        jwt::Issuer::from_static(ISSUER)
    }

    #[test]
    fn extracts_email_from_matching_issuer() -> Result<()> {
        let token = token_for("alice@example.com");

        let claims = extract_claims(&token, &issuer())?;

        assert_eq!(claims.email().as_str(), "alice@example.com");
        assert_eq!(claims.issuer().as_str(), ISSUER);
        assert_eq!(claims.recipient_name().as_str(), "alice");
        Ok(())
    }

    #[test]
    fn rejects_too_few_sections() {
        let token = Jwt::from_static("eyJhbGciOiJub25lIn0.eyJpc3MiOiJ4In0");
        let err = extract_claims(&token, &issuer()).unwrap_err();
        assert!(err.is_malformed(), "{err:?}");
    }

    #[test]
    fn rejects_too_many_sections() {
        let valid = token_for("alice@example.com");
        let token = Jwt::new(format!("{}.extra", valid.as_str()));
        let err = extract_claims(&token, &issuer()).unwrap_err();
        assert!(err.is_malformed(), "{err:?}");
    }

    #[test]
    fn rejects_empty_token() {
        let err = extract_claims(&Jwt::from_static(""), &issuer()).unwrap_err();
        assert!(err.is_malformed(), "{err:?}");
    }

    #[test]
    fn rejects_payload_that_is_not_base64url() {
        let token = Jwt::from_static("eyJhbGciOiJub25lIn0.not*base64.c2ln");
        let err = extract_claims(&token, &issuer()).unwrap_err();
        assert!(err.is_malformed(), "{err:?}");
    }

    #[test]
    fn rejects_padded_payload() {
        let valid = token_for("bob@example.com");
        let mut parts: Vec<&str> = valid.as_str().split('.').collect();
        let padded = format!("{}==", parts[1]);
        parts[1] = &padded;
        let token = Jwt::new(parts.join("."));

        let err = extract_claims(&token, &issuer()).unwrap_err();
        assert!(err.is_malformed(), "{err:?}");
    }

    #[test]
    fn rejects_payload_that_is_not_a_json_object() {
        for payload in [
            json!(["iss", ISSUER]),
            json!([ISSUER, "mallory@example.com"]),
            json!("alice@example.com"),
            json!(null),
        ] {
            let token = token_with_payload(&payload);
            let err = extract_claims(&token, &issuer()).unwrap_err();
            assert!(err.is_malformed(), "{payload}: {err:?}");
        }
    }

    #[test]
    fn repeated_claims_take_the_last_value() -> Result<()> {
        let payload = format!(
            r#"{{"iss":"https://evil.example.com","iss":"{ISSUER}","email":"mallory@example.com","email":"dave@example.com"}}"#
        );
        let header = Base64Url::from_raw(br#"{"alg":"RS256"}"#.to_vec());
        let body = Base64Url::from_raw(payload.into_bytes());
        let token = Jwt::new(format!("{header}.{body}.c2lnbmF0dXJl"));

        let claims = extract_claims(&token, &issuer())?;

        assert_eq!(claims.issuer().as_str(), ISSUER);
        assert_eq!(claims.email().as_str(), "dave@example.com");
        Ok(())
    }

    #[test]
    fn rejects_other_issuer_regardless_of_email() {
        for payload in [
            json!({ "iss": "https://evil.example.com", "email": "alice@example.com" }),
            json!({ "iss": format!("{ISSUER}/"), "email": "alice@example.com" }),
            json!({ "iss": "https://evil.example.com" }),
            json!({ "email": "alice@example.com" }),
            json!({ "iss": 42, "email": "alice@example.com" }),
        ] {
            let token = token_with_payload(&payload);
            let err = extract_claims(&token, &issuer()).unwrap_err();
            assert!(err.is_issuer_mismatch(), "{payload}: {err:?}");
        }
    }

    #[test]
    fn rejects_missing_or_non_string_email() {
        for payload in [
            json!({ "iss": ISSUER }),
            json!({ "iss": ISSUER, "email": null }),
            json!({ "iss": ISSUER, "email": ["alice@example.com"] }),
        ] {
            let token = token_with_payload(&payload);
            let err = extract_claims(&token, &issuer()).unwrap_err();
            assert!(err.is_missing_claim(), "{payload}: {err:?}");
        }
    }

    #[test]
    fn ignores_signature_contents() -> Result<()> {
        let valid = token_for("carol@example.com");
        let (message, _) = valid.as_str().rsplit_once('.').unwrap();
        let token = Jwt::new(format!("{message}.!!not-a-signature!!"));

        let claims = extract_claims(&token, &issuer())?;

        assert_eq!(claims.email().as_str(), "carol@example.com");
        Ok(())
    }
}
