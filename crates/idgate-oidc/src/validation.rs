//! ID token validation with JWT signature verification.

use crate::errors::{OidcError, Result};
use crate::types::{IdTokenClaims, JwksKeySet};
use idgate_crypto::constant_time_compare;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

/// Clock skew tolerated on `exp`
pub const ID_TOKEN_LEEWAY_SECS: u64 = 60;

/// Verify an ID token against the provider key set.
///
/// Checks, in order: RS256 header, known `kid`, signature, `iss`, `aud`,
/// `exp` (with [`ID_TOKEN_LEEWAY_SECS`]), then `nonce` against the handshake
/// cookie. A missing expected nonce is a mismatch.
pub fn validate_id_token(
    id_token: &str,
    jwks: &JwksKeySet,
    issuer: &str,
    client_id: &str,
    expected_nonce: Option<&str>,
) -> Result<IdTokenClaims> {
    let header = decode_header(id_token)
        .map_err(|e| OidcError::InvalidIdToken(format!("Failed to decode header: {e}")))?;

    if header.alg != Algorithm::RS256 {
        return Err(OidcError::InvalidIdToken(format!(
            "unexpected algorithm {:?}",
            header.alg
        )));
    }

    let kid = header.kid.ok_or_else(|| OidcError::KeyNotFound {
        kid: "missing".to_string(),
    })?;

    let jwk = jwks
        .find_key(&kid)
        .ok_or_else(|| OidcError::KeyNotFound { kid: kid.clone() })?;

    if jwk.kty != "RSA" {
        return Err(OidcError::InvalidIdToken(format!(
            "key {kid} has type {}",
            jwk.kty
        )));
    }

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[client_id]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.leeway = ID_TOKEN_LEEWAY_SECS;

    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
        .map_err(|e| OidcError::InvalidIdToken(format!("Invalid RSA key: {e}")))?;

    let claims = decode::<IdTokenClaims>(id_token, &decoding_key, &validation)
        .map_err(|e| OidcError::InvalidIdToken(format!("JWT validation failed: {e}")))?
        .claims;

    let expected = expected_nonce.ok_or(OidcError::NonceMismatch)?;
    let token_nonce = claims.nonce.as_deref().ok_or(OidcError::NonceMismatch)?;

    if !constant_time_compare(token_nonce.as_bytes(), expected.as_bytes()) {
        return Err(OidcError::NonceMismatch);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id_token_claims, sign, sign_with_kid, test_jwks, CLIENT_ID, ISSUER};

    #[test]
    fn test_valid_token() {
        let token = sign(&id_token_claims("nonce-1"));
        let claims =
            validate_id_token(&token, &test_jwks(), ISSUER, CLIENT_ID, Some("nonce-1")).unwrap();
        assert_eq!(claims.sub, "subject-1");
        assert_eq!(claims.extra["nin"], "01019012345");
    }

    #[test]
    fn test_nonce_mismatch() {
        let token = sign(&id_token_claims("nonce-1"));
        let err = validate_id_token(&token, &test_jwks(), ISSUER, CLIENT_ID, Some("other"))
            .unwrap_err();
        assert!(matches!(err, OidcError::NonceMismatch));
    }

    #[test]
    fn test_missing_nonce_cookie() {
        let token = sign(&id_token_claims("nonce-1"));
        let err = validate_id_token(&token, &test_jwks(), ISSUER, CLIENT_ID, None).unwrap_err();
        assert!(matches!(err, OidcError::NonceMismatch));
    }

    #[test]
    fn test_missing_nonce_claim() {
        let mut claims = id_token_claims("nonce-1");
        claims.as_object_mut().unwrap().remove("nonce");
        let token = sign(&claims);
        let err = validate_id_token(&token, &test_jwks(), ISSUER, CLIENT_ID, Some("nonce-1"))
            .unwrap_err();
        assert!(matches!(err, OidcError::NonceMismatch));
    }

    #[test]
    fn test_wrong_issuer() {
        let mut claims = id_token_claims("n");
        claims["iss"] = "https://evil.test".into();
        let err = validate_id_token(&sign(&claims), &test_jwks(), ISSUER, CLIENT_ID, Some("n"))
            .unwrap_err();
        assert!(matches!(err, OidcError::InvalidIdToken(_)));
    }

    #[test]
    fn test_wrong_audience() {
        let mut claims = id_token_claims("n");
        claims["aud"] = "someone-else".into();
        let err = validate_id_token(&sign(&claims), &test_jwks(), ISSUER, CLIENT_ID, Some("n"))
            .unwrap_err();
        assert!(matches!(err, OidcError::InvalidIdToken(_)));
    }

    #[test]
    fn test_expired_beyond_leeway() {
        let mut claims = id_token_claims("n");
        let now = idgate_crypto::current_timestamp();
        claims["exp"] = (now - 120).into();
        let err = validate_id_token(&sign(&claims), &test_jwks(), ISSUER, CLIENT_ID, Some("n"))
            .unwrap_err();
        assert!(matches!(err, OidcError::InvalidIdToken(_)));
    }

    #[test]
    fn test_expired_within_leeway() {
        let mut claims = id_token_claims("n");
        let now = idgate_crypto::current_timestamp();
        claims["exp"] = (now - 10).into();
        assert!(
            validate_id_token(&sign(&claims), &test_jwks(), ISSUER, CLIENT_ID, Some("n")).is_ok()
        );
    }

    #[test]
    fn test_unknown_kid() {
        let token = sign_with_kid(&id_token_claims("n"), "rotated-key");
        let err = validate_id_token(&token, &test_jwks(), ISSUER, CLIENT_ID, Some("n"))
            .unwrap_err();
        assert!(matches!(err, OidcError::KeyNotFound { ref kid } if kid == "rotated-key"));
    }

    #[test]
    fn test_tampered_payload() {
        let token = sign(&id_token_claims("n"));
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = sign(&{
            let mut claims = id_token_claims("n");
            claims["nin"] = "99999999999".into();
            claims
        });
        let forged_payload = forged.split('.').nth(1).unwrap().to_string();
        parts[1] = &forged_payload;
        let spliced = parts.join(".");

        let err = validate_id_token(&spliced, &test_jwks(), ISSUER, CLIENT_ID, Some("n"))
            .unwrap_err();
        assert!(matches!(err, OidcError::InvalidIdToken(_)));
    }

    #[test]
    fn test_garbage_token() {
        let err = validate_id_token("not.a.jwt", &test_jwks(), ISSUER, CLIENT_ID, Some("n"))
            .unwrap_err();
        assert!(matches!(err, OidcError::InvalidIdToken(_)));
    }
}
