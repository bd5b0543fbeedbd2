//! Token issuance
//!
//! The two entry points — [`AccessTokenIssuer`] and [`IdTokenIssuer`] —
//! run the same pipeline and differ only in which claims profile applies:
//! validate the payload, read the algorithm bound to the signing key,
//! build the JOSE header, then encode and sign into the compact form.
//! Validation always completes before any signing work begins; no token
//! is produced on any violation.

use serde::Serialize;

use crate::{
    claims::{AccessTokenClaims, AccessTokenProfile, IdTokenClaims, IdTokenProfile},
    digest,
    error::{self, IssueError},
    jwt::{Headers, Jwt, JwtRef},
    Jwk,
};

/// Issues OAuth2 access tokens
#[derive(Clone, Debug)]
#[must_use]
pub struct AccessTokenIssuer {
    profile: AccessTokenProfile,
}

impl AccessTokenIssuer {
    /// Constructs an issuer validating against the given profile
    pub fn new(profile: AccessTokenProfile) -> Self {
        Self { profile }
    }

    /// Issues a signed access token for the given payload
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsViolation`][error::ClaimsViolation] if the payload
    /// breaks any profile rule, or a signing error if the key cannot
    /// produce the token.
    pub fn issue(&self, claims: &AccessTokenClaims, key: &Jwk) -> Result<Jwt, IssueError> {
        self.profile.validate(claims).map_err(|violation| {
            tracing::debug!(%violation, "access token payload rejected");
            violation
        })?;

        issue_signed(claims, key)
    }
}

/// Issues OpenID Connect ID tokens
#[derive(Clone, Debug)]
#[must_use]
pub struct IdTokenIssuer {
    profile: IdTokenProfile,
}

impl IdTokenIssuer {
    /// Constructs an issuer validating against the given profile
    pub fn new(profile: IdTokenProfile) -> Self {
        Self { profile }
    }

    /// Issues a signed ID token for the given payload
    ///
    /// # Errors
    ///
    /// Returns [`ClaimsViolation`][error::ClaimsViolation] if the payload
    /// breaks any profile rule, or a signing error if the key cannot
    /// produce the token.
    pub fn issue(&self, claims: &IdTokenClaims, key: &Jwk) -> Result<Jwt, IssueError> {
        self.profile.validate(claims).map_err(|violation| {
            tracing::debug!(%violation, "ID token payload rejected");
            violation
        })?;

        issue_signed(claims, key)
    }

    /// Issues a signed ID token bound to a co-issued access token
    ///
    /// Derives the `at_hash` claim from the access token using the digest
    /// bound to this ID token's own signing algorithm. If the payload
    /// already carries an `at_hash`, it must equal the derived value.
    ///
    /// # Errors
    ///
    /// As for [`issue`][Self::issue]; additionally fails with a
    /// [`ClaimsViolation`][error::ClaimsViolation] if a caller-supplied
    /// `at_hash` disagrees with the bound access token.
    pub fn issue_bound(
        &self,
        claims: &IdTokenClaims,
        key: &Jwk,
        access_token: &JwtRef,
    ) -> Result<Jwt, IssueError> {
        let derived = digest::access_token_hash(access_token, key.algorithm());

        let claims = match claims.at_hash() {
            Some(existing) if existing != derived => {
                tracing::debug!("ID token payload rejected: at_hash mismatch");
                return Err(error::ClaimsViolation::AccessTokenHashMismatch.into());
            }
            Some(_) => claims.clone(),
            None => claims.clone().with_access_token_hash(derived),
        };

        self.profile.validate(&claims).map_err(|violation| {
            tracing::debug!(%violation, "ID token payload rejected");
            violation
        })?;

        issue_signed(&claims, key)
    }
}

/// The shared assembly tail: header from the key's bound algorithm, then
/// encode, sign, and serialize.
fn issue_signed<P: Serialize>(payload: &P, key: &Jwk) -> Result<Jwt, IssueError> {
    let alg = key.algorithm();

    let headers = match key.key_id() {
        Some(kid) => Headers::with_key_id(alg, kid.to_owned()),
        None => Headers::new(alg),
    };

    let token = Jwt::try_from_parts_with_signature(&headers, payload, key)?;

    tracing::trace!(%alg, "token issued");

    Ok(token)
}

#[cfg(test)]
mod tests {
    use aliri_base64::Base64Url;
    use aliri_clock::{Clock, System, UnixTime};
    use color_eyre::Result;

    use super::*;
    use crate::{claims::Audience, jwa};

    const ISSUER: &str = "https://issuer.example.com/";
    const CLIENT: &str = "s6BhdRkqt3";

    fn rsa_key() -> Result<Jwk> {
        Ok(Jwk::from(jwa::Rsa::generate()?).with_key_id("test-key"))
    }

    fn access_claims() -> AccessTokenClaims {
        AccessTokenClaims::new()
            .with_issuer(ISSUER)
            .with_subject("user-1234")
            .with_audience("https://api.example.com")
            .with_issued_at(System.now())
            .with_future_expiration(300)
            .with_scope("openid profile")
            .with_client_id(CLIENT)
    }

    fn id_claims() -> IdTokenClaims {
        IdTokenClaims::new()
            .with_issuer(ISSUER)
            .with_subject("user-1234")
            .with_audience(CLIENT)
            .with_issued_at(System.now())
            .with_future_expiration(300)
    }

    fn decode_segment(segment: &str) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(
            Base64Url::from_encoded(segment)?.as_slice(),
        )?)
    }

    #[test]
    fn access_tokens_are_three_clean_base64url_segments() -> Result<()> {
        let issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));
        let token = issuer.issue(&access_claims(), &rsa_key()?)?;

        let segments: Vec<&str> = token.as_str().split('.').collect();
        assert_eq!(segments.len(), 3);
        for segment in segments {
            assert!(!segment.is_empty());
            assert!(!segment.contains(|c| c == '+' || c == '/' || c == '='));
        }
        Ok(())
    }

    #[test]
    fn decoded_token_reproduces_the_declared_claims() -> Result<()> {
        let issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));
        let claims = access_claims().with_claim("permissions", serde_json::json!(["read"]));
        let token = issuer.issue(&claims, &rsa_key()?)?;

        let segments: Vec<&str> = token.as_str().split('.').collect();

        let header = decode_segment(segments[0])?;
        assert_eq!(
            header,
            serde_json::json!({"alg": "RS256", "typ": "JWT", "kid": "test-key"})
        );

        let payload = decode_segment(segments[1])?;
        assert_eq!(payload, serde_json::to_value(&claims)?);
        Ok(())
    }

    #[test]
    fn tokens_for_different_subjects_differ() -> Result<()> {
        let issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));
        let key = rsa_key()?;

        let iat = System.now();
        let exp = UnixTime(iat.0 + 300);
        let base = AccessTokenClaims::new()
            .with_issuer(ISSUER)
            .with_audience("https://api.example.com")
            .with_issued_at(iat)
            .with_expiration(exp);

        let one = issuer.issue(&base.clone().with_subject("alice"), &key)?;
        let two = issuer.issue(&base.with_subject("bob"), &key)?;

        assert_ne!(one, two);
        Ok(())
    }

    #[test]
    fn no_token_is_produced_on_a_claims_violation() -> Result<()> {
        let issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));
        let claims = access_claims().with_issuer("https://intruder.example.com/");

        let err = issuer.issue(&claims, &rsa_key()?).unwrap_err();
        assert!(err.is_claims_violation());
        Ok(())
    }

    #[test]
    fn id_tokens_issue_with_an_ec_key() -> Result<()> {
        let key = Jwk::from(jwa::EllipticCurve::generate(jwa::ec::Curve::P256)?);
        let issuer = IdTokenIssuer::new(IdTokenProfile::new(ISSUER, CLIENT));

        let token = issuer.issue(&id_claims(), &key)?;

        let segments: Vec<&str> = token.as_str().split('.').collect();
        let header = decode_segment(segments[0])?;
        assert_eq!(header["alg"], "ES256");

        let message_len = token.as_str().rfind('.').unwrap();
        let signature = Base64Url::from_encoded(&token.as_str()[message_len + 1..])?;
        key.verify(token.as_str()[..message_len].as_bytes(), signature.as_slice())?;
        Ok(())
    }

    #[test]
    fn bound_id_tokens_carry_a_correct_at_hash() -> Result<()> {
        let key = rsa_key()?;

        let access_issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));
        let access_token = access_issuer.issue(&access_claims(), &key)?;

        let id_issuer = IdTokenIssuer::new(IdTokenProfile::new(ISSUER, CLIENT));
        let id_token = id_issuer.issue_bound(&id_claims(), &key, &access_token)?;

        let segments: Vec<&str> = id_token.as_str().split('.').collect();
        let payload = decode_segment(segments[1])?;

        let expected = digest::access_token_hash(&access_token, key.algorithm());
        assert_eq!(payload["at_hash"], serde_json::Value::from(expected));
        Ok(())
    }

    #[test]
    fn mismatched_caller_supplied_at_hash_is_rejected() -> Result<()> {
        let key = rsa_key()?;

        let access_issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));
        let access_token = access_issuer.issue(&access_claims(), &key)?;

        let id_issuer = IdTokenIssuer::new(IdTokenProfile::new(ISSUER, CLIENT));
        let claims = id_claims().with_access_token_hash("bm90LXRoZS1yaWdodC1oYXNo");

        let err = id_issuer
            .issue_bound(&claims, &key, &access_token)
            .unwrap_err();
        assert!(err.is_claims_violation());
        Ok(())
    }

    #[test]
    fn matching_caller_supplied_at_hash_is_accepted() -> Result<()> {
        let key = rsa_key()?;

        let access_issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));
        let access_token = access_issuer.issue(&access_claims(), &key)?;

        let id_issuer = IdTokenIssuer::new(IdTokenProfile::new(ISSUER, CLIENT));
        let claims = id_claims()
            .with_access_token_hash(digest::access_token_hash(&access_token, key.algorithm()));

        let _ = id_issuer.issue_bound(&claims, &key, &access_token)?;
        Ok(())
    }

    #[test]
    fn multi_audience_id_token_without_azp_is_refused() -> Result<()> {
        let key = rsa_key()?;
        let id_issuer = IdTokenIssuer::new(IdTokenProfile::new(ISSUER, CLIENT));

        let claims = id_claims().with_audiences(vec![
            Audience::from(CLIENT),
            Audience::from("https://rp.example.com"),
        ]);

        let err = id_issuer.issue(&claims, &key).unwrap_err();
        assert!(err.is_claims_violation());
        Ok(())
    }

    #[test]
    fn signing_with_a_verification_only_key_fails() -> Result<()> {
        let key = rsa_key()?.public_only();
        let issuer = AccessTokenIssuer::new(AccessTokenProfile::new(ISSUER));

        let err = issuer.issue(&access_claims(), &key).unwrap_err();
        assert!(matches!(err, IssueError::Signing(_)));
        Ok(())
    }
}
