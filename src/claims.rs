//! Claims payloads and token-profile validation
//!
//! Two payload shapes are issued by this engine: OAuth2 access tokens and
//! OpenID Connect ID tokens. Both share a required-claims core (`iss`,
//! `sub`, `aud`, `exp`, `iat`); each adds its own conditional rules on
//! top. The validated claims are strongly typed, while arbitrary custom
//! claims ride along in an extension map that is only merged back in at
//! the encoding boundary.
//!
//! Validation happens against a profile — [`AccessTokenProfile`] or
//! [`IdTokenProfile`] — carrying the configuration the rules depend on:
//! the canonical issuer, the requesting client id, the nonce from the
//! originating request, and so on. Any violated rule yields a
//! [`ClaimsViolation`] naming the claim and rule, and no token is
//! produced.

use aliri_braid::braid;
use aliri_clock::{Clock, System, UnixTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ClaimsViolation;

/// An issuer of tokens
///
/// The canonical issuer URL: scheme and authority, no query string, no
/// fragment, trailing slash significant.
#[braid(serde, ref_doc = "A borrowed reference to an [`Issuer`]")]
pub struct Issuer;

/// The subject of a token
#[braid(serde, ref_doc = "A borrowed reference to a [`Subject`]")]
pub struct Subject;

/// An audience
#[braid(serde, ref_doc = "A borrowed reference to an [`Audience`]")]
pub struct Audience;

/// An OAuth2 client identifier
#[braid(serde, ref_doc = "A borrowed reference to a [`ClientId`]")]
pub struct ClientId;

/// A nonce binding a token to its originating authentication request
#[braid(serde, ref_doc = "A borrowed reference to a [`Nonce`]")]
pub struct Nonce;

/// A space-separated list of OAuth2 scope tokens
///
/// Passed through to the token unchanged; the engine does not interpret
/// individual scopes.
#[braid(serde, ref_doc = "A borrowed reference to a [`Scope`]")]
pub struct Scope;

/// Canonical issuer shape: scheme and authority, no query, no fragment.
static ISSUER_FORM: Lazy<Regex> = Lazy::new(|| Regex::new("^https?://[^?#]+$").unwrap());

/// A type representing one or more items, primarily for serialization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// A single item
    One(T),

    /// Zero or more items, to be serialized/deserialized as an array
    Many(Vec<T>),
}

/// A set of zero or more [`Audience`]s
///
/// Serializes as a bare string when it holds exactly one entry, matching
/// the ID token wire form; an access token's audience list is typed
/// separately as a plain sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany<Audience>", into = "OneOrMany<Audience>")]
#[repr(transparent)]
#[must_use]
pub struct Audiences(Vec<Audience>);

impl Audiences {
    /// An empty audience set
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// An audience set with a single audience
    #[inline]
    pub fn single(aud: impl Into<Audience>) -> Self {
        Self(vec![aud.into()])
    }

    /// Indicates whether the audience set is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of audiences in the set
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the given audience is a member of the set
    #[inline]
    #[must_use]
    pub fn contains(&self, aud: &AudienceRef) -> bool {
        self.0.iter().any(|a| &**a == aud)
    }

    /// Iterates through references to the audiences in the set
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &AudienceRef> {
        self.0.iter().map(AsRef::as_ref)
    }
}

impl From<OneOrMany<Audience>> for Audiences {
    #[inline]
    fn from(vals: OneOrMany<Audience>) -> Self {
        match vals {
            OneOrMany::One(x) => Self(vec![x]),
            OneOrMany::Many(v) => Self(v),
        }
    }
}

impl From<Audiences> for OneOrMany<Audience> {
    #[inline]
    fn from(mut vec: Audiences) -> Self {
        if vec.0.len() == 1 {
            Self::One(vec.0.pop().unwrap())
        } else {
            Self::Many(vec.0)
        }
    }
}

impl From<Vec<Audience>> for Audiences {
    #[inline]
    fn from(vals: Vec<Audience>) -> Self {
        Self(vals)
    }
}

impl From<Audience> for Audiences {
    #[inline]
    fn from(aud: Audience) -> Self {
        Self::single(aud)
    }
}

/// The claims payload of an OAuth2 access token
///
/// The audience is a plain sequence: the access token profile requires the
/// array form on the wire even for a single value, so a bare-string `aud`
/// does not deserialize into this type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct AccessTokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<Subject>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aud: Vec<Audience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<ClientId>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for AccessTokenClaims {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessTokenClaims {
    /// Constructs a new, empty payload
    pub fn new() -> Self {
        Self {
            iss: None,
            sub: None,
            aud: Vec::new(),
            exp: None,
            iat: None,
            scope: None,
            client_id: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the `iss` claim
    pub fn with_issuer(mut self, iss: impl Into<Issuer>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the `sub` claim
    pub fn with_subject(mut self, sub: impl Into<Subject>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the `aud` claim to a single audience
    pub fn with_audience(mut self, aud: impl Into<Audience>) -> Self {
        self.aud = vec![aud.into()];
        self
    }

    /// Sets the `aud` claim
    pub fn with_audiences(mut self, aud: impl Into<Vec<Audience>>) -> Self {
        self.aud = aud.into();
        self
    }

    /// Sets the `exp` claim
    pub fn with_expiration(mut self, time: UnixTime) -> Self {
        self.exp = Some(time);
        self
    }

    /// Sets the `exp` claim relative to the system clock
    pub fn with_future_expiration(self, secs: u64) -> Self {
        self.with_future_expiration_from_clock(secs, &System)
    }

    /// Sets the `exp` claim relative to the specified clock
    pub fn with_future_expiration_from_clock<C: Clock>(mut self, secs: u64, clock: &C) -> Self {
        let n = clock.now();
        self.exp = Some(UnixTime(n.0 + secs));
        self
    }

    /// Sets the `iat` claim
    pub fn with_issued_at(mut self, time: UnixTime) -> Self {
        self.iat = Some(time);
        self
    }

    /// Sets the `scope` claim
    pub fn with_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the `client_id` claim
    pub fn with_client_id(mut self, client_id: impl Into<ClientId>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Attaches a custom claim, passed through without validation
    pub fn with_claim(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// The `iss` claim
    #[must_use]
    pub fn iss(&self) -> Option<&IssuerRef> {
        self.iss.as_deref()
    }

    /// The `sub` claim
    #[must_use]
    pub fn sub(&self) -> Option<&SubjectRef> {
        self.sub.as_deref()
    }

    /// The `aud` claim
    #[must_use]
    pub fn aud(&self) -> &[Audience] {
        &self.aud
    }

    /// The `exp` claim
    #[must_use]
    pub fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    /// The `iat` claim
    #[must_use]
    pub fn iat(&self) -> Option<UnixTime> {
        self.iat
    }

    /// The `scope` claim
    #[must_use]
    pub fn scope(&self) -> Option<&ScopeRef> {
        self.scope.as_deref()
    }

    /// The `client_id` claim
    #[must_use]
    pub fn client_id(&self) -> Option<&ClientIdRef> {
        self.client_id.as_deref()
    }

    /// A custom claim by name
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}

/// The claims payload of an OpenID Connect ID token
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct IdTokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<Issuer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<Subject>,
    #[serde(default, skip_serializing_if = "Audiences::is_empty")]
    aud: Audiences,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_time: Option<UnixTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<Nonce>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    acr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amr: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    azp: Option<ClientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    at_hash: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for IdTokenClaims {
    fn default() -> Self {
        Self::new()
    }
}

impl IdTokenClaims {
    /// Constructs a new, empty payload
    pub fn new() -> Self {
        Self {
            iss: None,
            sub: None,
            aud: Audiences::empty(),
            exp: None,
            iat: None,
            auth_time: None,
            nonce: None,
            acr: None,
            amr: None,
            azp: None,
            at_hash: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the `iss` claim
    pub fn with_issuer(mut self, iss: impl Into<Issuer>) -> Self {
        self.iss = Some(iss.into());
        self
    }

    /// Sets the `sub` claim
    pub fn with_subject(mut self, sub: impl Into<Subject>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the `aud` claim to a single audience
    pub fn with_audience(mut self, aud: impl Into<Audience>) -> Self {
        self.aud = Audiences::single(aud);
        self
    }

    /// Sets the `aud` claim, where multiple audiences are allowed
    pub fn with_audiences(mut self, aud: impl Into<Audiences>) -> Self {
        self.aud = aud.into();
        self
    }

    /// Sets the `exp` claim
    pub fn with_expiration(mut self, time: UnixTime) -> Self {
        self.exp = Some(time);
        self
    }

    /// Sets the `exp` claim relative to the system clock
    pub fn with_future_expiration(self, secs: u64) -> Self {
        self.with_future_expiration_from_clock(secs, &System)
    }

    /// Sets the `exp` claim relative to the specified clock
    pub fn with_future_expiration_from_clock<C: Clock>(mut self, secs: u64, clock: &C) -> Self {
        let n = clock.now();
        self.exp = Some(UnixTime(n.0 + secs));
        self
    }

    /// Sets the `iat` claim
    pub fn with_issued_at(mut self, time: UnixTime) -> Self {
        self.iat = Some(time);
        self
    }

    /// Sets the `auth_time` claim
    pub fn with_auth_time(mut self, time: UnixTime) -> Self {
        self.auth_time = Some(time);
        self
    }

    /// Sets the `nonce` claim
    pub fn with_nonce(mut self, nonce: impl Into<Nonce>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Sets the `acr` claim
    pub fn with_acr(mut self, acr: impl Into<String>) -> Self {
        self.acr = Some(acr.into());
        self
    }

    /// Sets the `amr` claim
    pub fn with_amr(mut self, amr: Vec<String>) -> Self {
        self.amr = Some(amr);
        self
    }

    /// Sets the `azp` claim
    pub fn with_authorized_party(mut self, azp: impl Into<ClientId>) -> Self {
        self.azp = Some(azp.into());
        self
    }

    /// Sets the `at_hash` claim
    pub fn with_access_token_hash(mut self, at_hash: impl Into<String>) -> Self {
        self.at_hash = Some(at_hash.into());
        self
    }

    /// Attaches a custom claim, passed through without validation
    pub fn with_claim(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// The `iss` claim
    #[must_use]
    pub fn iss(&self) -> Option<&IssuerRef> {
        self.iss.as_deref()
    }

    /// The `sub` claim
    #[must_use]
    pub fn sub(&self) -> Option<&SubjectRef> {
        self.sub.as_deref()
    }

    /// The `aud` claim
    pub fn aud(&self) -> &Audiences {
        &self.aud
    }

    /// The `exp` claim
    #[must_use]
    pub fn exp(&self) -> Option<UnixTime> {
        self.exp
    }

    /// The `iat` claim
    #[must_use]
    pub fn iat(&self) -> Option<UnixTime> {
        self.iat
    }

    /// The `auth_time` claim
    #[must_use]
    pub fn auth_time(&self) -> Option<UnixTime> {
        self.auth_time
    }

    /// The `nonce` claim
    #[must_use]
    pub fn nonce(&self) -> Option<&NonceRef> {
        self.nonce.as_deref()
    }

    /// The `azp` claim
    #[must_use]
    pub fn azp(&self) -> Option<&ClientIdRef> {
        self.azp.as_deref()
    }

    /// The `at_hash` claim
    #[must_use]
    pub fn at_hash(&self) -> Option<&str> {
        self.at_hash.as_deref()
    }

    /// A custom claim by name
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&serde_json::Value> {
        self.extra.get(name)
    }
}

/// Whether `azp` may appear when `aud` holds exactly one entry
///
/// The claim is always required (and checked against the client id) when
/// `aud` has more than one entry; profiles differ only on the single-entry
/// case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AzpPolicy {
    /// `azp` may be present alongside a single audience, but must still
    /// equal the requesting client id
    #[default]
    Allowed,

    /// `azp` must be absent when `aud` holds a single entry
    Forbidden,
}

/// Validation profile for OAuth2 access tokens
#[derive(Clone, Debug)]
#[must_use]
pub struct AccessTokenProfile {
    issuer: Issuer,
}

impl AccessTokenProfile {
    /// Constructs a profile for tokens from the given issuer
    pub fn new(issuer: impl Into<Issuer>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Validates a payload against this profile using the system clock
    ///
    /// # Errors
    ///
    /// Returns the first violated claim rule.
    pub fn validate(&self, claims: &AccessTokenClaims) -> Result<(), ClaimsViolation> {
        self.validate_with_clock(claims, &System)
    }

    /// Validates a payload against this profile using the specified clock
    ///
    /// # Errors
    ///
    /// Returns the first violated claim rule.
    pub fn validate_with_clock<C: Clock>(
        &self,
        claims: &AccessTokenClaims,
        clock: &C,
    ) -> Result<(), ClaimsViolation> {
        validate_issuer(claims.iss(), &self.issuer)?;

        let sub = claims
            .sub()
            .ok_or(ClaimsViolation::MissingRequiredClaim("sub"))?;
        if sub.as_str().is_empty() {
            return Err(ClaimsViolation::EmptySubject);
        }

        if claims.aud.is_empty() {
            return Err(ClaimsViolation::MissingRequiredClaim("aud"));
        }

        validate_times(claims.exp, claims.iat, clock)
    }
}

/// Validation profile for OpenID Connect ID tokens
#[derive(Clone, Debug)]
#[must_use]
pub struct IdTokenProfile {
    issuer: Issuer,
    client_id: ClientId,
    expected_nonce: Option<Nonce>,
    require_auth_time: bool,
    azp_policy: AzpPolicy,
}

impl IdTokenProfile {
    /// Constructs a profile for tokens from the given issuer, minted for
    /// the given requesting client
    pub fn new(issuer: impl Into<Issuer>, client_id: impl Into<ClientId>) -> Self {
        Self {
            issuer: issuer.into(),
            client_id: client_id.into(),
            expected_nonce: None,
            require_auth_time: false,
            azp_policy: AzpPolicy::default(),
        }
    }

    /// Requires the token to carry the nonce from the originating request
    pub fn with_expected_nonce(self, nonce: impl Into<Nonce>) -> Self {
        Self {
            expected_nonce: Some(nonce.into()),
            ..self
        }
    }

    /// Requires the `auth_time` claim
    ///
    /// Set when the originating request specified a maximum authentication
    /// age or requested `auth_time` as essential.
    pub fn require_auth_time(self) -> Self {
        Self {
            require_auth_time: true,
            ..self
        }
    }

    /// Governs `azp` when `aud` holds exactly one entry
    pub fn with_azp_policy(self, azp_policy: AzpPolicy) -> Self {
        Self { azp_policy, ..self }
    }

    /// Validates a payload against this profile using the system clock
    ///
    /// # Errors
    ///
    /// Returns the first violated claim rule.
    pub fn validate(&self, claims: &IdTokenClaims) -> Result<(), ClaimsViolation> {
        self.validate_with_clock(claims, &System)
    }

    /// Validates a payload against this profile using the specified clock
    ///
    /// # Errors
    ///
    /// Returns the first violated claim rule.
    pub fn validate_with_clock<C: Clock>(
        &self,
        claims: &IdTokenClaims,
        clock: &C,
    ) -> Result<(), ClaimsViolation> {
        validate_issuer(claims.iss(), &self.issuer)?;

        let sub = claims
            .sub()
            .ok_or(ClaimsViolation::MissingRequiredClaim("sub"))?;
        if sub.as_str().is_empty() {
            return Err(ClaimsViolation::EmptySubject);
        }
        if !sub.as_str().is_ascii() || sub.as_str().len() > 255 {
            return Err(ClaimsViolation::SubjectTooLong);
        }

        if claims.aud.is_empty() {
            return Err(ClaimsViolation::MissingRequiredClaim("aud"));
        }
        if !claims
            .aud
            .contains(AudienceRef::from_str(self.client_id.as_str()))
        {
            return Err(ClaimsViolation::AudienceMissingClientId);
        }

        validate_times(claims.exp, claims.iat, clock)?;

        if let Some(expected) = &self.expected_nonce {
            match claims.nonce() {
                None => return Err(ClaimsViolation::MissingRequiredClaim("nonce")),
                Some(nonce) if nonce != &**expected => return Err(ClaimsViolation::NonceMismatch),
                Some(_) => {}
            }
        }

        if self.require_auth_time && claims.auth_time.is_none() {
            return Err(ClaimsViolation::MissingRequiredClaim("auth_time"));
        }

        if claims.aud.len() > 1 {
            match claims.azp() {
                None => return Err(ClaimsViolation::MissingRequiredClaim("azp")),
                Some(azp) if azp != &*self.client_id => {
                    return Err(ClaimsViolation::AuthorizedPartyMismatch)
                }
                Some(_) => {}
            }
        } else if let Some(azp) = claims.azp() {
            match self.azp_policy {
                AzpPolicy::Forbidden => return Err(ClaimsViolation::UnexpectedAuthorizedParty),
                AzpPolicy::Allowed if azp != &*self.client_id => {
                    return Err(ClaimsViolation::AuthorizedPartyMismatch)
                }
                AzpPolicy::Allowed => {}
            }
        }

        Ok(())
    }
}

fn validate_issuer(
    iss: Option<&IssuerRef>,
    expected: &IssuerRef,
) -> Result<(), ClaimsViolation> {
    let iss = iss.ok_or(ClaimsViolation::MissingRequiredClaim("iss"))?;

    if !ISSUER_FORM.is_match(iss.as_str()) {
        return Err(ClaimsViolation::MalformedIssuer);
    }

    if iss != expected {
        return Err(ClaimsViolation::IssuerMismatch);
    }

    Ok(())
}

fn validate_times<C: Clock>(
    exp: Option<UnixTime>,
    iat: Option<UnixTime>,
    clock: &C,
) -> Result<(), ClaimsViolation> {
    let exp = exp.ok_or(ClaimsViolation::MissingRequiredClaim("exp"))?;
    let iat = iat.ok_or(ClaimsViolation::MissingRequiredClaim("iat"))?;

    if exp.0 <= iat.0 {
        return Err(ClaimsViolation::ExpirationNotAfterIssuedAt);
    }

    if exp.0 <= clock.now().0 {
        return Err(ClaimsViolation::TokenExpired);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use aliri_clock::TestClock;
    use color_eyre::Result;

    use super::*;

    const ISSUER: &str = "https://issuer.example.com/";
    const CLIENT: &str = "s6BhdRkqt3";

    fn clock() -> TestClock {
        TestClock::new(UnixTime(1_700_000_000))
    }

    fn valid_access_claims() -> AccessTokenClaims {
        AccessTokenClaims::new()
            .with_issuer(ISSUER)
            .with_subject("user-1234")
            .with_audience("https://api.example.com")
            .with_issued_at(UnixTime(1_700_000_000))
            .with_expiration(UnixTime(1_700_000_600))
    }

    fn valid_id_claims() -> IdTokenClaims {
        IdTokenClaims::new()
            .with_issuer(ISSUER)
            .with_subject("user-1234")
            .with_audience(CLIENT)
            .with_issued_at(UnixTime(1_700_000_000))
            .with_expiration(UnixTime(1_700_000_600))
    }

    fn access_profile() -> AccessTokenProfile {
        AccessTokenProfile::new(ISSUER)
    }

    fn id_profile() -> IdTokenProfile {
        IdTokenProfile::new(ISSUER, CLIENT)
    }

    #[test]
    fn accepts_a_well_formed_access_token_payload() -> Result<()> {
        access_profile().validate_with_clock(&valid_access_claims(), &clock())?;
        Ok(())
    }

    #[test]
    fn accepts_a_well_formed_id_token_payload() -> Result<()> {
        id_profile().validate_with_clock(&valid_id_claims(), &clock())?;
        Ok(())
    }

    #[test]
    fn each_missing_required_claim_is_named() {
        let cases: Vec<(&str, AccessTokenClaims)> = vec![
            (
                "iss",
                AccessTokenClaims::new()
                    .with_subject("user")
                    .with_audience("api")
                    .with_issued_at(UnixTime(1))
                    .with_expiration(UnixTime(2)),
            ),
            (
                "sub",
                AccessTokenClaims::new()
                    .with_issuer(ISSUER)
                    .with_audience("api")
                    .with_issued_at(UnixTime(1))
                    .with_expiration(UnixTime(2)),
            ),
            (
                "aud",
                AccessTokenClaims::new()
                    .with_issuer(ISSUER)
                    .with_subject("user")
                    .with_issued_at(UnixTime(1))
                    .with_expiration(UnixTime(2)),
            ),
            (
                "exp",
                AccessTokenClaims::new()
                    .with_issuer(ISSUER)
                    .with_subject("user")
                    .with_audience("api")
                    .with_issued_at(UnixTime(1)),
            ),
            (
                "iat",
                AccessTokenClaims::new()
                    .with_issuer(ISSUER)
                    .with_subject("user")
                    .with_audience("api")
                    .with_expiration(UnixTime(2)),
            ),
        ];

        for (claim, claims) in cases {
            let err = access_profile()
                .validate_with_clock(&claims, &clock())
                .unwrap_err();
            match err {
                ClaimsViolation::MissingRequiredClaim(named) => assert_eq!(named, claim),
                other => panic!("expected missing {} violation, got {}", claim, other),
            }
        }
    }

    #[test]
    fn issuer_with_query_string_is_rejected() {
        let claims = valid_access_claims().with_issuer("https://issuer.example.com/?x=1");
        let err = access_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::MalformedIssuer));
    }

    #[test]
    fn issuer_with_fragment_is_rejected() {
        let claims = valid_access_claims().with_issuer("https://issuer.example.com/#frag");
        let err = access_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::MalformedIssuer));
    }

    #[test]
    fn issuer_with_trailing_slash_mismatch_is_rejected() {
        let claims = valid_access_claims().with_issuer("https://issuer.example.com");
        let err = access_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::IssuerMismatch));
    }

    #[test]
    fn issuer_with_scheme_mismatch_is_rejected() {
        let claims = valid_access_claims().with_issuer("http://issuer.example.com/");
        let err = access_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::IssuerMismatch));
    }

    #[test]
    fn empty_subject_is_rejected() {
        let claims = valid_access_claims().with_subject("");
        let err = access_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::EmptySubject));
    }

    #[test]
    fn expiration_must_exceed_issued_at() {
        let claims = valid_access_claims()
            .with_issued_at(UnixTime(1_700_000_600))
            .with_expiration(UnixTime(1_700_000_600));
        let err = access_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::ExpirationNotAfterIssuedAt));
    }

    #[test]
    fn expiration_in_the_past_is_rejected() {
        let claims = valid_access_claims()
            .with_issued_at(UnixTime(1_600_000_000))
            .with_expiration(UnixTime(1_600_000_600));
        let err = access_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::TokenExpired));
    }

    #[test]
    fn access_token_audience_must_be_array_form() {
        let err = serde_json::from_str::<AccessTokenClaims>(r#"{"aud": "https://api"}"#);
        assert!(err.is_err());

        let claims: AccessTokenClaims =
            serde_json::from_str(r#"{"aud": ["https://api"]}"#).unwrap();
        assert_eq!(claims.aud().len(), 1);
    }

    #[test]
    fn access_token_subject_has_no_length_cap() -> Result<()> {
        let long = "x".repeat(1000);
        let claims = valid_access_claims().with_subject(long);
        access_profile().validate_with_clock(&claims, &clock())?;
        Ok(())
    }

    #[test]
    fn id_token_subject_capped_at_255_ascii() {
        let long = "x".repeat(256);
        let claims = valid_id_claims().with_subject(long);
        let err = id_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::SubjectTooLong));

        let claims = valid_id_claims().with_subject("ユーザー");
        let err = id_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::SubjectTooLong));
    }

    #[test]
    fn id_token_subject_at_cap_is_accepted() -> Result<()> {
        let claims = valid_id_claims().with_subject("x".repeat(255));
        id_profile().validate_with_clock(&claims, &clock())?;
        Ok(())
    }

    #[test]
    fn id_token_audience_accepts_string_or_array() {
        let claims: IdTokenClaims = serde_json::from_str(r#"{"aud": "client"}"#).unwrap();
        assert_eq!(claims.aud().len(), 1);

        let claims: IdTokenClaims =
            serde_json::from_str(r#"{"aud": ["client", "other"]}"#).unwrap();
        assert_eq!(claims.aud().len(), 2);
    }

    #[test]
    fn id_token_audience_must_contain_the_client_id() {
        let claims = valid_id_claims().with_audience("someone-else");
        let err = id_profile()
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::AudienceMissingClientId));
    }

    #[test]
    fn nonce_must_match_the_originating_request() -> Result<()> {
        let profile = id_profile().with_expected_nonce("n-0S6_WzA2Mj");

        let err = profile
            .validate_with_clock(&valid_id_claims(), &clock())
            .unwrap_err();
        assert!(matches!(
            err,
            ClaimsViolation::MissingRequiredClaim("nonce")
        ));

        let claims = valid_id_claims().with_nonce("different");
        let err = profile.validate_with_clock(&claims, &clock()).unwrap_err();
        assert!(matches!(err, ClaimsViolation::NonceMismatch));

        let claims = valid_id_claims().with_nonce("n-0S6_WzA2Mj");
        profile.validate_with_clock(&claims, &clock())?;
        Ok(())
    }

    #[test]
    fn absent_nonce_in_request_and_token_is_valid() -> Result<()> {
        id_profile().validate_with_clock(&valid_id_claims(), &clock())?;
        Ok(())
    }

    #[test]
    fn auth_time_required_only_when_requested() -> Result<()> {
        let err = id_profile()
            .require_auth_time()
            .validate_with_clock(&valid_id_claims(), &clock())
            .unwrap_err();
        assert!(matches!(
            err,
            ClaimsViolation::MissingRequiredClaim("auth_time")
        ));

        let claims = valid_id_claims().with_auth_time(UnixTime(1_699_999_000));
        id_profile()
            .require_auth_time()
            .validate_with_clock(&claims, &clock())?;

        id_profile().validate_with_clock(&valid_id_claims(), &clock())?;
        Ok(())
    }

    #[test]
    fn multiple_audiences_require_a_matching_azp() -> Result<()> {
        let multi = valid_id_claims().with_audiences(vec![
            Audience::from(CLIENT),
            Audience::from("https://rp.example.com"),
        ]);

        let err = id_profile()
            .validate_with_clock(&multi, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::MissingRequiredClaim("azp")));

        let wrong = multi.clone().with_authorized_party("someone-else");
        let err = id_profile()
            .validate_with_clock(&wrong, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::AuthorizedPartyMismatch));

        let right = multi.with_authorized_party(CLIENT);
        id_profile().validate_with_clock(&right, &clock())?;
        Ok(())
    }

    #[test]
    fn single_audience_azp_follows_the_configured_policy() -> Result<()> {
        let claims = valid_id_claims().with_authorized_party(CLIENT);
        id_profile().validate_with_clock(&claims, &clock())?;

        let err = id_profile()
            .with_azp_policy(AzpPolicy::Forbidden)
            .validate_with_clock(&claims, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::UnexpectedAuthorizedParty));

        let mismatched = valid_id_claims().with_authorized_party("someone-else");
        let err = id_profile()
            .validate_with_clock(&mismatched, &clock())
            .unwrap_err();
        assert!(matches!(err, ClaimsViolation::AuthorizedPartyMismatch));
        Ok(())
    }

    #[test]
    fn single_audience_serializes_as_a_bare_string_for_id_tokens() -> Result<()> {
        let value = serde_json::to_value(&valid_id_claims())?;
        assert_eq!(value["aud"], CLIENT);
        Ok(())
    }

    #[test]
    fn single_audience_serializes_as_an_array_for_access_tokens() -> Result<()> {
        let value = serde_json::to_value(&valid_access_claims())?;
        assert_eq!(value["aud"], serde_json::json!(["https://api.example.com"]));
        Ok(())
    }

    #[test]
    fn custom_claims_pass_through_unvalidated() -> Result<()> {
        let claims = valid_access_claims()
            .with_scope("openid profile email")
            .with_client_id(CLIENT)
            .with_claim("permissions", serde_json::json!(["read", "write"]));

        access_profile().validate_with_clock(&claims, &clock())?;

        let value = serde_json::to_value(&claims)?;
        assert_eq!(value["scope"], "openid profile email");
        assert_eq!(value["client_id"], CLIENT);
        assert_eq!(value["permissions"], serde_json::json!(["read", "write"]));
        Ok(())
    }

    #[test]
    fn profile_claims_round_trip_through_serialization() -> Result<()> {
        let claims = valid_id_claims()
            .with_nonce("n-0S6_WzA2Mj")
            .with_acr("urn:mace:incommon:iap:silver")
            .with_amr(vec!["pwd".into(), "otp".into()])
            .with_claim("name", "Jane Doe")
            .with_claim("email", "jane@example.com")
            .with_claim("email_verified", true);

        let restored: IdTokenClaims = serde_json::from_str(&serde_json::to_string(&claims)?)?;
        assert_eq!(restored, claims);
        Ok(())
    }
}
