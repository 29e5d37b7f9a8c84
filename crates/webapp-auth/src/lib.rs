//! Verification of the signed session payload ("init data") that the host
//! messaging platform hands to embedded web apps.
//!
//! The payload is a form-encoded list of fields plus a `hash` field. The
//! expected hash is `HMAC-SHA256(check_string)` keyed by
//! `HMAC-SHA256("WebAppData" as key, bot_token)`, rendered as lowercase hex.

use hmac::{Hmac, Mac};
use pet_domain::{PlayerId, derive_display_name};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_FIELD: &str = "hash";
pub const USER_FIELD: &str = "user";
pub const AUTH_DATE_FIELD: &str = "auth_date";

const WEB_APP_KEY_LABEL: &[u8] = b"WebAppData";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("shared secret is missing")]
    MissingSecret,
    #[error("payload is empty")]
    EmptyPayload,
    #[error("payload has no hash field")]
    MissingHash,
    #[error("signature verification failed")]
    SignatureMismatch,
    #[error("invalid hmac key length")]
    InvalidKeyLength,
}

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("payload has no user field")]
    MissingUserField,
    #[error("malformed user field: {0}")]
    MalformedUser(#[from] serde_json::Error),
}

/// A payload split into its signed fields and the presented signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitDataFields {
    pub fields: Vec<(String, String)>,
    pub hash: Option<String>,
}

/// Fields of a payload whose signature checked out. Order is the order
/// the fields arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInitData {
    fields: Vec<(String, String)>,
}

/// The nested `user` claim. Only `id` is mandatory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAppUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl WebAppUser {
    #[must_use]
    pub fn player_id(&self) -> PlayerId {
        PlayerId(self.id)
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        derive_display_name(
            self.player_id(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.username.as_deref(),
        )
    }
}

impl VerifiedInitData {
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Issue time in unix seconds, if present and numeric. Not enforced.
    #[must_use]
    pub fn auth_date(&self) -> Option<i64> {
        self.field(AUTH_DATE_FIELD)?.parse().ok()
    }

    pub fn user(&self) -> Result<WebAppUser, ClaimError> {
        let raw = self.field(USER_FIELD).ok_or(ClaimError::MissingUserField)?;
        Ok(serde_json::from_str(raw)?)
    }
}

/// Splits a form-encoded payload. Every `hash` field is removed; the first
/// one is kept as the presented signature.
#[must_use]
pub fn parse_init_data(raw: &str) -> InitDataFields {
    let mut parsed = InitDataFields::default();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if key == SIGNATURE_FIELD {
            if parsed.hash.is_none() {
                parsed.hash = Some(value.into_owned());
            }
            continue;
        }
        parsed.fields.push((key.into_owned(), value.into_owned()));
    }
    parsed
}

/// `key=value` lines sorted by key bytes (value bytes on equal keys),
/// joined by `\n` with no trailing newline.
#[must_use]
pub fn build_data_check_string(fields: &[(String, String)]) -> String {
    let mut sorted = fields.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| {
        a.0.as_bytes()
            .cmp(b.0.as_bytes())
            .then_with(|| a.1.as_bytes().cmp(b.1.as_bytes()))
    });
    sorted
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], AuthError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::InvalidKeyLength)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

pub fn derive_signing_key(secret: &str) -> Result<[u8; 32], AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    hmac_sha256(WEB_APP_KEY_LABEL, secret.as_bytes())
}

pub fn compute_signature(secret: &str, check_string: &str) -> Result<String, AuthError> {
    let signing_key = derive_signing_key(secret)?;
    let digest = hmac_sha256(&signing_key, check_string.as_bytes())?;
    Ok(hex::encode(digest))
}

pub fn verify_init_data(raw: &str, secret: &str) -> Result<VerifiedInitData, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }
    if raw.trim().is_empty() {
        return Err(AuthError::EmptyPayload);
    }
    let InitDataFields { fields, hash } = parse_init_data(raw);
    let presented = hash.ok_or(AuthError::MissingHash)?;
    let expected = compute_signature(secret, &build_data_check_string(&fields))?;

    if !bool::from(expected.as_bytes().ct_eq(presented.as_bytes())) {
        return Err(AuthError::SignatureMismatch);
    }
    Ok(VerifiedInitData { fields })
}

/// Produces a form-encoded payload with a valid `hash` appended, the way
/// the platform issues them. Used by tests and local tooling.
pub fn sign_init_data(fields: &[(&str, &str)], secret: &str) -> Result<String, AuthError> {
    let owned = fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect::<Vec<_>>();
    let hash = compute_signature(secret, &build_data_check_string(&owned))?;

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        serializer.append_pair(key, value);
    }
    serializer.append_pair(SIGNATURE_FIELD, &hash);
    Ok(serializer.finish())
}
