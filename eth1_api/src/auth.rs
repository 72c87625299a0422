use core::{
    fmt::{Binary, Display, LowerExp, LowerHex, Octal, Pointer, UpperExp, UpperHex},
    ops::Deref,
};
use std::path::PathBuf;

use anyhow::{ensure, Context as _, Result};
use jwt_simple::{
    algorithms::{HS256Key, MACLike},
    claims::Claims,
    prelude::Duration,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use static_assertions::assert_not_impl_any;
use thiserror::Error;
use zeroize::Zeroizing;

#[cfg(test)]
use derive_more::Debug;

const JWT_SECRET_SIZE_MIN_BYTES: usize = 32;

// Engine API tokens must be issued within 60 seconds of being checked.
const JWT_VALIDITY_SECONDS: u64 = 60;

/// Where to load the Engine API JWT secret from and which optional claims to send with it.
#[derive(Debug, Default)]
pub struct Options {
    pub secrets_path: Option<PathBuf>,
    pub id: Option<String>,
    pub version: Option<String>,
}

#[derive(Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct JwtClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clv: Option<String>,
}

/// Signs Engine API requests with an HS256 JWT carrying an `iat` claim.
#[derive(Default)]
#[cfg_attr(test, derive(Debug))]
pub struct Auth {
    secret: Option<Secret>,
    id: Option<String>,
    version: Option<String>,
}

// Prevent `Auth` from implementing some traits to avoid leaking secret keys.
assert_not_impl_any! {
    Auth:

    Clone,
    Copy,
    Deref,
    ToOwned,

    Binary,
    Display,
    LowerExp,
    LowerHex,
    Octal,
    Pointer,
    UpperExp,
    UpperHex,

    Serialize,
}

impl Auth {
    pub fn new(options: Options) -> Result<Self> {
        let Options {
            secrets_path,
            id,
            version,
        } = options;

        let secret = match secrets_path {
            Some(path) => {
                let bytes = fs_err::read(path).map(Zeroizing::new)?;
                let secret = Secret::from_hex(bytes.as_slice())?;
                Some(secret)
            }
            None => None,
        };

        Ok(Self {
            secret,
            id,
            version,
        })
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    pub fn headers(&self) -> Result<Option<HeaderMap>> {
        let Some(secret) = &self.secret else {
            return Ok(None);
        };

        let jwt_claims = JwtClaims {
            id: self.id.clone(),
            clv: self.version.clone(),
        };

        let validity = Duration::from_secs(JWT_VALIDITY_SECONDS);
        let claims = Claims::with_custom_claims(jwt_claims, validity);
        let token = Zeroizing::new(secret.key.authenticate(claims)?);
        let token_string = Zeroizing::new(format!("Bearer {}", *token));

        let mut auth_value = HeaderValue::try_from(token_string.as_str())?;
        auth_value.set_sensitive(true);

        let headers = HeaderMap::from_iter([(AUTHORIZATION, auth_value)]);

        Ok(Some(headers))
    }
}

#[cfg_attr(test, derive(Debug))]
#[cfg_attr(test, debug("[REDACTED]"))]
struct Secret {
    key: HS256Key,
}

// Prevent `Secret` from implementing some traits to avoid leaking secret keys.
assert_not_impl_any! {
    Secret:

    Clone,
    Copy,
    Deref,
    ToOwned,

    Binary,
    Display,
    LowerExp,
    LowerHex,
    Octal,
    Pointer,
    UpperExp,
    UpperHex,

    Serialize,
}

impl Secret {
    fn from_hex(mut digits: &[u8]) -> Result<Self> {
        digits = digits.strip_prefix(b"0x").unwrap_or(digits);

        // Secret files written by execution clients usually end with a newline.
        digits = digits.strip_suffix(b"\n").unwrap_or(digits);
        digits = digits.strip_suffix(b"\r").unwrap_or(digits);

        let bytes = hex::decode(digits)
            .map(Zeroizing::new)
            .context(JwtSecretError::InvalidSecret)?;

        ensure!(
            bytes.len() >= JWT_SECRET_SIZE_MIN_BYTES,
            JwtSecretError::IncorrectSize,
        );

        let key = HS256Key::from_bytes(bytes.as_slice());

        Ok(Self { key })
    }
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
enum JwtSecretError {
    #[error("JWT secret must be at least {JWT_SECRET_SIZE_MIN_BYTES} bytes")]
    IncorrectSize,
    #[error("failed to parse JWT secret")]
    InvalidSecret,
}
