// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Session claims codec and the cookies that carry them.

use base64::{Engine, engine::general_purpose::STANDARD};
use http::HeaderMap;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{hmac, pbkdf2};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use std::num::NonZeroU32;
use std::time::Duration;

pub const SESSION_COOKIE: &str = "token";
pub const IDP_REFRESH_COOKIE: &str = "idp-refresh-token";
pub const COOKIE_PATH: &str = "/api/v1/";

const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(4096) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};
const AES_GCM: u8 = 0x00;
const IV_LEN: usize = 16;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("session token missing"))]
    Missing,

    #[snafu(display("session token is not valid base64: {}", source))]
    Encoding { source: base64::DecodeError },

    #[snafu(display("session token internal data is malformed"))]
    Truncated,

    #[snafu(display("invalid algorithm: {}", id))]
    Algorithm { id: u8 },

    #[snafu(display("session token could not be authenticated"))]
    Open,

    #[snafu(display("session token could not be sealed"))]
    Seal,

    #[snafu(display("session claims are malformed: {}", source))]
    Claims { source: serde_json::Error },
}

/// The principal carried by a session cookie.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "stsAccessKeyID", default, skip_serializing_if = "String::is_empty")]
    pub sts_access_key_id: String,
    #[serde(rename = "stsSecretAccessKey", default, skip_serializing_if = "String::is_empty")]
    pub sts_secret_access_key: String,
    #[serde(rename = "stsSessionToken", default, skip_serializing_if = "String::is_empty")]
    pub sts_session_token: String,
    #[serde(rename = "accountAccessKey", default, skip_serializing_if = "String::is_empty")]
    pub account_access_key: String,
}

impl Claims {
    /// Claims for a bearer that authenticates against the cluster directly.
    pub fn for_bearer(token: impl Into<String>, account_access_key: impl Into<String>) -> Self {
        Self {
            sts_session_token: token.into(),
            account_access_key: account_access_key.into(),
            ..Default::default()
        }
    }
}

/// Seals claims with a key derived once at startup.
///
/// Token layout before base64: `algorithm | iv[16] | nonce[12] | sealed`.
/// The sealing key is `HMAC-SHA256(derived, iv)`, so every token uses a
/// fresh AES-256-GCM key.
pub struct SessionCodec {
    key: [u8; 32],
    rng: SystemRandom,
}

impl SessionCodec {
    pub fn new(passphrase: &str, salt: &str) -> Self {
        let mut key = [0u8; 32];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA1,
            PBKDF2_ITERATIONS,
            salt.as_bytes(),
            passphrase.as_bytes(),
            &mut key,
        );
        Self {
            key,
            rng: SystemRandom::new(),
        }
    }

    fn sealing_key(&self, iv: &[u8]) -> Result<LessSafeKey, Error> {
        let tag = hmac::sign(&hmac::Key::new(hmac::HMAC_SHA256, &self.key), iv);
        let key = UnboundKey::new(&AES_256_GCM, tag.as_ref()).map_err(|_| Error::Seal)?;
        Ok(LessSafeKey::new(key))
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, Error> {
        let mut payload = serde_json::to_vec(claims).context(ClaimsSnafu)?;

        let mut iv = [0u8; IV_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        self.rng.fill(&mut iv).map_err(|_| Error::Seal)?;
        self.rng.fill(&mut nonce).map_err(|_| Error::Seal)?;

        self.sealing_key(&iv)?
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::empty(),
                &mut payload,
            )
            .map_err(|_| Error::Seal)?;

        let mut token = Vec::with_capacity(1 + IV_LEN + NONCE_LEN + payload.len());
        token.push(AES_GCM);
        token.extend_from_slice(&iv);
        token.extend_from_slice(&nonce);
        token.extend_from_slice(&payload);
        Ok(STANDARD.encode(token))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, Error> {
        let token = token.trim();
        ensure!(!token.is_empty(), MissingSnafu);

        let raw = STANDARD.decode(token).context(EncodingSnafu)?;
        ensure!(raw.len() > 1 + IV_LEN + NONCE_LEN, TruncatedSnafu);

        let (algorithm, rest) = raw.split_at(1);
        ensure!(algorithm[0] == AES_GCM, AlgorithmSnafu { id: algorithm[0] });
        let (iv, rest) = rest.split_at(IV_LEN);
        let (nonce, sealed) = rest.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce).map_err(|_| Error::Truncated)?;

        let mut sealed = sealed.to_vec();
        let plaintext = self
            .sealing_key(iv)?
            .open_in_place(nonce, Aad::empty(), &mut sealed)
            .map_err(|_| Error::Open)?;

        serde_json::from_slice(plaintext).context(ClaimsSnafu)
    }
}

/// Value of the first cookie called `name` in the request headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.trim().to_string())
        })
}

fn with_flags(mut cookie: String, secure: bool) -> String {
    cookie.push_str("; HttpOnly");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie.push_str("; SameSite=Lax");
    cookie
}

/// `Set-Cookie` value for a fresh session. `secure` is set when the server
/// holds public certificates.
pub fn session_cookie(token: &str, duration: Duration, secure: bool) -> String {
    let expires = chrono::Utc::now() + chrono::TimeDelta::seconds(duration.as_secs() as i64);
    with_flags(
        format!(
            "{}={}; Path={}; Expires={}; Max-Age={}",
            SESSION_COOKIE,
            token,
            COOKIE_PATH,
            http_date(expires),
            duration.as_secs()
        ),
        secure,
    )
}

pub fn idp_refresh_cookie(token: &str, secure: bool) -> String {
    with_flags(
        format!("{}={}; Path={}", IDP_REFRESH_COOKIE, token, COOKIE_PATH),
        secure,
    )
}

/// Cookie that makes the browser drop `name`.
pub fn expired_cookie(name: &str, secure: bool) -> String {
    with_flags(
        format!(
            "{}=; Path={}; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0",
            name, COOKIE_PATH
        ),
        secure,
    )
}

pub(crate) fn http_date(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SessionCodec {
        SessionCodec::new("passphrase", "salt")
    }

    fn claims() -> Claims {
        Claims {
            sts_access_key_id: "A".to_string(),
            sts_secret_access_key: "S".to_string(),
            sts_session_token: "K".to_string(),
            account_access_key: "42".to_string(),
        }
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let token = codec.encode(&claims()).unwrap();

        assert_eq!(codec.decode(&token).unwrap(), claims());
        // fresh iv and nonce per token
        assert_ne!(token, codec.encode(&claims()).unwrap());
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let codec = codec();
        let token = codec.encode(&claims()).unwrap();

        let mut raw = STANDARD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = STANDARD.encode(raw);

        assert!(matches!(codec.decode(&tampered), Err(Error::Open)));
        assert!(matches!(codec.decode(&token[..20]), Err(Error::Truncated) | Err(Error::Encoding { .. })));
        assert!(matches!(codec.decode(""), Err(Error::Missing)));
        assert!(matches!(codec.decode("%%%"), Err(Error::Encoding { .. })));
    }

    #[test]
    fn test_other_key_cannot_open() {
        let token = codec().encode(&claims()).unwrap();
        let other = SessionCodec::new("passphrase", "pepper");

        assert!(matches!(other.decode(&token), Err(Error::Open)));
    }

    #[test]
    fn test_unknown_algorithm() {
        let mut raw = STANDARD.decode(codec().encode(&claims()).unwrap()).unwrap();
        raw[0] = 0x07;

        assert!(matches!(
            codec().decode(&STANDARD.encode(raw)),
            Err(Error::Algorithm { id: 7 })
        ));
    }

    #[test]
    fn test_claim_names() {
        let json = serde_json::to_value(Claims::for_bearer("bearer", "12345")).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"stsSessionToken": "bearer", "accountAccessKey": "12345"})
        );
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::COOKIE,
            "other=value; token=abc=; token-proxy=x".parse().unwrap(),
        );

        assert_eq!(read_cookie(&headers, "token"), Some("abc=".to_string()));
        assert_eq!(read_cookie(&headers, "token-proxy"), Some("x".to_string()));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("abc", Duration::from_secs(2700), true);
        assert!(cookie.starts_with("token=abc; Path=/api/v1/; Expires="));
        assert!(cookie.contains("Max-Age=2700"));
        assert!(cookie.ends_with("; HttpOnly; Secure; SameSite=Lax"));

        let cookie = idp_refresh_cookie("r", false);
        assert_eq!(cookie, "idp-refresh-token=r; Path=/api/v1/; HttpOnly; SameSite=Lax");

        let cookie = expired_cookie(SESSION_COOKIE, false);
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }
}
