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

//! Payload encryption used by the admin API for secrets in transit.
//!
//! Layout: `salt[32] | id | nonce[8] | stream`. The stream is a sequence of
//! 16 KiB fragments, each sealed with nonce `nonce || LE32(seq)` and
//! associated data `flag || tag`, where `tag` seals the empty message at
//! sequence 0 and `flag` is `0x80` on the final fragment only.

use argon2::{Algorithm, Argon2, Params, Version};
use ring::aead::{AES_256_GCM, Aad, CHACHA20_POLY1305, LessSafeKey, Nonce, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use snafu::{Snafu, ensure};
use std::num::NonZeroU32;

const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 8;
const TAG_LEN: usize = 16;
const FRAGMENT_LEN: usize = 16 * 1024;

const ARGON2ID_AES_GCM: u8 = 0x00;
const ARGON2ID_CHACHA20_POLY1305: u8 = 0x01;
const PBKDF2_AES_GCM: u8 = 0x02;

const PBKDF2_COST: NonZeroU32 = match NonZeroU32::new(8192) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};
const ARGON2ID_TIME: u32 = 1;
const ARGON2ID_MEMORY_KIB: u32 = 64 * 1024;
const ARGON2ID_THREADS: u32 = 4;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("encrypted payload is truncated"))]
    Truncated,

    #[snafu(display("unsupported payload encryption id {}", id))]
    UnsupportedId { id: u8 },

    #[snafu(display("key derivation failed: {}", message))]
    Kdf { message: String },

    #[snafu(display("payload authentication failed"))]
    Authentication,

    #[snafu(display("payload too large to encrypt"))]
    TooLarge,

    #[snafu(display("random source unavailable"))]
    Random,
}

fn derive_key(id: u8, password: &str, salt: &[u8]) -> Result<LessSafeKey, Error> {
    let mut key = [0u8; 32];
    let algorithm = match id {
        ARGON2ID_AES_GCM | ARGON2ID_CHACHA20_POLY1305 => {
            let params = Params::new(ARGON2ID_MEMORY_KIB, ARGON2ID_TIME, ARGON2ID_THREADS, Some(32))
                .map_err(|e| Error::Kdf {
                    message: e.to_string(),
                })?;
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password_into(password.as_bytes(), salt, &mut key)
                .map_err(|e| Error::Kdf {
                    message: e.to_string(),
                })?;
            if id == ARGON2ID_AES_GCM {
                &AES_256_GCM
            } else {
                &CHACHA20_POLY1305
            }
        }
        PBKDF2_AES_GCM => {
            pbkdf2::derive(
                pbkdf2::PBKDF2_HMAC_SHA256,
                PBKDF2_COST,
                salt,
                password.as_bytes(),
                &mut key,
            );
            &AES_256_GCM
        }
        id => return Err(Error::UnsupportedId { id }),
    };

    let key = UnboundKey::new(algorithm, &key).map_err(|_| Error::Kdf {
        message: "invalid key length".to_string(),
    })?;
    Ok(LessSafeKey::new(key))
}

fn nonce(prefix: &[u8], seq: u32) -> Nonce {
    let mut nonce = [0u8; 12];
    nonce[..NONCE_LEN].copy_from_slice(prefix);
    nonce[NONCE_LEN..].copy_from_slice(&seq.to_le_bytes());
    Nonce::assume_unique_for_key(nonce)
}

/// `flag || tag` associated data shared by every fragment.
fn associated_data(key: &LessSafeKey, prefix: &[u8]) -> Result<[u8; 1 + TAG_LEN], Error> {
    let mut tag = Vec::with_capacity(TAG_LEN);
    key.seal_in_place_append_tag(nonce(prefix, 0), Aad::empty(), &mut tag)
        .map_err(|_| Error::Authentication)?;

    let mut ad = [0u8; 1 + TAG_LEN];
    ad[1..].copy_from_slice(&tag);
    Ok(ad)
}

/// Encrypts `data` for a tenant holding `password` (its secret key).
pub fn encrypt_data(password: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    let mut prefix = [0u8; NONCE_LEN];
    rng.fill(&mut salt).map_err(|_| Error::Random)?;
    rng.fill(&mut prefix).map_err(|_| Error::Random)?;

    seal(password, &salt, &prefix, data)
}

fn seal(password: &str, salt: &[u8], prefix: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    let key = derive_key(PBKDF2_AES_GCM, password, salt)?;
    let mut ad = associated_data(&key, prefix)?;

    let fragments = data.len().div_ceil(FRAGMENT_LEN).max(1);
    let mut out = Vec::with_capacity(SALT_LEN + 1 + NONCE_LEN + data.len() + fragments * TAG_LEN);
    out.extend_from_slice(salt);
    out.push(PBKDF2_AES_GCM);
    out.extend_from_slice(prefix);

    for index in 0..fragments {
        let start = index * FRAGMENT_LEN;
        let end = (start + FRAGMENT_LEN).min(data.len());
        let seq = u32::try_from(index + 1).map_err(|_| Error::TooLarge)?;
        ad[0] = if index + 1 == fragments { 0x80 } else { 0x00 };

        let mut fragment = data[start..end].to_vec();
        key.seal_in_place_append_tag(nonce(prefix, seq), Aad::from(&ad[..]), &mut fragment)
            .map_err(|_| Error::Authentication)?;
        out.extend_from_slice(&fragment);
    }
    Ok(out)
}

/// Decrypts a payload produced by a tenant with any supported id.
pub fn decrypt_data(password: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    ensure!(data.len() >= SALT_LEN + 1 + NONCE_LEN + TAG_LEN, TruncatedSnafu);

    let (salt, rest) = data.split_at(SALT_LEN);
    let (id, rest) = rest.split_at(1);
    let (prefix, stream) = rest.split_at(NONCE_LEN);

    let key = derive_key(id[0], password, salt)?;
    let mut ad = associated_data(&key, prefix)?;

    let fragments: Vec<&[u8]> = stream.chunks(FRAGMENT_LEN + TAG_LEN).collect();
    let mut out = Vec::with_capacity(stream.len());
    for (index, fragment) in fragments.iter().enumerate() {
        ensure!(fragment.len() >= TAG_LEN, TruncatedSnafu);
        let seq = u32::try_from(index + 1).map_err(|_| Error::TooLarge)?;
        ad[0] = if index + 1 == fragments.len() { 0x80 } else { 0x00 };

        let mut buf = fragment.to_vec();
        let plain = key
            .open_in_place(nonce(prefix, seq), Aad::from(&ad[..]), &mut buf)
            .map_err(|_| Error::Authentication)?;
        out.extend_from_slice(plain);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAINTEXT: &[u8] = b"subnet license=abc api_key=def proxy=";

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    #[test]
    fn test_decrypt_argon2id_aes_gcm() {
        let data = unhex(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f006465666768696a6b\
             0058dc0d8c48af01f72deebccc99a56588493c9c39add29f3ef7a0b9fd41bd5d654c2246122c37ed11\
             31959c27885c7fb34dc61b7d",
        );
        assert_eq!(decrypt_data("minio123", &data).unwrap(), PLAINTEXT);
    }

    #[test]
    fn test_decrypt_argon2id_chacha20_poly1305() {
        let data = unhex(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f016465666768696a6b\
             c823abf6025ea54078d75ba250e0f84454f650f867bf27aa40feaea9237da98196eaf5ecf2cb2e1c62\
             648759563f8645c51a12db4e",
        );
        assert_eq!(decrypt_data("minio123", &data).unwrap(), PLAINTEXT);
    }

    #[test]
    fn test_seal_matches_reference() {
        let data = unhex(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f026465666768696a6b\
             50ab1c463b2c05d0a05a11d2a1a6dc2e81e222a9aa861830897e881986c66ff99fc3971d2bad71c8d0\
             650b42bdc8ea1445a1954eed",
        );
        let salt: Vec<u8> = (0..32).collect();
        let prefix: Vec<u8> = (100..108).collect();

        assert_eq!(seal("minio123", &salt, &prefix, PLAINTEXT).unwrap(), data);
        assert_eq!(decrypt_data("minio123", &data).unwrap(), PLAINTEXT);
    }

    #[test]
    fn test_fragment_boundaries() {
        for len in [0, 1, FRAGMENT_LEN - 1, FRAGMENT_LEN, FRAGMENT_LEN + 1, 3 * FRAGMENT_LEN] {
            let plain: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let sealed = encrypt_data("secret", &plain).unwrap();
            assert_eq!(decrypt_data("secret", &sealed).unwrap(), plain, "len {}", len);
        }
    }

    #[test]
    fn test_wrong_password_and_tampering() {
        let mut sealed = encrypt_data("secret", PLAINTEXT).unwrap();
        assert!(matches!(
            decrypt_data("other", &sealed),
            Err(Error::Authentication)
        ));

        let last = sealed.len() - 1;
        sealed[last] ^= 1;
        assert!(matches!(
            decrypt_data("secret", &sealed),
            Err(Error::Authentication)
        ));

        sealed[SALT_LEN] = 9;
        assert!(matches!(
            decrypt_data("secret", &sealed),
            Err(Error::UnsupportedId { id: 9 })
        ));
        assert!(matches!(decrypt_data("secret", &[0u8; 10]), Err(Error::Truncated)));
    }

    #[test]
    fn test_dropping_final_fragment_is_detected() {
        let plain = vec![7u8; FRAGMENT_LEN + 10];
        let sealed = encrypt_data("secret", &plain).unwrap();
        let header = SALT_LEN + 1 + NONCE_LEN;
        let truncated = &sealed[..header + FRAGMENT_LEN + TAG_LEN];

        assert!(matches!(
            decrypt_data("secret", truncated),
            Err(Error::Authentication)
        ));
    }
}
