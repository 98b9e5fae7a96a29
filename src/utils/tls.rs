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

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, ring};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::{ClientConfig, DigitallySignedStruct, ServerConfig, SignatureScheme};
use rustls_pemfile::Item;
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const PUBLIC_CERT_FILE: &str = "public.crt";
pub const PRIVATE_KEY_FILE: &str = "private.key";
pub const CA_DIR: &str = "CAs";

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("parse certificate error"))]
    InvalidCertificate { source: io::Error },

    #[snafu(display("no certificate"))]
    NonCertificate,

    #[snafu(display("parse private key error"))]
    InvalidPrivateKey { source: io::Error },

    #[snafu(display("no private key"))]
    NonPrivateKey,

    #[snafu(display("key pair match failed"))]
    MatchFailed { source: rustls::Error },

    #[snafu(display("no supported sign type"))]
    NoSupportedSignType { source: rustls::Error },

    #[snafu(display("no supported pem type"))]
    NoSupportedPEMType,

    #[snafu(display("read {}: {}", path.display(), source))]
    ReadFile { path: PathBuf, source: io::Error },

    #[snafu(display("tls configuration error: {}", source))]
    Config { source: rustls::Error },
}

// load certificates from PEM file
fn load_certs(cert: &[u8]) -> Result<Vec<CertificateDer<'static>>, Error> {
    let certs = rustls_pemfile::certs(&mut Cursor::new(cert))
        .collect::<Result<Vec<CertificateDer<'static>>, _>>()
        .context(InvalidCertificateSnafu)?;

    if certs.is_empty() {
        return NonCertificateSnafu.fail();
    }

    Ok(certs)
}

fn load_private_key(private_key: &[u8]) -> Result<PrivateKeyDer<'static>, Error> {
    let item = rustls_pemfile::read_one(&mut Cursor::new(private_key))
        .context(InvalidPrivateKeySnafu)?
        .ok_or(Error::NonPrivateKey)?;

    // only pkcs8/pkcs1/sec1 supported
    Ok(match item {
        Item::Pkcs8Key(key) => key.into(),
        Item::Pkcs1Key(key) => key.into(),
        Item::Sec1Key(key) => key.into(),
        _ => Err(Error::NoSupportedPEMType)?,
    })
}

/// Builds a signing identity from a PEM certificate chain and its private key,
/// failing when the two do not belong together.
pub fn certified_key<T: AsRef<[u8]>>(cert_pem: T, key_pem: T) -> Result<CertifiedKey, Error> {
    let certs = load_certs(cert_pem.as_ref())?;
    let private_key = load_private_key(key_pem.as_ref())?;

    let signing_key =
        ring::sign::any_supported_type(&private_key).context(NoSupportedSignTypeSnafu)?;

    let certified_key = CertifiedKey::new(certs, signing_key);
    certified_key.keys_match().context(MatchFailedSnafu)?;
    Ok(certified_key)
}

fn read(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).context(ReadFileSnafu { path })
}

fn load_pair(dir: &Path) -> Result<Option<CertifiedKey>, Error> {
    let cert = dir.join(PUBLIC_CERT_FILE);
    let key = dir.join(PRIVATE_KEY_FILE);
    if !cert.is_file() || !key.is_file() {
        return Ok(None);
    }

    certified_key(read(&cert)?, read(&key)?).map(Some)
}

/// Server certificates selected by SNI.
///
/// The certificate directory root holds the default pair; every
/// sub-directory other than `CAs` holding a pair serves the host name it is
/// named after.
#[derive(Debug, Default)]
pub struct CertManager {
    default: Option<Arc<CertifiedKey>>,
    by_name: BTreeMap<String, Arc<CertifiedKey>>,
}

impl CertManager {
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let mut manager = Self {
            default: load_pair(dir)?.map(Arc::new),
            by_name: BTreeMap::new(),
        };

        let Ok(entries) = std::fs::read_dir(dir) else {
            return Ok(manager);
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if !path.is_dir() || name == CA_DIR.to_lowercase() {
                continue;
            }
            if let Some(key) = load_pair(&path)? {
                debug!("loaded certificate for {}", name);
                manager.by_name.insert(name, Arc::new(key));
            }
        }

        // without a root pair the alphabetically first host serves as default
        if manager.default.is_none() {
            manager.default = manager.by_name.values().next().cloned();
        }

        Ok(manager)
    }

    /// Replaces the default pair with an explicitly configured one.
    pub fn with_default_pair(mut self, cert: &Path, key: &Path) -> Result<Self, Error> {
        self.default = Some(Arc::new(certified_key(read(cert)?, read(key)?)?));
        Ok(self)
    }

    /// Whether any public certificate was found.
    pub fn is_empty(&self) -> bool {
        self.default.is_none()
    }

    pub fn server_config(self: Arc<Self>) -> Result<ServerConfig, Error> {
        let mut config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
            .with_safe_default_protocol_versions()
            .context(ConfigSnafu)?
            .with_no_client_auth()
            .with_cert_resolver(self);
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
        Ok(config)
    }
}

impl ResolvesServerCert for CertManager {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        client_hello
            .server_name()
            .and_then(|name| self.by_name.get(&name.to_lowercase()))
            .or(self.default.as_ref())
            .cloned()
    }
}

/// Reads every PEM certificate found in `sources`, each either a directory
/// of PEM files or a single PEM file. Missing sources are skipped,
/// unreadable files are logged and skipped.
pub fn load_ca_certificates(sources: &[PathBuf]) -> Vec<CertificateDer<'static>> {
    let mut files = Vec::new();
    for source in sources {
        if source.is_file() {
            files.push(source.clone());
            continue;
        }
        let Ok(entries) = std::fs::read_dir(source) else {
            continue;
        };
        files.extend(
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.is_file()),
        );
    }

    let mut pool = Vec::new();
    for path in files {
        match read(&path).and_then(|pem| load_certs(&pem)) {
            Ok(certs) => pool.extend(certs),
            Err(e) => warn!("skipping CA file {}: {}", path.display(), e),
        }
    }
    pool
}

/// Accepts any server certificate. Only used towards in-cluster tenant
/// services reached through their service DNS name.
#[derive(Debug)]
struct NoVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Client configuration with certificate verification disabled.
pub fn insecure_client_config() -> Result<ClientConfig, Error> {
    let provider = Arc::new(ring::default_provider());
    Ok(ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .context(ConfigSnafu)?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerification(provider)))
        .with_no_client_auth())
}
