//! Custom TLS profile for server connections.
//!
//! A profile is built once per run from the CA, certificate and key paths
//! and shared read-only by every server connection. All material is loaded
//! and checked up front so that bad files fail the run before any server is
//! contacted.

use std::path::{Path, PathBuf};

use rustls::crypto::ring;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::sign::CertifiedKey;
use rustls::{InconsistentKeys, RootCertStore};
use tracing::{debug, warn};

use crate::config::TlsSettings;
use crate::error::{Result, TlsError};

/// Client certificate and key presented to servers.
///
/// The key may be PKCS#1, PKCS#8 or SEC1 PEM.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    chain: Vec<CertificateDer<'static>>,
}

impl ClientIdentity {
    /// Certificates read from the cert file, leaf first.
    pub fn certificate_chain(&self) -> &[CertificateDer<'static>] {
        &self.chain
    }
}

/// Loaded TLS material.
///
/// The driver is handed the same files, so everything accepted here is
/// also accepted when connecting.
#[derive(Debug, Clone)]
pub struct TlsProfile {
    ca_path: Option<PathBuf>,
    roots: RootCertStore,
    identity: Option<ClientIdentity>,
    insecure_skip_verify: bool,
}

impl TlsProfile {
    /// Builds a profile from the configured files.
    ///
    /// Returns `Ok(None)` when no CA, certificate or key path is set. A
    /// certificate without a key (or a key without a certificate) is
    /// ignored rather than rejected.
    pub fn build(settings: &TlsSettings) -> Result<Option<Self>, TlsError> {
        let ca = non_empty(&settings.ca);
        let cert = non_empty(&settings.cert);
        let key = non_empty(&settings.key);

        if ca.is_none() && cert.is_none() && key.is_none() {
            return Ok(None);
        }

        let roots = match ca {
            Some(path) => load_roots(path)?,
            None => RootCertStore::empty(),
        };

        let identity = match (cert, key) {
            (Some(cert_path), Some(key_path)) => Some(load_identity(cert_path, key_path)?),
            (Some(_), None) | (None, Some(_)) => {
                warn!("tls cert and key must both be set to present a client certificate, ignoring");
                None
            }
            (None, None) => None,
        };

        let profile = TlsProfile {
            ca_path: ca.map(Path::to_path_buf),
            roots,
            identity,
            insecure_skip_verify: settings.insecure_skip_verify,
        };

        debug!(
            roots = profile.roots.len(),
            client_cert = profile.identity.is_some(),
            insecure = profile.insecure_skip_verify,
            "tls profile loaded"
        );
        Ok(Some(profile))
    }

    /// CA bundle the trust pool was loaded from.
    pub fn ca_path(&self) -> Option<&Path> {
        self.ca_path.as_deref()
    }

    /// Trust anchors loaded from the CA bundle.
    pub fn root_certificates(&self) -> &RootCertStore {
        &self.roots
    }

    pub fn client_identity(&self) -> Option<&ClientIdentity> {
        self.identity.as_ref()
    }

    pub fn insecure_skip_verify(&self) -> bool {
        self.insecure_skip_verify
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

fn read(kind: &'static str, path: &Path) -> Result<Vec<u8>, TlsError> {
    std::fs::read(path).map_err(|source| TlsError::Read {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

/// Loads every certificate from a PEM bundle into a trust store.
///
/// Sections other than `CERTIFICATE` are ignored. A certificate block that
/// does not parse rejects the whole bundle.
fn load_roots(path: &Path) -> Result<RootCertStore, TlsError> {
    let pem = read("CA", path)?;
    let invalid = |reason: String| TlsError::InvalidCa {
        path: path.to_path_buf(),
        reason,
    };

    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(e.to_string()))?;
    if certs.is_empty() {
        return Err(invalid("no certificate found".to_string()));
    }

    let mut roots = RootCertStore::empty();
    for cert in certs {
        roots.add(cert).map_err(|e| invalid(e.to_string()))?;
    }
    Ok(roots)
}

fn load_identity(cert_path: &Path, key_path: &Path) -> Result<ClientIdentity, TlsError> {
    let cert_pem = read("cert", cert_path)?;
    let chain = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Pem {
            path: cert_path.to_path_buf(),
            source,
        })?;
    if chain.is_empty() {
        return Err(TlsError::NoCertificate(cert_path.to_path_buf()));
    }

    let key_pem = read("key", key_path)?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|source| TlsError::Pem {
            path: key_path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(key_path.to_path_buf()))?;

    check_key_pair(&chain, key)?;
    Ok(ClientIdentity {
        cert_path: cert_path.to_path_buf(),
        key_path: key_path.to_path_buf(),
        chain,
    })
}

/// Fails unless `key` is supported and belongs to the leaf of `chain`.
fn check_key_pair(
    chain: &[CertificateDer<'static>],
    key: PrivateKeyDer<'static>,
) -> Result<(), TlsError> {
    let provider = ring::default_provider();
    let signing_key = provider
        .key_provider
        .load_private_key(key)
        .map_err(TlsError::KeyPair)?;

    match CertifiedKey::new(chain.to_vec(), signing_key).keys_match() {
        Ok(()) | Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => Ok(()),
        Err(e) => Err(TlsError::KeyPair(e)),
    }
}
