//! Run configuration.
//!
//! Built once by the front end and passed by reference into
//! [`crate::gather`].

use std::path::PathBuf;

use crate::error::{CheckError, Result};

/// Paths and flags for the custom TLS profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    /// PEM bundle of trusted CA certificates.
    pub ca: Option<PathBuf>,
    /// PEM client certificate chain.
    pub cert: Option<PathBuf>,
    /// PEM private key for `cert` (PKCS#1, PKCS#8 or SEC1).
    pub key: Option<PathBuf>,
    /// Encrypt without verifying the server certificate chain or host name.
    pub insecure_skip_verify: bool,
}

/// Configuration for one check run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckConfig {
    /// Server connection strings, collected in this order.
    pub servers: Vec<String>,
    pub tls: TlsSettings,
}

impl CheckConfig {
    pub fn new(servers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            servers: servers.into_iter().map(Into::into).collect(),
            tls: TlsSettings::default(),
        }
    }

    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.tls = tls;
        self
    }

    /// Checks the configuration before anything is loaded or contacted.
    pub fn validate(&self) -> Result<()> {
        if self.servers.iter().all(|s| s.trim().is_empty()) {
            return Err(CheckError::NoServers);
        }
        Ok(())
    }
}
