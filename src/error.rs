//! Error type for the check.
//!
//! Every failure is fatal to the run. Variants fall into three groups:
//! configuration (bad DSN, missing servers, unusable TLS material),
//! connectivity (connect, query and row-scan failures) and data
//! (unparseable values, families the aggregator does not know).

use std::path::PathBuf;
use std::time::Duration;

use crate::metrics::MetricKind;

/// Error returned by every fallible operation in the crate.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// No server connection strings were configured.
    #[error("expected at least one server")]
    NoServers,

    /// A server connection string could not be parsed.
    #[error("error parsing server dsn: {0}")]
    InvalidDsn(String),

    /// The TLS material could not be loaded.
    #[error("{context}: {source}")]
    Tls {
        context: String,
        #[source]
        source: TlsError,
    },

    /// Opening the connection failed.
    #[error("error opening connection: {0}")]
    Connect(#[source] sqlx::Error),

    /// Opening the connection did not finish within the connect timeout.
    #[error("error opening connection: timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The status query failed or its rows could not be read.
    #[error("error getting server status: {0}")]
    Query(String),

    /// A status row could not be read.
    #[error("error scanning server status results: {0}")]
    Scan(String),

    /// A recognized status variable carried a non-integer value.
    #[error("could not read server status value as integer {name}: {value}")]
    InvalidValue { name: String, value: String },

    /// A collector produced a group the aggregator has no family for.
    #[error("unexpected error coalescing metrics. unspecified metric point {0}")]
    UnknownFamily(String),

    /// An observation's kind does not match its family's declared kind.
    #[error("metric family {family} is a {expected} but received a {actual} observation")]
    KindMismatch {
        family: String,
        expected: MetricKind,
        actual: MetricKind,
    },

    /// Failure while collecting a single server, with its address and database.
    #[error("error collecting metrics for server: {addr} db:{db}: {source}")]
    Server {
        addr: String,
        db: String,
        #[source]
        source: Box<CheckError>,
    },

    /// The driver runtime could not be started.
    #[error("failed to start database runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Rendering the exposition text failed.
    #[error("failed to encode metrics to prometheus exposition format: {0}")]
    Encode(#[from] prometheus::Error),
}

/// Underlying cause of a TLS configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("could not read tls {kind} file {}: {source}", .path.display())]
    Read {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load CA file as x509 cert {}: {reason}", .path.display())]
    InvalidCa { path: PathBuf, reason: String },

    #[error("could not parse PEM in {}: {source}", .path.display())]
    Pem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificate found in tls cert file {}", .0.display())]
    NoCertificate(PathBuf),

    #[error("no private key found in tls key file {}", .0.display())]
    NoPrivateKey(PathBuf),

    #[error("tls cert and key are not a usable key pair: {0}")]
    KeyPair(#[source] rustls::Error),

    #[error("tls profile {0:?} requested but no TLS material was configured")]
    UnknownProfile(String),
}

impl CheckError {
    /// Wraps an error with the server address and database it occurred on.
    pub fn for_server(self, addr: impl Into<String>, db: impl Into<String>) -> Self {
        CheckError::Server {
            addr: addr.into(),
            db: db.into(),
            source: Box::new(self),
        }
    }

    /// Returns true for errors caused by configuration rather than by a server.
    pub fn is_config(&self) -> bool {
        match self {
            CheckError::NoServers | CheckError::InvalidDsn(_) | CheckError::Tls { .. } => true,
            CheckError::Server { source, .. } => source.is_config(),
            _ => false,
        }
    }

    /// Returns true for errors raised by bad data reported by a server.
    pub fn is_data(&self) -> bool {
        match self {
            CheckError::InvalidValue { .. }
            | CheckError::UnknownFamily(_)
            | CheckError::KindMismatch { .. } => true,
            CheckError::Server { source, .. } => source.is_data(),
            _ => false,
        }
    }

    pub(crate) fn tls(context: impl Into<String>, source: impl Into<TlsError>) -> Self {
        CheckError::Tls {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T, E = CheckError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_context_is_prefixed() {
        let err = CheckError::InvalidValue {
            name: "Uptime".to_string(),
            value: "abc".to_string(),
        }
        .for_server("localhost:3306", "mysql");

        assert_eq!(
            err.to_string(),
            "error collecting metrics for server: localhost:3306 db:mysql: \
             could not read server status value as integer Uptime: abc"
        );
        assert!(err.is_data());
        assert!(!err.is_config());
    }

    #[test]
    fn config_errors_are_classified() {
        assert!(CheckError::NoServers.is_config());
        assert!(CheckError::InvalidDsn("missing slash".into()).is_config());
        assert!(!CheckError::Query("gone away".into()).is_config());
        assert!(
            CheckError::tls("invalid TLS Config", TlsError::UnknownProfile("custom".into()))
                .for_server("db1:3306", "")
                .is_config()
        );
    }
}
