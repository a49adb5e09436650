//! MySQL status source.
//!
//! The driver is async; a private current-thread runtime drives it so the
//! rest of the check stays blocking and sequential. Each call opens one
//! connection, reads the snapshot and closes the connection again.

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::{ConnectOptions, Connection, Executor, Row};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use super::{StatusRow, StatusSource};
use crate::dsn::{Protocol, ServerTarget, TlsMode};
use crate::error::{CheckError, Result, TlsError};
use crate::tls::TlsProfile;

/// Query returning one `Variable_name`/`Value` row per status variable.
pub const STATUS_QUERY: &str = "SHOW GLOBAL STATUS";

/// Status source backed by real MySQL connections.
pub struct MySqlStatusSource {
    runtime: Runtime,
    tls: Option<TlsProfile>,
}

impl MySqlStatusSource {
    /// Creates a source that applies `tls` to targets that ask for it.
    pub fn new(tls: Option<TlsProfile>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(CheckError::Runtime)?;
        Ok(Self { runtime, tls })
    }

    /// Translates a target into driver connect options.
    pub fn connect_options(&self, target: &ServerTarget) -> Result<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::new().username(&target.user);
        if let Some(ref password) = target.password {
            options = options.password(password);
        }
        if !target.database.is_empty() {
            options = options.database(&target.database);
        }

        options = match target.protocol {
            Protocol::Tcp => {
                let (host, port) = target.host_port().ok_or_else(|| {
                    CheckError::InvalidDsn(format!("invalid tcp address '{}'", target.address))
                })?;
                options.host(host).port(port)
            }
            Protocol::Unix => options.socket(&target.address),
        };

        self.apply_tls(options, &target.tls)
    }

    fn apply_tls(&self, options: MySqlConnectOptions, mode: &TlsMode) -> Result<MySqlConnectOptions> {
        let options = match (mode, &self.tls) {
            (TlsMode::Disabled, _) => options.ssl_mode(MySqlSslMode::Disabled),
            (TlsMode::Verified, _) => options.ssl_mode(MySqlSslMode::VerifyIdentity),
            (TlsMode::SkipVerify, _) => options.ssl_mode(MySqlSslMode::Required),
            (TlsMode::Preferred, _) => options.ssl_mode(MySqlSslMode::Preferred),
            (TlsMode::Unspecified | TlsMode::Profile(_), Some(profile)) => {
                with_profile(options, profile)
            }
            (TlsMode::Unspecified, None) => options.ssl_mode(MySqlSslMode::Disabled),
            (TlsMode::Profile(name), None) => {
                return Err(CheckError::tls(
                    "invalid TLS Config",
                    TlsError::UnknownProfile(name.clone()),
                ));
            }
        };
        Ok(options)
    }
}

fn with_profile(options: MySqlConnectOptions, profile: &TlsProfile) -> MySqlConnectOptions {
    let mode = if profile.insecure_skip_verify() {
        MySqlSslMode::Required
    } else {
        MySqlSslMode::VerifyIdentity
    };
    let mut options = options.ssl_mode(mode);
    if let Some(ca) = profile.ca_path() {
        options = options.ssl_ca(ca);
    }
    if let Some(id) = profile.client_identity() {
        options = options
            .ssl_client_cert(&id.cert_path)
            .ssl_client_key(&id.key_path);
    }
    options
}

impl StatusSource for MySqlStatusSource {
    fn global_status(&mut self, target: &ServerTarget) -> Result<Vec<StatusRow>> {
        let options = self.connect_options(target)?;
        let connect_timeout = target.connect_timeout();
        let read_timeout = target.read_timeout.filter(|t| !t.is_zero());

        self.runtime.block_on(async move {
            debug!(server = %target.address, timeout = ?connect_timeout, "connecting");
            let mut conn = tokio::time::timeout(connect_timeout, options.connect())
                .await
                .map_err(|_| CheckError::ConnectTimeout(connect_timeout))?
                .map_err(CheckError::Connect)?;

            let result = fetch_status(&mut conn, read_timeout).await;

            if let Err(e) = conn.close().await {
                warn!(server = %target.address, error = %e, "failed to close connection");
            }
            result
        })
    }
}

async fn fetch_status(
    conn: &mut MySqlConnection,
    read_timeout: Option<Duration>,
) -> Result<Vec<StatusRow>> {
    let fetch = (&mut *conn).fetch_all(STATUS_QUERY);
    let rows = match read_timeout {
        Some(limit) => tokio::time::timeout(limit, fetch)
            .await
            .map_err(|_| CheckError::Query(format!("timed out after {limit:?}")))?,
        None => fetch.await,
    }
    .map_err(|e| CheckError::Query(e.to_string()))?;

    rows.iter()
        .map(|row| {
            let name: Vec<u8> = row.try_get(0).map_err(|e| CheckError::Scan(e.to_string()))?;
            let value: Option<Vec<u8>> =
                row.try_get(1).map_err(|e| CheckError::Scan(e.to_string()))?;
            Ok(StatusRow {
                name: column_text(Some(name)),
                value: column_text(value),
            })
        })
        .collect()
}

/// Decodes a raw column lossily; NULL reads as an empty string.
fn column_text(raw: Option<Vec<u8>>) -> String {
    raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}
