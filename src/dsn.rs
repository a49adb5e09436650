//! Server connection strings.
//!
//! Targets are written as
//! `[user[:password]@][protocol[(address)]]/dbname[?param=value&...]`,
//! for example `monitor:secret@tcp(db1.internal:3306)/mysql?timeout=2s`.
//!
//! Recognized parameters:
//! - `timeout` - connect timeout (`5s`, `500ms`, `1m30s`); default 5 seconds
//! - `readTimeout` - upper bound for the status query
//! - `tls` - `true`, `false`, `skip-verify`, `preferred` or a profile name
//!
//! Other parameters are kept on the target but not used.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{CheckError, Result};

/// Connect timeout used when the connection string does not set one.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_PORT: &str = "3306";
const DEFAULT_TCP_ADDR: &str = "127.0.0.1:3306";
const DEFAULT_UNIX_ADDR: &str = "/tmp/mysql.sock";

/// Transport used to reach the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Unix,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Unix => write!(f, "unix"),
        }
    }
}

/// TLS behavior requested by the `tls` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// No `tls` parameter: use the run's TLS profile if there is one.
    #[default]
    Unspecified,
    /// `tls=false`
    Disabled,
    /// `tls=true`: verify the server certificate and host name.
    Verified,
    /// `tls=skip-verify`: encrypt without verifying the server.
    SkipVerify,
    /// `tls=preferred`: encrypt when the server supports it.
    Preferred,
    /// `tls=<name>`: use the named TLS profile.
    Profile(String),
}

impl TlsMode {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" => TlsMode::Verified,
            "0" | "false" => TlsMode::Disabled,
            "skip-verify" => TlsMode::SkipVerify,
            "preferred" => TlsMode::Preferred,
            _ => TlsMode::Profile(value.to_string()),
        }
    }
}

/// A parsed server connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    pub user: String,
    pub password: Option<String>,
    pub protocol: Protocol,
    /// `host:port` for TCP, socket path for Unix sockets.
    pub address: String,
    pub database: String,
    pub timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub tls: TlsMode,
    pub params: Vec<(String, String)>,
}

impl ServerTarget {
    /// Parses a connection string.
    pub fn parse(dsn: &str) -> Result<Self> {
        dsn.parse()
    }

    /// Connect timeout, falling back to [`DEFAULT_CONNECT_TIMEOUT`].
    pub fn connect_timeout(&self) -> Duration {
        match self.timeout {
            Some(t) if !t.is_zero() => t,
            _ => DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Host and port of a TCP target.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        if self.protocol != Protocol::Tcp {
            return None;
        }
        let (host, port) = self.address.rsplit_once(':')?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        Some((host, port.parse().ok()?))
    }
}

impl FromStr for ServerTarget {
    type Err = CheckError;

    fn from_str(dsn: &str) -> Result<Self> {
        let mut target = ServerTarget {
            user: String::new(),
            password: None,
            protocol: Protocol::Tcp,
            address: String::new(),
            database: String::new(),
            timeout: None,
            read_timeout: None,
            tls: TlsMode::Unspecified,
            params: Vec::new(),
        };

        let Some(slash) = dsn.rfind('/') else {
            if dsn.is_empty() {
                target.address = DEFAULT_TCP_ADDR.to_string();
                return Ok(target);
            }
            return Err(invalid("missing the slash separating the database name"));
        };

        let (head, tail) = (&dsn[..slash], &dsn[slash + 1..]);

        // [user[:password]@][protocol[(address)]]
        let net_part = match head.rfind('@') {
            Some(at) => {
                let credentials = &head[..at];
                match credentials.split_once(':') {
                    Some((user, password)) => {
                        target.user = user.to_string();
                        target.password = Some(password.to_string());
                    }
                    None => target.user = credentials.to_string(),
                }
                &head[at + 1..]
            }
            None => head,
        };

        let (protocol, address) = match net_part.find('(') {
            Some(open) => {
                let Some(address) = net_part[open + 1..].strip_suffix(')') else {
                    if net_part[open + 1..].contains(')') {
                        return Err(invalid("did you forget to escape a param value?"));
                    }
                    return Err(invalid(
                        "network address not terminated (missing closing brace)",
                    ));
                };
                (&net_part[..open], address)
            }
            None => (net_part, ""),
        };

        target.protocol = match protocol {
            "" | "tcp" => Protocol::Tcp,
            "unix" => Protocol::Unix,
            other => return Err(invalid(format!("unsupported network '{other}'"))),
        };

        target.address = match (target.protocol, address) {
            (Protocol::Tcp, "") => DEFAULT_TCP_ADDR.to_string(),
            (Protocol::Unix, "") => DEFAULT_UNIX_ADDR.to_string(),
            (Protocol::Tcp, addr) => ensure_port(addr),
            (Protocol::Unix, path) => path.to_string(),
        };

        // dbname[?param1=value1&...]
        match tail.split_once('?') {
            Some((db, query)) => {
                target.database = db.to_string();
                parse_params(&mut target, query)?;
            }
            None => target.database = tail.to_string(),
        }

        Ok(target)
    }
}

fn parse_params(target: &mut ServerTarget, query: &str) -> Result<()> {
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "timeout" => target.timeout = Some(parse_duration(&key, &value)?),
            "readTimeout" => target.read_timeout = Some(parse_duration(&key, &value)?),
            "tls" => target.tls = TlsMode::parse(&value),
            _ => target.params.push((key.into_owned(), value.into_owned())),
        }
    }
    Ok(())
}

fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    if value == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(value)
        .map_err(|e| invalid(format!("invalid {key} value '{value}': {e}")))
}

/// Appends the default port to a TCP address that has none.
fn ensure_port(addr: &str) -> String {
    if let Some(rest) = addr.strip_prefix('[') {
        if rest.contains("]:") {
            return addr.to_string();
        }
        return format!("{addr}:{DEFAULT_PORT}");
    }
    match addr.matches(':').count() {
        0 => format!("{addr}:{DEFAULT_PORT}"),
        1 => addr.to_string(),
        // Bare IPv6 literal.
        _ => format!("[{addr}]:{DEFAULT_PORT}"),
    }
}

fn invalid(msg: impl fmt::Display) -> CheckError {
    CheckError::InvalidDsn(format!("invalid DSN: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_dsn() {
        let t = ServerTarget::parse(
            "monitor:s3cr:et@tcp(db1.internal:3307)/mysql?timeout=2s&readTimeout=500ms&tls=custom&charset=utf8",
        )
        .unwrap();

        assert_eq!(t.user, "monitor");
        assert_eq!(t.password.as_deref(), Some("s3cr:et"));
        assert_eq!(t.protocol, Protocol::Tcp);
        assert_eq!(t.address, "db1.internal:3307");
        assert_eq!(t.database, "mysql");
        assert_eq!(t.connect_timeout(), Duration::from_secs(2));
        assert_eq!(t.read_timeout, Some(Duration::from_millis(500)));
        assert_eq!(t.tls, TlsMode::Profile("custom".to_string()));
        assert_eq!(t.params, vec![("charset".to_string(), "utf8".to_string())]);
        assert_eq!(t.host_port(), Some(("db1.internal", 3307)));
    }

    #[test]
    fn default_port_is_appended() {
        let t = ServerTarget::parse("root@tcp(localhost)/mysql").unwrap();
        assert_eq!(t.address, "localhost:3306");
        assert_eq!(t.user, "root");
        assert_eq!(t.password, None);
        assert_eq!(t.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn ipv6_addresses() {
        assert_eq!(ServerTarget::parse("tcp(::1)/").unwrap().address, "[::1]:3306");
        let t = ServerTarget::parse("tcp([fe80::1]:3307)/").unwrap();
        assert_eq!(t.address, "[fe80::1]:3307");
        assert_eq!(t.host_port(), Some(("fe80::1", 3307)));
    }

    #[test]
    fn defaults_without_address() {
        let t = ServerTarget::parse("/").unwrap();
        assert_eq!(t.protocol, Protocol::Tcp);
        assert_eq!(t.address, "127.0.0.1:3306");
        assert_eq!(t.database, "");

        let t = ServerTarget::parse("user@unix/app").unwrap();
        assert_eq!(t.protocol, Protocol::Unix);
        assert_eq!(t.address, "/tmp/mysql.sock");
        assert_eq!(t.host_port(), None);
    }

    #[test]
    fn unix_socket_path() {
        let t = ServerTarget::parse("root@unix(/var/run/mysqld/mysqld.sock)/mysql").unwrap();
        assert_eq!(t.protocol, Protocol::Unix);
        assert_eq!(t.address, "/var/run/mysqld/mysqld.sock");
        assert_eq!(t.database, "mysql");
    }

    #[test]
    fn password_may_contain_at_sign() {
        let t = ServerTarget::parse("user:p@ss@tcp(db:3306)/x").unwrap();
        assert_eq!(t.user, "user");
        assert_eq!(t.password.as_deref(), Some("p@ss"));
        assert_eq!(t.address, "db:3306");
    }

    #[test]
    fn tls_values() {
        let mode = |dsn: &str| ServerTarget::parse(dsn).unwrap().tls;
        assert_eq!(mode("/db"), TlsMode::Unspecified);
        assert_eq!(mode("/db?tls=true"), TlsMode::Verified);
        assert_eq!(mode("/db?tls=false"), TlsMode::Disabled);
        assert_eq!(mode("/db?tls=skip-verify"), TlsMode::SkipVerify);
        assert_eq!(mode("/db?tls=preferred"), TlsMode::Preferred);
        assert_eq!(mode("/db?tls=custom"), TlsMode::Profile("custom".into()));
    }

    #[test]
    fn zero_timeout_uses_default() {
        let t = ServerTarget::parse("/db?timeout=0").unwrap();
        assert_eq!(t.timeout, Some(Duration::ZERO));
        assert_eq!(t.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
    }

    #[test]
    fn invalid_dsns() {
        for dsn in [
            "localhost:3306",
            "root@tcp(localhost/mysql",
            "root@tcp(localhost)x/mysql",
            "root@udp(localhost)/mysql",
            "/db?timeout=soon",
        ] {
            let err = ServerTarget::parse(dsn).unwrap_err();
            assert!(err.is_config(), "{dsn}: {err}");
        }
    }

    #[test]
    fn missing_slash_message() {
        let err = ServerTarget::parse("root@localhost").unwrap_err();
        assert_eq!(
            err.to_string(),
            "error parsing server dsn: invalid DSN: missing the slash separating the database name"
        );
    }
}
