//! mysql-check - server health metrics from MySQL status variables.
//!
//! Provides:
//! - `config` - run configuration (servers, TLS settings)
//! - `dsn` - server connection string parsing
//! - `tls` - custom TLS profile loading
//! - `collector` - per-server status collection and row classification
//! - `metrics` - typed metric model, family aggregation, exposition
//! - `gather` - the pipeline tying them together
//!
//! ```no_run
//! use mysql_check::{CheckConfig, gather, metrics::exposition};
//!
//! let config = CheckConfig::new(["root@tcp(localhost)/mysql"]);
//! let families = gather(&config)?;
//! print!("{}", exposition::encode_text(&families)?);
//! # Ok::<(), mysql_check::CheckError>(())
//! ```

pub mod collector;
pub mod config;
pub mod dsn;
pub mod error;
pub mod gather;
pub mod metrics;
pub mod tls;

pub use config::{CheckConfig, TlsSettings};
pub use error::{CheckError, Result};
pub use gather::{gather, gather_with};
