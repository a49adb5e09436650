//! Per-server status collection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   collect_server                     │
//! │  rows ──► classifier ──► ObservationGroups ──► tag   │
//! └──────────────────────────┬───────────────────────────┘
//!                            │
//!                   ┌────────▼────────┐
//!                   │  StatusSource   │ (trait)
//!                   └────────┬────────┘
//!                ┌───────────┴───────────┐
//!         ┌──────▼──────┐         ┌──────▼──────┐
//!         │ MySqlStatus │         │ MockStatus  │
//!         │   Source    │         │   Source    │
//!         └─────────────┘         └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use mysql_check::collector::{MockStatusSource, collect_server};
//! use mysql_check::dsn::ServerTarget;
//!
//! let target = ServerTarget::parse("root@tcp(localhost)/mysql").unwrap();
//! let mut source = MockStatusSource::new();
//! source.add_server("localhost:3306", MockStatusSource::status_rows(100, 42));
//!
//! let groups = collect_server(&mut source, &target).unwrap();
//! assert_eq!(groups.get("uptime").unwrap()[0].value, 100.0);
//! ```

pub mod classifier;
pub mod mock;
mod mysql;

pub use classifier::{ClassifiedRow, classify};
pub use mock::MockStatusSource;
pub use mysql::{MySqlStatusSource, STATUS_QUERY};

use tracing::{debug, info};

use crate::dsn::ServerTarget;
use crate::error::Result;
use crate::metrics::{Label, ObservationGroups, SERVER_LABEL, StatusObservation};

/// One `Variable_name`/`Value` row of the status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub name: String,
    pub value: String,
}

impl StatusRow {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Source of server status snapshots.
///
/// Implementations open one connection per call and close it before
/// returning, successfully or not.
pub trait StatusSource {
    /// Fetches every row of the global status snapshot of `target`.
    fn global_status(&mut self, target: &ServerTarget) -> Result<Vec<StatusRow>>;
}

impl<S: StatusSource + ?Sized> StatusSource for &mut S {
    fn global_status(&mut self, target: &ServerTarget) -> Result<Vec<StatusRow>> {
        (**self).global_status(target)
    }
}

/// Collects the observations of one server.
///
/// Every observation carries a `server` label set to the target's resolved
/// address. Errors are wrapped with the address and database name.
pub fn collect_server<S: StatusSource + ?Sized>(
    source: &mut S,
    target: &ServerTarget,
) -> Result<ObservationGroups> {
    collect_groups(source, target).map_err(|e| e.for_server(&target.address, &target.database))
}

fn collect_groups<S: StatusSource + ?Sized>(
    source: &mut S,
    target: &ServerTarget,
) -> Result<ObservationGroups> {
    let rows = source.global_status(target)?;
    debug!(server = %target.address, rows = rows.len(), "fetched server status");

    let mut groups = ObservationGroups::new();
    for row in &rows {
        let name = row.name.to_lowercase();
        if let Some(classified) = classify(&name, &row.value)? {
            groups.set(
                classified.family.name,
                vec![StatusObservation::new(classified.kind, classified.value)],
            );
        }
    }

    groups.tag_all(&Label::new(SERVER_LABEL, target.address.as_str()));
    info!(server = %target.address, families = groups.len(), "collected server status");
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;
    use crate::metrics::MetricKind;

    fn target(dsn: &str) -> ServerTarget {
        ServerTarget::parse(dsn).unwrap()
    }

    #[test]
    fn recognized_rows_become_labeled_observations() {
        let mut source = MockStatusSource::new();
        source.add_server("localhost:3306", MockStatusSource::status_rows(100, 42));

        let groups = collect_server(&mut source, &target("root@tcp(localhost)/mysql")).unwrap();

        assert_eq!(groups.len(), 2);
        let uptime = &groups.get("uptime").unwrap()[0];
        assert_eq!(uptime.kind, MetricKind::Counter);
        assert_eq!(uptime.value, 100.0);
        assert_eq!(uptime.label(SERVER_LABEL), Some("localhost:3306"));
        let queries = &groups.get("queries").unwrap()[0];
        assert_eq!(queries.value, 42.0);
        assert_eq!(queries.labels, uptime.labels);
    }

    #[test]
    fn names_are_matched_case_insensitively() {
        let mut source = MockStatusSource::new();
        source.add_server(
            "db:3306",
            vec![
                StatusRow::new("INNODB_ROW_LOCK_CURRENT_WAITS", "3"),
                StatusRow::new("Table_locks_waited", "7"),
            ],
        );

        let groups = collect_server(&mut source, &target("tcp(db)/")).unwrap();
        let waits = &groups.get("innodb_row_lock_current_waits").unwrap()[0];
        assert_eq!(waits.kind, MetricKind::Gauge);
        assert_eq!(waits.value, 3.0);
        assert_eq!(groups.get("table_locks_waited").unwrap()[0].value, 7.0);
    }

    #[test]
    fn repeated_variable_keeps_last_value() {
        let mut source = MockStatusSource::new();
        source.add_server(
            "db:3306",
            vec![StatusRow::new("Queries", "1"), StatusRow::new("Queries", "2")],
        );

        let groups = collect_server(&mut source, &target("tcp(db)/")).unwrap();
        let queries = groups.get("queries").unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].value, 2.0);
    }

    #[test]
    fn invalid_value_fails_with_context() {
        let mut source = MockStatusSource::new();
        let mut rows = MockStatusSource::status_rows(100, 42);
        rows.push(StatusRow::new("Slow_queries", "abc"));
        source.add_server("localhost:3306", rows);

        let err = collect_server(&mut source, &target("root@tcp(localhost)/mysql")).unwrap_err();
        assert!(err.is_data());
        assert_eq!(
            err.to_string(),
            "error collecting metrics for server: localhost:3306 db:mysql: \
             could not read server status value as integer slow_queries: abc"
        );
    }

    #[test]
    fn source_failure_is_wrapped() {
        let mut source = MockStatusSource::new();
        source.fail_query("db:3306", "Lost connection to MySQL server during query");

        let err = collect_server(&mut source, &target("tcp(db)/app")).unwrap_err();
        match err {
            CheckError::Server { addr, db, source } => {
                assert_eq!(addr, "db:3306");
                assert_eq!(db, "app");
                assert!(matches!(*source, CheckError::Query(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn no_recognized_rows_yields_no_groups() {
        let mut source = MockStatusSource::new();
        source.add_server("db:3306", MockStatusSource::unrelated_rows(10));

        let groups = collect_server(&mut source, &target("tcp(db)/")).unwrap();
        assert!(groups.is_empty());
    }
}
