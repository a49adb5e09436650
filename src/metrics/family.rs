//! Metric family definitions.
//!
//! The set of families is fixed: one per status variable the check reports.

use super::MetricKind;

/// Static description of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricFamilyDefinition {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
}

const fn counter(name: &'static str, help: &'static str) -> MetricFamilyDefinition {
    MetricFamilyDefinition {
        name,
        help,
        kind: MetricKind::Counter,
    }
}

const fn gauge(name: &'static str, help: &'static str) -> MetricFamilyDefinition {
    MetricFamilyDefinition {
        name,
        help,
        kind: MetricKind::Gauge,
    }
}

/// All families produced by the check, in output order.
pub static FAMILY_DEFINITIONS: [MetricFamilyDefinition; 9] = [
    counter(
        "uptime",
        "The number of seconds that the server has been up",
    ),
    counter(
        "connection_errors_internal",
        "The number of connections refused due to internal errors in the server, \
         such as failure to start a new thread or an out-of-memory condition.",
    ),
    counter(
        "connection_errors_max_connections",
        "The number of connections refused because the server max_connections limit was reached.",
    ),
    counter(
        "slow_queries",
        "The number of queries that have taken more than long_query_time seconds.",
    ),
    counter(
        "queries",
        "The number of statements executed by the server.",
    ),
    counter(
        "innodb_data_fsyncs",
        "The number of fsync() operations so far.",
    ),
    counter(
        "innodb_row_lock_waits",
        "The number of times operations on InnoDB tables had to wait for a row lock.",
    ),
    gauge(
        "innodb_row_lock_current_waits",
        "The number of row locks currently being waited for by operations on InnoDB tables.",
    ),
    counter(
        "table_locks_waited",
        "The number of times that a request for a table lock could not be granted \
         immediately and a wait was needed.",
    ),
];

/// Looks up a family definition by name.
pub fn family_definition(name: &str) -> Option<&'static MetricFamilyDefinition> {
    FAMILY_DEFINITIONS.iter().find(|def| def.name == name)
}
