//! In-memory status source for testing collection without a server.
//!
//! Servers are keyed by their resolved address (`host:port` or socket
//! path), the same value the collector uses for the `server` label.

use std::collections::HashMap;
use std::io;

use super::{StatusRow, StatusSource};
use crate::dsn::ServerTarget;
use crate::error::{CheckError, Result};

#[derive(Debug, Clone)]
enum MockServer {
    Status(Vec<StatusRow>),
    ConnectRefused,
    QueryFails(String),
}

/// Status source serving canned snapshots.
#[derive(Debug, Clone, Default)]
pub struct MockStatusSource {
    servers: HashMap<String, MockServer>,
    attempts: Vec<String>,
}

impl MockStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `rows` for the server at `address`.
    pub fn add_server(&mut self, address: impl Into<String>, rows: Vec<StatusRow>) {
        self.servers.insert(address.into(), MockServer::Status(rows));
    }

    /// Makes connecting to `address` fail.
    pub fn refuse_connection(&mut self, address: impl Into<String>) {
        self.servers.insert(address.into(), MockServer::ConnectRefused);
    }

    /// Makes the status query against `address` fail with `message`.
    pub fn fail_query(&mut self, address: impl Into<String>, message: impl Into<String>) {
        self.servers
            .insert(address.into(), MockServer::QueryFails(message.into()));
    }

    /// Addresses contacted so far, in order.
    pub fn attempts(&self) -> &[String] {
        &self.attempts
    }

    /// A realistic snapshot: `Uptime` and `Queries` plus 50 unrelated variables.
    pub fn status_rows(uptime: i64, queries: i64) -> Vec<StatusRow> {
        let mut rows = Self::unrelated_rows(25);
        rows.push(StatusRow::new("Queries", queries.to_string()));
        rows.extend(
            Self::unrelated_rows(50)
                .into_iter()
                .skip(25),
        );
        rows.push(StatusRow::new("Uptime", uptime.to_string()));
        rows
    }

    /// `count` status variables that have no metric family.
    pub fn unrelated_rows(count: usize) -> Vec<StatusRow> {
        const FIXED: [(&str, &str); 8] = [
            ("Aborted_clients", "3"),
            ("Bytes_received", "1048576"),
            ("Innodb_buffer_pool_dump_status", "Dumping of buffer pool not started"),
            ("Rsa_public_key", ""),
            ("Ssl_cipher", ""),
            ("Threads_connected", "12"),
            ("Threads_running", "2"),
            ("Uptime_since_flush_status", "86400"),
        ];

        FIXED
            .iter()
            .map(|(name, value)| StatusRow::new(*name, *value))
            .chain((FIXED.len()..).map(|i| StatusRow::new(format!("Com_stmt_{i}"), i.to_string())))
            .take(count)
            .collect()
    }
}

impl StatusSource for MockStatusSource {
    fn global_status(&mut self, target: &ServerTarget) -> Result<Vec<StatusRow>> {
        self.attempts.push(target.address.clone());

        match self.servers.get(&target.address) {
            Some(MockServer::Status(rows)) => Ok(rows.clone()),
            Some(MockServer::QueryFails(message)) => Err(CheckError::Query(message.clone())),
            Some(MockServer::ConnectRefused) | None => Err(CheckError::Connect(sqlx::Error::Io(
                io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            ))),
        }
    }
}
