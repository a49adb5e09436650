//! mysql-check - observability metrics from MySQL databases.
//!
//! Connects to each server, reads `SHOW GLOBAL STATUS` and prints the
//! selected counters and gauges in the Prometheus text format.
//!
//! Usage:
//!   mysql-check -s 'root@tcp(localhost)/mysql'
//!   mysql-check -s 'monitor:pw@tcp(db1:3306)/mysql,monitor:pw@tcp(db2:3306)/mysql'
//!   SERVERS='root@tcp(db)/mysql?tls=custom' TLS_CA=/etc/mysql/ca.pem mysql-check

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::EnvFilter;

use mysql_check::metrics::exposition;
use mysql_check::{CheckConfig, TlsSettings, gather};

/// Check for producing observability metrics from mysql databases.
#[derive(Parser)]
#[command(name = "mysql-check", about, version)]
struct Args {
    /// A list of one or more server connection URLs in DSN format.
    #[arg(short, long, env = "SERVERS", value_delimiter = ',')]
    servers: Vec<String>,

    /// Path to a ca.pem file for custom TLS config.
    #[arg(long, env = "TLS_CA", value_name = "PATH")]
    tls_ca: Option<PathBuf>,

    /// Path to a cert.pem file for custom TLS config.
    #[arg(long, env = "TLS_CERT", value_name = "PATH")]
    tls_cert: Option<PathBuf>,

    /// Path to a key.pem file for custom TLS config.
    #[arg(long, env = "TLS_KEY", value_name = "PATH")]
    tls_key: Option<PathBuf>,

    /// If true, use TLS but skip chain & host verification for custom TLS config.
    #[arg(long, env = "INSECURE_SKIP_VERIFY")]
    insecure_skip_verify: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only log errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn into_config(self) -> CheckConfig {
        CheckConfig::new(self.servers).with_tls(TlsSettings {
            ca: self.tls_ca,
            cert: self.tls_cert,
            key: self.tls_key,
            insecure_skip_verify: self.insecure_skip_verify,
        })
    }
}

/// Check result states, as exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckState {
    Ok = 0,
    Critical = 2,
}

/// Initializes the tracing subscriber on stderr; stdout carries the metrics.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("mysql_check={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(config: &CheckConfig) -> CheckState {
    let families = match gather(config) {
        Ok(families) => families,
        Err(e) => {
            error!(error = %e, "check failed");
            println!("{}", e);
            return CheckState::Critical;
        }
    };

    match exposition::encode_text(&families) {
        Ok(text) => {
            print!("{}", text);
            CheckState::Ok
        }
        Err(e) => {
            println!("{}", e);
            CheckState::Critical
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = args.into_config();
    ExitCode::from(run(&config) as u8)
}
