//! Check pipeline.
//!
//! Validates the configuration, parses every server target, builds the TLS
//! profile, then collects each server in order. The first failure aborts
//! the run; nothing is returned for the servers that did succeed.

use tracing::{debug, info};

use crate::collector::{MySqlStatusSource, StatusSource, collect_server};
use crate::config::CheckConfig;
use crate::dsn::{ServerTarget, TlsMode};
use crate::error::{CheckError, Result, TlsError};
use crate::metrics::{FamilyAggregator, MetricFamilyResult};
use crate::tls::TlsProfile;

/// Gathers metric families from every configured server.
pub fn gather(config: &CheckConfig) -> Result<Vec<MetricFamilyResult>> {
    gather_with(config, MySqlStatusSource::new)
}

/// Like [`gather`], with the status source created by `make_source` from
/// the run's TLS profile.
///
/// `make_source` is only called once the configuration, targets and TLS
/// material are known to be valid.
pub fn gather_with<S, F>(config: &CheckConfig, make_source: F) -> Result<Vec<MetricFamilyResult>>
where
    S: StatusSource,
    F: FnOnce(Option<TlsProfile>) -> Result<S>,
{
    config.validate()?;

    let tls = TlsProfile::build(&config.tls).map_err(|e| CheckError::tls("invalid TLS Config", e))?;
    let targets = parse_targets(&config.servers)?;
    if tls.is_none() {
        check_profile_requests(&targets)?;
    }

    let mut source = make_source(tls)?;
    gather_from(&mut source, &targets)
}

/// Parses connection strings, skipping blank entries.
pub fn parse_targets(servers: &[String]) -> Result<Vec<ServerTarget>> {
    let targets = servers
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ServerTarget::parse)
        .collect::<Result<Vec<_>>>()?;

    if targets.is_empty() {
        return Err(CheckError::NoServers);
    }
    Ok(targets)
}

/// Fails if any target names a TLS profile, for runs that have none.
fn check_profile_requests(targets: &[ServerTarget]) -> Result<()> {
    for target in targets {
        if let TlsMode::Profile(name) = &target.tls {
            return Err(CheckError::tls(
                "invalid TLS Config",
                TlsError::UnknownProfile(name.clone()),
            )
            .for_server(&target.address, &target.database));
        }
    }
    Ok(())
}

/// Collects `targets` in order and aggregates the results.
pub fn gather_from<S: StatusSource + ?Sized>(
    source: &mut S,
    targets: &[ServerTarget],
) -> Result<Vec<MetricFamilyResult>> {
    if targets.is_empty() {
        return Err(CheckError::NoServers);
    }

    let mut collected = Vec::with_capacity(targets.len());
    for target in targets {
        debug!(server = %target.address, db = %target.database, "collecting");
        collected.push(collect_server(source, target)?);
    }

    let mut aggregator = FamilyAggregator::new();
    for groups in collected {
        aggregator.merge(groups)?;
    }

    let families = aggregator.finish();
    info!(
        servers = targets.len(),
        observations = families.iter().map(|f| f.observations.len()).sum::<usize>(),
        "gathered metrics"
    );
    Ok(families)
}
