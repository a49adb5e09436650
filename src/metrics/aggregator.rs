//! Merges per-server observation groups into metric families.

use tracing::debug;

use super::family::{FAMILY_DEFINITIONS, MetricFamilyDefinition};
use super::{ObservationGroups, StatusObservation};
use crate::error::{CheckError, Result};

/// A family definition together with the observations gathered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamilyResult {
    pub definition: &'static MetricFamilyDefinition,
    pub observations: Vec<StatusObservation>,
}

impl MetricFamilyResult {
    pub fn name(&self) -> &'static str {
        self.definition.name
    }
}

/// Accumulates observations into the fixed set of families.
///
/// Every family is present in the output, with or without observations.
#[derive(Debug)]
pub struct FamilyAggregator {
    families: Vec<MetricFamilyResult>,
}

impl Default for FamilyAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl FamilyAggregator {
    pub fn new() -> Self {
        Self {
            families: FAMILY_DEFINITIONS
                .iter()
                .map(|definition| MetricFamilyResult {
                    definition,
                    observations: Vec::new(),
                })
                .collect(),
        }
    }

    /// Appends one server's groups to the matching families.
    ///
    /// A group without a matching family, or an observation whose kind
    /// differs from the family's, fails the whole merge.
    pub fn merge(&mut self, groups: ObservationGroups) -> Result<()> {
        for (name, observations) in groups {
            let family = self
                .families
                .iter_mut()
                .find(|f| f.definition.name == name)
                .ok_or_else(|| CheckError::UnknownFamily(name.clone()))?;

            if let Some(bad) = observations
                .iter()
                .find(|obs| obs.kind != family.definition.kind)
            {
                return Err(CheckError::KindMismatch {
                    family: name,
                    expected: family.definition.kind,
                    actual: bad.kind,
                });
            }

            debug!(family = %name, count = observations.len(), "merging observations");
            family.observations.extend(observations);
        }
        Ok(())
    }

    pub fn finish(self) -> Vec<MetricFamilyResult> {
        self.families
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Label, MetricKind, SERVER_LABEL};

    fn counter(value: f64, server: &str) -> StatusObservation {
        let mut obs = StatusObservation::new(MetricKind::Counter, value);
        obs.labels.push(Label::new(SERVER_LABEL, server));
        obs
    }

    #[test]
    fn empty_families_are_kept() {
        let families = FamilyAggregator::new().finish();
        assert_eq!(families.len(), 9);
        assert!(families.iter().all(|f| f.observations.is_empty()));
        assert_eq!(families[0].name(), "uptime");
    }

    #[test]
    fn merge_appends_in_server_order() {
        let mut agg = FamilyAggregator::new();
        for (server, uptime) in [("a:3306", 10.0), ("b:3306", 20.0)] {
            let mut groups = ObservationGroups::new();
            groups.set("uptime", vec![counter(uptime, server)]);
            agg.merge(groups).unwrap();
        }

        let families = agg.finish();
        let uptime = families.iter().find(|f| f.name() == "uptime").unwrap();
        let servers: Vec<_> = uptime
            .observations
            .iter()
            .map(|o| (o.label(SERVER_LABEL).unwrap(), o.value))
            .collect();
        assert_eq!(servers, vec![("a:3306", 10.0), ("b:3306", 20.0)]);
    }

    #[test]
    fn unknown_group_is_rejected() {
        let mut agg = FamilyAggregator::new();
        let mut groups = ObservationGroups::new();
        groups.set("threads_running", vec![counter(3.0, "a:3306")]);

        let err = agg.merge(groups).unwrap_err();
        assert!(matches!(err, CheckError::UnknownFamily(ref name) if name == "threads_running"));
        assert!(err.is_data());
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut agg = FamilyAggregator::new();
        let mut groups = ObservationGroups::new();
        groups.set(
            "uptime",
            vec![StatusObservation::new(MetricKind::Gauge, 1.0)],
        );

        let err = agg.merge(groups).unwrap_err();
        assert_eq!(
            err.to_string(),
            "metric family uptime is a counter but received a gauge observation"
        );
    }
}
