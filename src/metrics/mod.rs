//! Typed metric model.
//!
//! - `family` - the closed table of metric family definitions
//! - `aggregator` - merges per-server observations into families
//! - `exposition` - conversion to the Prometheus data model and text format

mod aggregator;
pub mod exposition;
mod family;

pub use aggregator::{FamilyAggregator, MetricFamilyResult};
pub use family::{FAMILY_DEFINITIONS, MetricFamilyDefinition, family_definition};

use std::fmt;

/// Label attached to every observation identifying the server it came from.
pub const SERVER_LABEL: &str = "server";

/// Semantic kind of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// Monotonically non-decreasing accumulated value.
    Counter,
    /// Current value that can go up and down.
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
        }
    }
}

/// Label name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single numeric data point.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusObservation {
    pub kind: MetricKind,
    pub value: f64,
    pub labels: Vec<Label>,
}

impl StatusObservation {
    pub fn new(kind: MetricKind, value: f64) -> Self {
        Self {
            kind,
            value,
            labels: Vec::new(),
        }
    }

    /// Returns the value of the label with the given name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }
}

/// Observations produced for one server, grouped by family name.
///
/// Groups keep the order in which their family was first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationGroups {
    groups: Vec<(String, Vec<StatusObservation>)>,
}

impl ObservationGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the observations recorded for `family`.
    pub fn set(&mut self, family: impl Into<String>, observations: Vec<StatusObservation>) {
        let family = family.into();
        match self.groups.iter_mut().find(|(name, _)| *name == family) {
            Some((_, existing)) => *existing = observations,
            None => self.groups.push((family, observations)),
        }
    }

    pub fn get(&self, family: &str) -> Option<&[StatusObservation]> {
        self.groups
            .iter()
            .find(|(name, _)| name == family)
            .map(|(_, obs)| obs.as_slice())
    }

    /// Appends `label` to every observation in every group.
    pub fn tag_all(&mut self, label: &Label) {
        for (_, observations) in &mut self.groups {
            for observation in observations {
                observation.labels.push(label.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[StatusObservation])> {
        self.groups
            .iter()
            .map(|(name, obs)| (name.as_str(), obs.as_slice()))
    }
}

impl IntoIterator for ObservationGroups {
    type Item = (String, Vec<StatusObservation>);
    type IntoIter = std::vec::IntoIter<(String, Vec<StatusObservation>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_existing_group() {
        let mut groups = ObservationGroups::new();
        groups.set("uptime", vec![StatusObservation::new(MetricKind::Counter, 1.0)]);
        groups.set("queries", vec![StatusObservation::new(MetricKind::Counter, 5.0)]);
        groups.set("uptime", vec![StatusObservation::new(MetricKind::Counter, 2.0)]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.get("uptime").unwrap()[0].value, 2.0);
        let names: Vec<&str> = groups.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["uptime", "queries"]);
    }

    #[test]
    fn tag_all_labels_every_observation() {
        let mut groups = ObservationGroups::new();
        groups.set("uptime", vec![StatusObservation::new(MetricKind::Counter, 1.0)]);
        groups.set(
            "innodb_row_lock_current_waits",
            vec![StatusObservation::new(MetricKind::Gauge, 0.0)],
        );

        groups.tag_all(&Label::new(SERVER_LABEL, "db1:3306"));

        for (_, observations) in groups.iter() {
            for obs in observations {
                assert_eq!(obs.label(SERVER_LABEL), Some("db1:3306"));
            }
        }
    }
}
