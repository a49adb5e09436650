//! Rendering of gathered families in the Prometheus text exposition format.

use prometheus::proto::{self, MetricType};
use prometheus::{Encoder, TextEncoder};

use super::{MetricFamilyResult, MetricKind};
use crate::error::Result;

/// Converts a gathered family into the Prometheus data model.
pub fn to_proto(family: &MetricFamilyResult) -> proto::MetricFamily {
    let mut mf = proto::MetricFamily::default();
    mf.set_name(family.definition.name.to_string());
    mf.set_help(family.definition.help.to_string());
    mf.set_field_type(match family.definition.kind {
        MetricKind::Counter => MetricType::COUNTER,
        MetricKind::Gauge => MetricType::GAUGE,
    });

    for observation in &family.observations {
        let mut metric = proto::Metric::default();
        for label in &observation.labels {
            let mut pair = proto::LabelPair::default();
            pair.set_name(label.name.clone());
            pair.set_value(label.value.clone());
            metric.mut_label().push(pair);
        }
        match observation.kind {
            MetricKind::Counter => {
                let mut counter = proto::Counter::default();
                counter.set_value(observation.value);
                metric.set_counter(counter);
            }
            MetricKind::Gauge => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(observation.value);
                metric.set_gauge(gauge);
            }
        }
        mf.mut_metric().push(metric);
    }
    mf
}

/// Renders families as exposition text.
///
/// The text encoder refuses families without samples, so empty families
/// are left out of the rendered output.
pub fn encode_text(families: &[MetricFamilyResult]) -> Result<String> {
    let protos: Vec<proto::MetricFamily> = families
        .iter()
        .filter(|f| !f.observations.is_empty())
        .map(to_proto)
        .collect();

    let mut buf = Vec::new();
    TextEncoder::new().encode(&protos, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
