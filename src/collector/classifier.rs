//! Classification of `SHOW GLOBAL STATUS` rows.
//!
//! A server reports several hundred status variables; only the ones with a
//! metric family are kept and everything else is skipped.

use crate::error::{CheckError, Result};
use crate::metrics::{MetricFamilyDefinition, MetricKind, family_definition};

/// A status row recognized as a metric family observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifiedRow {
    pub family: &'static MetricFamilyDefinition,
    pub kind: MetricKind,
    pub value: f64,
}

/// Classifies a status variable.
///
/// `name` is matched against the family table as given, so callers pass it
/// lower-cased. Returns `Ok(None)` for variables without a family, and an
/// error when a recognized variable's value is not a base-10 integer.
pub fn classify(name: &str, raw_value: &str) -> Result<Option<ClassifiedRow>> {
    let Some(family) = family_definition(name) else {
        return Ok(None);
    };

    let value = raw_value
        .parse::<i64>()
        .map_err(|_| CheckError::InvalidValue {
            name: name.to_string(),
            value: raw_value.to_string(),
        })?;

    Ok(Some(ClassifiedRow {
        family,
        kind: family.kind,
        value: value as f64,
    }))
}
