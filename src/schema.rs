// SPDX-License-Identifier: MPL-2.0

//! The measurement schema: the ordered list of metrics a client reports.
//!
//! The order of the metrics fixes the position of each value in the encoded vector. Clients and
//! servers must agree on it out of band, and changing it breaks the protocol.

use crate::field::N_ROOTS;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Errors raised while building a schema.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema lists no metrics.
    #[error("schema has no metrics")]
    Empty,
    /// Two metrics share a name.
    #[error("duplicate metric name {0:?}")]
    DuplicateName(String),
    /// An integer metric's bit width is outside `1..=32`.
    #[error("metric {name:?} has unsupported bit width {bits}")]
    InvalidBitWidth {
        /// Metric name.
        name: String,
        /// Requested bit width.
        bits: u8,
    },
    /// The encoded vector would be too long for the proof system.
    #[error("schema dimension {0} exceeds maximum of {max}", max = max_dimension())]
    TooLarge(usize),
    /// The number of aggregated values passed for decoding does not match the dimension.
    #[error("expected {expected} values, got {got}")]
    DimensionMismatch {
        /// Dimension of the schema.
        expected: usize,
        /// Length of the input.
        got: usize,
    },
}

/// What kind of value a metric carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricKind {
    /// A single 0/1 flag.
    Boolean,
    /// An unsigned integer in `[0, 2^bits)`, encoded as `bits` boolean slots.
    Integer {
        /// Bit width of the value.
        bits: u8,
    },
}

impl MetricKind {
    /// Number of field elements this metric occupies.
    pub fn width(&self) -> usize {
        match self {
            MetricKind::Boolean => 1,
            MetricKind::Integer { bits } => usize::from(*bits),
        }
    }

    /// Largest value the metric accepts.
    pub fn max_value(&self) -> u64 {
        match self {
            MetricKind::Boolean => 1,
            MetricKind::Integer { bits } => 1u64
                .checked_shl(u32::from(*bits))
                .map_or(u64::MAX, |bound| bound - 1),
        }
    }
}

/// A named metric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Name used as the key in a measurement set.
    pub name: String,
    /// Value kind.
    #[serde(flatten)]
    pub kind: MetricKind,
}

impl Metric {
    /// A boolean metric.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Boolean,
        }
    }

    /// An integer metric of the given bit width.
    pub fn integer(name: impl Into<String>, bits: u8) -> Self {
        Self {
            name: name.into(),
            kind: MetricKind::Integer { bits },
        }
    }
}

/// Maximum number of field elements a client may encode. The proof interpolates polynomials
/// through `(dimension + 1).next_power_of_two()` points and evaluates their product at twice
/// as many roots of unity, all of which must exist in the field.
pub const fn max_dimension() -> usize {
    (N_ROOTS as usize >> 1) - 1
}

/// An ordered, validated list of metrics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Metric>", into = "Vec<Metric>")]
pub struct MetricSchema {
    metrics: Vec<Metric>,
    dimension: usize,
}

impl MetricSchema {
    /// Builds a schema from metrics in protocol order.
    pub fn new(metrics: Vec<Metric>) -> Result<Self, SchemaError> {
        if metrics.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::with_capacity(metrics.len());
        let mut dimension = 0;
        for metric in &metrics {
            if !seen.insert(metric.name.as_str()) {
                return Err(SchemaError::DuplicateName(metric.name.clone()));
            }
            if let MetricKind::Integer { bits } = metric.kind {
                if !(1..=32).contains(&bits) {
                    return Err(SchemaError::InvalidBitWidth {
                        name: metric.name.clone(),
                        bits,
                    });
                }
            }
            dimension += metric.kind.width();
        }

        if dimension > max_dimension() {
            return Err(SchemaError::TooLarge(dimension));
        }

        Ok(Self { metrics, dimension })
    }

    /// The three boolean browser metrics reported by the desktop telemetry client.
    pub fn browser_default() -> Self {
        Self {
            metrics: vec![
                Metric::boolean("browserIsUserDefault"),
                Metric::boolean("newTabPageEnabled"),
                Metric::boolean("userChromeCssLoaded"),
            ],
            dimension: 3,
        }
    }

    /// Metrics in protocol order.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Number of field elements in an encoded measurement.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Position of the first slot of `name` in the encoded vector, with its metric.
    pub fn position(&self, name: &str) -> Option<(usize, &Metric)> {
        let mut offset = 0;
        for metric in &self.metrics {
            if metric.name == name {
                return Some((offset, metric));
            }
            offset += metric.kind.width();
        }
        None
    }

    /// Folds per-slot sums (for example, reconstructed aggregates) back into one total per
    /// metric. Integer metrics weight their bit slots by powers of two, most significant first.
    pub fn decode_sums(&self, slots: &[u64]) -> Result<Vec<(String, u64)>, SchemaError> {
        if slots.len() != self.dimension {
            return Err(SchemaError::DimensionMismatch {
                expected: self.dimension,
                got: slots.len(),
            });
        }

        let mut out = Vec::with_capacity(self.metrics.len());
        let mut slots = slots.iter();
        for metric in &self.metrics {
            let total = slots
                .by_ref()
                .take(metric.kind.width())
                .fold(0u64, |acc, s| (acc << 1).wrapping_add(*s));
            out.push((metric.name.clone(), total));
        }
        Ok(out)
    }
}

impl TryFrom<Vec<Metric>> for MetricSchema {
    type Error = SchemaError;

    fn try_from(metrics: Vec<Metric>) -> Result<Self, SchemaError> {
        Self::new(metrics)
    }
}

impl From<MetricSchema> for Vec<Metric> {
    fn from(schema: MetricSchema) -> Self {
        schema.metrics
    }
}

impl Default for MetricSchema {
    fn default() -> Self {
        Self::browser_default()
    }
}
