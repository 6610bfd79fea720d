// SPDX-License-Identifier: MPL-2.0

//! Encoding of a measurement set into a vector of field elements.

use crate::{client::EncodeError, field::Field, schema::MetricSchema};
use std::collections::BTreeMap;
use tracing::trace;

/// Measurements keyed by metric name.
pub type MeasurementSet = BTreeMap<String, u64>;

/// Maps `measurements` to a vector of length `schema.dimension()`.
///
/// Each metric writes its slots at the position fixed by the schema. Booleans take one slot;
/// integers are written as their binary expansion, most significant bit first. Schema metrics
/// missing from `measurements` are left as zero.
///
/// # Errors
///
/// [`EncodeError::UnknownMetric`] if a key is not in the schema, and
/// [`EncodeError::InvalidMeasurement`] if a value exceeds its metric's bound. Values are never
/// truncated or wrapped.
pub fn encode_measurements(
    schema: &MetricSchema,
    measurements: &MeasurementSet,
) -> Result<Vec<Field>, EncodeError> {
    // Every name must resolve before any value is checked.
    let located = measurements
        .iter()
        .map(|(name, value)| {
            let (offset, metric) = schema
                .position(name)
                .ok_or_else(|| EncodeError::UnknownMetric(name.clone()))?;
            Ok((name, *value, offset, metric))
        })
        .collect::<Result<Vec<_>, EncodeError>>()?;

    let mut data = vec![Field::zero(); schema.dimension()];
    for (name, value, offset, metric) in located {
        if value > metric.kind.max_value() {
            return Err(EncodeError::InvalidMeasurement {
                name: name.clone(),
                value,
            });
        }

        let width = metric.kind.width();
        for (i, slot) in data[offset..offset + width].iter_mut().enumerate() {
            let bit = (value >> (width - 1 - i)) & 1;
            *slot = Field::from(bit as u32);
        }
    }

    trace!(dimension = data.len(), "encoded measurements");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Metric;
    use assert_matches::assert_matches;

    fn measurements(pairs: &[(&str, u64)]) -> MeasurementSet {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn booleans_in_schema_order() {
        let schema = MetricSchema::new(vec![
            Metric::boolean("flagA"),
            Metric::boolean("flagB"),
            Metric::boolean("flagC"),
        ])
        .unwrap();
        let data = encode_measurements(
            &schema,
            &measurements(&[("flagC", 1), ("flagA", 1), ("flagB", 0)]),
        )
        .unwrap();
        assert_eq!(data, [Field::from(1), Field::from(0), Field::from(1)]);
    }

    #[test]
    fn missing_metrics_are_zero() {
        let schema = MetricSchema::browser_default();
        let data =
            encode_measurements(&schema, &measurements(&[("newTabPageEnabled", 1)])).unwrap();
        assert_eq!(data, [Field::zero(), Field::one(), Field::zero()]);

        let empty = encode_measurements(&schema, &MeasurementSet::new()).unwrap();
        assert_eq!(empty, vec![Field::zero(); 3]);
    }

    #[test]
    fn integers_are_bit_expanded() {
        let schema =
            MetricSchema::new(vec![Metric::integer("count", 4), Metric::boolean("flag")]).unwrap();
        let data =
            encode_measurements(&schema, &measurements(&[("count", 11), ("flag", 1)])).unwrap();
        // 11 = 0b1011
        let want: Vec<Field> = [1, 0, 1, 1, 1].iter().map(|x| Field::from(*x)).collect();
        assert_eq!(data, want);

        assert_matches!(
            encode_measurements(&schema, &measurements(&[("count", 16)])),
            Err(EncodeError::InvalidMeasurement { value: 16, .. })
        );
        encode_measurements(&schema, &measurements(&[("count", 15)])).unwrap();
    }

    #[test]
    fn rejects_bad_input() {
        let schema = MetricSchema::browser_default();
        assert_matches!(
            encode_measurements(&schema, &measurements(&[("browserIsUserDefault", 2)])),
            Err(EncodeError::InvalidMeasurement { name, value: 2 }) if name == "browserIsUserDefault"
        );
        for _ in 0..10 {
            assert_matches!(
                encode_measurements(
                    &schema,
                    &measurements(&[("newTabPageEnabled", 1), ("telemetryEnabled", 1)])
                ),
                Err(EncodeError::UnknownMetric(name)) if name == "telemetryEnabled"
            );
        }
    }

    #[test]
    fn unknown_metric_wins_over_bad_value() {
        let schema = MetricSchema::browser_default();
        // the out-of-range value sorts before the unknown name
        assert_matches!(
            encode_measurements(
                &schema,
                &measurements(&[("browserIsUserDefault", 2), ("zzzNotInSchema", 1)])
            ),
            Err(EncodeError::UnknownMetric(name)) if name == "zzzNotInSchema"
        );
    }
}
