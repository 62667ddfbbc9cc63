use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::error::ErrorKind;

/// One reference row of a sensor calibration curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub resistance: f64,
    pub temperature: f64,
}

impl CalibrationPoint {
    #[must_use]
    pub const fn new(resistance: f64, temperature: f64) -> Self {
        Self {
            resistance,
            temperature,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("calibration table has no points")]
    Empty,
    #[error("calibration point {index} is not a finite number")]
    NonFinite { index: usize },
    #[error("duplicate resistance {resistance} in calibration table")]
    DuplicateResistance { resistance: f64 },
    #[error("temperature is not strictly monotonic around resistance {resistance}")]
    NonMonotonic { resistance: f64 },
    #[error("invalid calibration dataset: {0}")]
    Dataset(String),
}

impl CalibrationError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidCalibration
    }
}

/// A value could not be turned into a physical reading.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("voltage {voltage} V is outside [0, {vin}) V")]
    VoltageOutOfRange { voltage: f64, vin: f64 },
    #[error("resistance {resistance} is outside calibration domain [{min}, {max}]")]
    ResistanceOutOfRange { resistance: f64, min: f64, max: f64 },
    #[error("raw reading {0} mV is not a finite number")]
    NonFinite(f64),
}

impl ConversionError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::ConversionOutOfRange
    }
}

/// Monotonic resistance → temperature lookup with linear interpolation.
///
/// Points are kept sorted by ascending resistance. Temperature must be strictly
/// monotonic along that order (either direction, so NTC and PTC sensors both fit).
/// Lookups outside the sampled resistance domain fail instead of extrapolating.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    points: Vec<CalibrationPoint>,
    min: f64,
    max: f64,
}

impl CalibrationTable {
    /// Build a table from reference points in any order.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError` if `points` is empty, holds a non-finite value,
    /// repeats a resistance, or is not strictly monotonic in temperature once
    /// sorted by resistance.
    pub fn build(
        points: impl IntoIterator<Item = CalibrationPoint>,
    ) -> Result<Self, CalibrationError> {
        let mut points: Vec<CalibrationPoint> = points.into_iter().collect();

        if points.is_empty() {
            return Err(CalibrationError::Empty);
        }
        if let Some(index) = points
            .iter()
            .position(|p| !p.resistance.is_finite() || !p.temperature.is_finite())
        {
            return Err(CalibrationError::NonFinite { index });
        }

        points.sort_by(|a, b| a.resistance.total_cmp(&b.resistance));

        for pair in points.windows(2) {
            if let [a, b] = pair {
                if a.resistance.total_cmp(&b.resistance).is_eq() {
                    return Err(CalibrationError::DuplicateResistance {
                        resistance: a.resistance,
                    });
                }
            }
        }

        let rising = points
            .windows(2)
            .all(|w| matches!(w, [a, b] if b.temperature > a.temperature));
        let falling = points
            .windows(2)
            .all(|w| matches!(w, [a, b] if b.temperature < a.temperature));
        if !rising && !falling {
            let resistance = first_direction_change(&points).unwrap_or(f64::NAN);
            return Err(CalibrationError::NonMonotonic { resistance });
        }

        let (min, max) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first.resistance, last.resistance),
            _ => return Err(CalibrationError::Empty),
        };

        Ok(Self { points, min, max })
    }

    /// Build a table from dataset rows as published.
    ///
    /// Datasheets usually list thermistor rows by decreasing resistance; such a
    /// dataset is reversed before the table is built.
    ///
    /// # Errors
    ///
    /// Returns `CalibrationError` under the same conditions as [`Self::build`].
    pub fn from_dataset_rows(mut rows: Vec<CalibrationPoint>) -> Result<Self, CalibrationError> {
        let decreasing = rows.len() > 1
            && rows
                .windows(2)
                .all(|w| matches!(w, [a, b] if b.resistance < a.resistance));
        if decreasing {
            rows.reverse();
        }
        Self::build(rows)
    }

    /// Temperature at `resistance`, interpolated between the bracketing points.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError::ResistanceOutOfRange` if `resistance` is NaN or
    /// lies outside the table domain.
    pub fn lookup(&self, resistance: f64) -> Result<f64, ConversionError> {
        let out_of_range = || ConversionError::ResistanceOutOfRange {
            resistance,
            min: self.min,
            max: self.max,
        };

        if resistance.is_nan() || resistance < self.min || resistance > self.max {
            return Err(out_of_range());
        }

        let upper = self.points.partition_point(|p| p.resistance < resistance);
        let hi = self.points.get(upper).ok_or_else(out_of_range)?;
        if hi.resistance.total_cmp(&resistance).is_eq() {
            return Ok(hi.temperature);
        }

        let lo = upper
            .checked_sub(1)
            .and_then(|i| self.points.get(i))
            .ok_or_else(out_of_range)?;

        let fraction = (resistance - lo.resistance) / (hi.resistance - lo.resistance);
        Ok((hi.temperature - lo.temperature).mul_add(fraction, lo.temperature))
    }

    /// Inclusive resistance domain `(min, max)`.
    #[must_use]
    pub const fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }
}

fn first_direction_change(points: &[CalibrationPoint]) -> Option<f64> {
    let mut previous_sign = None;
    for pair in points.windows(2) {
        if let [a, b] = pair {
            let sign = (b.temperature - a.temperature).partial_cmp(&0.0)?;
            if sign.is_eq() {
                return Some(b.resistance);
            }
            match previous_sign {
                Some(prev) if prev != sign => return Some(b.resistance),
                _ => previous_sign = Some(sign),
            }
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn ntc_table() -> CalibrationTable {
        CalibrationTable::build(vec![
            CalibrationPoint::new(32.65, 0.0),
            CalibrationPoint::new(19.90, 10.0),
            CalibrationPoint::new(12.49, 20.0),
            CalibrationPoint::new(10.00, 25.0),
            CalibrationPoint::new(8.06, 30.0),
        ])
        .expect("valid table")
    }

    #[test]
    fn build_sorts_by_resistance() {
        let table = ntc_table();
        let resistances: Vec<f64> = table.points().iter().map(|p| p.resistance).collect();
        assert_eq!(resistances, vec![8.06, 10.00, 12.49, 19.90, 32.65]);
        assert_eq!(table.domain(), (8.06, 32.65));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn build_rejects_empty() {
        assert_eq!(
            CalibrationTable::build(Vec::new()),
            Err(CalibrationError::Empty)
        );
    }

    #[test]
    fn build_rejects_duplicate_resistance() {
        let result = CalibrationTable::build(vec![
            CalibrationPoint::new(10.0, 25.0),
            CalibrationPoint::new(10.0, 26.0),
        ]);
        assert!(matches!(
            result,
            Err(CalibrationError::DuplicateResistance { .. })
        ));
    }

    #[test]
    fn build_rejects_non_monotonic_temperatures() {
        let result = CalibrationTable::build(vec![
            CalibrationPoint::new(1.0, 10.0),
            CalibrationPoint::new(2.0, 20.0),
            CalibrationPoint::new(3.0, 15.0),
        ]);
        let err = result.expect_err("non monotonic");
        assert_eq!(err, CalibrationError::NonMonotonic { resistance: 3.0 });
        assert_eq!(err.kind(), ErrorKind::InvalidCalibration);
    }

    #[test]
    fn build_rejects_flat_segment() {
        let result = CalibrationTable::build(vec![
            CalibrationPoint::new(1.0, 10.0),
            CalibrationPoint::new(2.0, 10.0),
        ]);
        assert!(matches!(result, Err(CalibrationError::NonMonotonic { .. })));
    }

    #[test]
    fn build_rejects_nan() {
        let result = CalibrationTable::build(vec![
            CalibrationPoint::new(1.0, 10.0),
            CalibrationPoint::new(f64::NAN, 20.0),
        ]);
        assert_eq!(result, Err(CalibrationError::NonFinite { index: 1 }));
    }

    #[test]
    fn single_point_table_answers_its_own_point() {
        let table = CalibrationTable::build(vec![CalibrationPoint::new(10.0, 25.0)])
            .expect("single point");
        assert_eq!(table.lookup(10.0), Ok(25.0));
        assert!(table.lookup(10.5).is_err());
    }

    #[test]
    fn lookup_is_exact_at_every_sample_point() {
        let table = ntc_table();
        for point in table.points() {
            let t = table.lookup(point.resistance).expect("in domain");
            assert!((t - point.temperature).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn lookup_interpolates_linearly() {
        let table = CalibrationTable::build(vec![
            CalibrationPoint::new(10.0, 20.0),
            CalibrationPoint::new(20.0, 10.0),
        ])
        .expect("valid");
        let t = table.lookup(15.0).expect("in domain");
        assert!((t - 15.0).abs() < 1e-12);
        let t = table.lookup(12.5).expect("in domain");
        assert!((t - 17.5).abs() < 1e-12);
    }

    #[test]
    fn lookup_is_continuous_across_segments() {
        let table = ntc_table();
        let eps = 1e-9;
        for point in table.points().iter().skip(1).take(3) {
            let below = table.lookup(point.resistance - eps).expect("below");
            let above = table.lookup(point.resistance + eps).expect("above");
            assert!((below - point.temperature).abs() < 1e-6);
            assert!((above - point.temperature).abs() < 1e-6);
        }
    }

    #[test]
    fn lookup_rejects_values_outside_domain() {
        let table = ntc_table();
        let below = table.lookup(8.0).expect_err("below domain");
        assert!(matches!(below, ConversionError::ResistanceOutOfRange { .. }));
        assert_eq!(below.kind(), ErrorKind::ConversionOutOfRange);
        assert!(table.lookup(33.0).is_err());
        assert!(table.lookup(f64::NAN).is_err());
        assert!(table.lookup(f64::INFINITY).is_err());
    }

    #[test]
    fn dataset_rows_in_decreasing_order_are_reversed() {
        let rows = vec![
            CalibrationPoint::new(30.0, 0.0),
            CalibrationPoint::new(20.0, 10.0),
            CalibrationPoint::new(10.0, 25.0),
        ];
        let table = CalibrationTable::from_dataset_rows(rows).expect("valid dataset");
        assert_eq!(table.domain(), (10.0, 30.0));
        assert_eq!(table.lookup(20.0), Ok(10.0));
    }
}
