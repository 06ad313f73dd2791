//! Calibration of the raw-value window mapped onto the angle gauge.

use crate::domain::angle::ReadingHistory;
use crate::domain::models::CalibrationRange;
use thiserror::Error;

/// Readings required before auto-calibration is meaningful.
pub const MIN_CALIBRATION_SAMPLES: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("need at least 10 readings for calibration")]
    InsufficientData,
    #[error("min and max values are the same")]
    DegenerateRange,
}

/// Owns the active calibration range. On any failure the current range
/// is left untouched.
#[derive(Debug, Default)]
pub struct Calibrator {
    range: CalibrationRange,
}

impl Calibrator {
    pub fn range(&self) -> CalibrationRange {
        self.range
    }

    /// Derive a range from the observed min/max of recent readings.
    pub fn auto_calibrate(
        &mut self,
        history: &ReadingHistory,
    ) -> Result<CalibrationRange, CalibrationError> {
        if history.len() < MIN_CALIBRATION_SAMPLES {
            return Err(CalibrationError::InsufficientData);
        }

        let mut min = i32::MAX;
        let mut max = i32::MIN;
        for reading in history.snapshot() {
            min = min.min(reading.value);
            max = max.max(reading.value);
        }

        if min == max {
            return Err(CalibrationError::DegenerateRange);
        }

        self.range = CalibrationRange { min, max };
        Ok(self.range)
    }

    /// Apply a user-entered range.
    pub fn set_manual(&mut self, min: i32, max: i32) -> Result<CalibrationRange, CalibrationError> {
        if min == max {
            return Err(CalibrationError::DegenerateRange);
        }
        self.range = CalibrationRange { min, max };
        Ok(self.range)
    }

    /// Restore the default 0-1023 window. Always succeeds.
    pub fn reset(&mut self) -> CalibrationRange {
        self.range = CalibrationRange::DEFAULT;
        self.range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Reading;
    use std::time::Instant;

    fn history_of(values: &[i32]) -> ReadingHistory {
        let mut history = ReadingHistory::new();
        for &value in values {
            history.push(Reading {
                value,
                angle: 0,
                timestamp: Instant::now(),
            });
        }
        history
    }

    #[test]
    fn too_few_samples_leaves_range_unchanged() {
        let mut calibrator = Calibrator::default();
        let history = history_of(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);

        assert_eq!(
            calibrator.auto_calibrate(&history),
            Err(CalibrationError::InsufficientData)
        );
        assert_eq!(calibrator.range(), CalibrationRange::DEFAULT);
    }

    #[test]
    fn identical_samples_are_degenerate() {
        let mut calibrator = Calibrator::default();
        let history = history_of(&[10; 12]);

        assert_eq!(
            calibrator.auto_calibrate(&history),
            Err(CalibrationError::DegenerateRange)
        );
        assert_eq!(calibrator.range(), CalibrationRange::DEFAULT);
    }

    #[test]
    fn derives_min_and_max_from_history() {
        let mut calibrator = Calibrator::default();
        let history = history_of(&[3, 3, 3, 7, 50, 12, 9, 30, 4, 41, 8]);

        let range = calibrator.auto_calibrate(&history).unwrap();
        assert_eq!(range, CalibrationRange { min: 3, max: 50 });
        assert_eq!(calibrator.range(), range);
    }

    #[test]
    fn manual_range_rejects_equal_bounds() {
        let mut calibrator = Calibrator::default();
        assert_eq!(
            calibrator.set_manual(200, 200),
            Err(CalibrationError::DegenerateRange)
        );
        assert_eq!(calibrator.range(), CalibrationRange::DEFAULT);

        let range = calibrator.set_manual(100, 900).unwrap();
        assert_eq!(range, CalibrationRange { min: 100, max: 900 });
    }

    #[test]
    fn reset_restores_the_default_window() {
        let mut calibrator = Calibrator::default();
        calibrator.set_manual(5, 55).unwrap();
        assert_eq!(calibrator.reset(), CalibrationRange::DEFAULT);
    }
}
