//! Low/high split of one pitch

use crate::error::Error;
use std::time::Duration;

/// Phase durations derived once from pitch and low-occupancy ratio.
///
/// `low + high == pitch` exactly: the low phase is rounded to the nearest
/// microsecond and the high phase takes the remainder, so the same two
/// durations repeat every cycle without drift.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DutyCycleSchedule {
    pub pitch_us: u64,
    pub ratio: f64,
    pub low_us: u64,
    pub high_us: u64,
}

impl DutyCycleSchedule {
    pub fn new(pitch_us: u64, ratio: f64) -> Result<Self, Error> {
        if pitch_us == 0 {
            return Err(Error::InvalidConfig("pitch must be positive".to_string()));
        }
        check_ratio(ratio)?;
        let low_us = ((pitch_us as f64) * ratio).round() as u64;
        let low_us = low_us.min(pitch_us);
        Ok(DutyCycleSchedule {
            pitch_us,
            ratio,
            low_us,
            high_us: pitch_us - low_us,
        })
    }

    pub fn low(&self) -> Duration {
        Duration::from_micros(self.low_us)
    }

    pub fn high(&self) -> Duration {
        Duration::from_micros(self.high_us)
    }
}

pub fn check_ratio(ratio: f64) -> Result<(), Error> {
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        return Err(Error::InvalidConfig(format!(
            "ratio {} is outside [0, 1]",
            ratio
        )));
    }
    Ok(())
}
