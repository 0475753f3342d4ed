//! Tempo value type and beat period arithmetic.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MetronomeError;

const NANOS_PER_MINUTE: f64 = 60_000_000_000.0;

/// Shortest beat period the timer will be asked for.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Longest beat period the timer will be asked for.
pub const MAX_PERIOD: Duration = Duration::from_secs(3600);

/// A validated tempo in beats per minute.
///
/// Any finite, strictly positive BPM is accepted. The musical range
/// (40-200) is a caller concern, see [`crate::controller::TempoLimits`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo(f64);

impl Tempo {
    pub fn new(bpm: f64) -> Result<Self, MetronomeError> {
        if bpm.is_finite() && bpm > 0.0 {
            Ok(Self(bpm))
        } else {
            Err(MetronomeError::InvalidTempo { bpm })
        }
    }

    pub fn bpm(self) -> f64 {
        self.0
    }

    /// Time between beats: `60000 / bpm` milliseconds.
    ///
    /// Clamped to [`MIN_PERIOD`, `MAX_PERIOD`] so absurd but positive tempos
    /// still produce a valid repeating timer.
    pub fn period(self) -> Duration {
        let nanos = (NANOS_PER_MINUTE / self.0)
            .round()
            .clamp(MIN_PERIOD.as_nanos() as f64, MAX_PERIOD.as_nanos() as f64);
        Duration::from_nanos(nanos as u64)
    }
}

impl TryFrom<f64> for Tempo {
    type Error = MetronomeError;

    fn try_from(bpm: f64) -> Result<Self, Self::Error> {
        Tempo::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_formula() {
        assert_eq!(Tempo::new(120.0).unwrap().period(), Duration::from_millis(500));
        assert_eq!(Tempo::new(60.0).unwrap().period(), Duration::from_secs(1));
        assert_eq!(Tempo::new(40.0).unwrap().period(), Duration::from_millis(1500));
        assert_eq!(Tempo::new(200.0).unwrap().period(), Duration::from_millis(300));
    }

    #[test]
    fn test_fractional_bpm_period() {
        // 60000 / 90.5 = 662.983425... ms
        let period = Tempo::new(90.5).unwrap().period();
        assert_eq!(period.as_nanos(), 662_983_425);
    }

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        for bpm in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = Tempo::new(bpm).unwrap_err();
            assert!(matches!(err, MetronomeError::InvalidTempo { .. }), "{bpm}");
        }
    }

    #[test]
    fn test_extreme_tempos_are_clamped() {
        assert_eq!(Tempo::new(1e12).unwrap().period(), MIN_PERIOD);
        assert_eq!(Tempo::new(1e-9).unwrap().period(), MAX_PERIOD);
    }

    #[test]
    fn test_serde_validates() {
        let tempo: Tempo = serde_json::from_str("96").unwrap();
        assert_eq!(tempo.bpm(), 96.0);
        assert!(serde_json::from_str::<Tempo>("-3").is_err());
        assert_eq!(serde_json::to_string(&tempo).unwrap(), "96.0");
    }
}
