//! EQ-boost headroom derivation.

use crate::control::{EqualizerParams, HeadroomParams};

/// For every configured sub-range, take the maximum positive gain among EQ
/// bands whose centre falls inside it; that sub-range's headroom is
/// `max(0, max_gain - offset)`. The instance-wide headroom is the max over
/// all sub-ranges. Returned in dB, to be subtracted from the requested
/// volume before EQ boost.
pub fn derive_headroom_db(eq: &EqualizerParams, headroom: &HeadroomParams) -> f64 {
    if !eq.enabled || headroom.ranges.is_empty() {
        return 0.0;
    }

    let mut worst = 0.0_f64;
    for range in &headroom.ranges {
        let max_gain = eq
            .bands
            .iter()
            .filter(|b| b.centre_hz >= range.low_hz && b.centre_hz < range.high_hz)
            .map(|b| b.gain_db)
            .fold(f64::MIN, f64::max);

        if max_gain == f64::MIN {
            continue;
        }

        let sub_range_headroom = (max_gain - range.offset_db).max(0.0);
        worst = worst.max(sub_range_headroom);
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{EqBandDef, HeadroomRange};

    #[test]
    fn headroom_limiter_scenario() {
        // band (60 Hz, Q 0.96, +12 dB), headroom range 20-4999 Hz offset 0
        // => headroom = 12 dB.
        let eq = EqualizerParams {
            enabled: true,
            bands: vec![EqBandDef {
                centre_hz: 60.0,
                gain_db: 12.0,
                q_centi: 96,
            }],
        };
        let headroom = HeadroomParams {
            ranges: vec![HeadroomRange {
                low_hz: 20.0,
                high_hz: 4999.0,
                offset_db: 0.0,
            }],
        };
        assert!((derive_headroom_db(&eq, &headroom) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn no_bands_in_range_is_zero() {
        let eq = EqualizerParams {
            enabled: true,
            bands: vec![EqBandDef {
                centre_hz: 8000.0,
                gain_db: 10.0,
                q_centi: 100,
            }],
        };
        let headroom = HeadroomParams {
            ranges: vec![HeadroomRange {
                low_hz: 20.0,
                high_hz: 4999.0,
                offset_db: 0.0,
            }],
        };
        assert_eq!(derive_headroom_db(&eq, &headroom), 0.0);
    }
}
