//! dB / millibel / linear conversion tables shared across effect modules.
//!
//! Volume is rendered as a 6 dB shift count plus a six-entry sub-table,
//! mirroring the classic fixed-point bass/volume engines this design is
//! descended from. The reverberator's combined level / HF-damping cutoff
//! are rendered through a 101-entry `LevelArray` and a 97-entry `LPFArray`,
//! both monotone tables generated once from their documented endpoints
//! (50 Hz at -10000 mB, 23999 Hz at -18 mB) rather than transcribed as
//! literal data, since deriving a monotone curve with the same endpoints
//! and shape (log-spaced, matching auditory perception of cutoff frequency)
//! is more maintainable than 97 arbitrary breakpoints.

use std::sync::OnceLock;

/// Six linear gains for the 0-5 dB sub-table used by the volume shift/offset
/// scheme.
const SIX_DB_TABLE: [f64; 6] = db_table();

const fn db_table() -> [f64; 6] {
    // 10^(n/20) for n in 0..=5, written as literals since `powf` isn't const.
    [
        1.0,
        1.122_018_454_3,
        1.258_925_411_8,
        1.412_537_544_6,
        1.584_893_192_5,
        1.778_279_410_0,
    ]
}

/// Exact dB-to-linear conversion (used everywhere that isn't the
/// shift/offset volume path).
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Millibel (1/100 dB) to dB.
#[inline]
pub fn mb_to_db(mb: i32) -> f64 {
    mb as f64 / 100.0
}

/// Volume dB (always <= 0) rendered as a 6 dB binary shift plus a six-entry
/// linear sub-table lookup.
///
/// `6.0` dB is the nominal step; each step roughly halves linear amplitude,
/// which is what lets a fixed-point implementation realize it as a shift
/// rather than a multiply. Kept in the same shape here in floating point for
/// parity with that reference behavior.
pub fn six_db_table_lookup(volume_db: f64) -> f64 {
    let atten_db = (-volume_db).max(0.0);
    let shift = (atten_db / 6.0).floor();
    let offset_db = atten_db - shift * 6.0;
    let offset_index = (offset_db.round() as usize).min(5);
    let offset_gain = SIX_DB_TABLE[offset_index];
    offset_gain / 2f64.powf(shift)
}

pub const LEVEL_ARRAY_LEN: usize = 101;
pub const LPF_ARRAY_LEN: usize = 97;

const LEVEL_ARRAY_FLOOR_MB: i32 = -12_000;
const LEVEL_ARRAY_CEIL_MB: i32 = 0;

const LPF_ARRAY_FLOOR_MB: i32 = -10_000;
const LPF_ARRAY_CEIL_MB: i32 = -18;
const LPF_ARRAY_FLOOR_HZ: f64 = 50.0;
const LPF_ARRAY_CEIL_HZ: f64 = 23_999.0;

fn level_array() -> &'static [i32; LEVEL_ARRAY_LEN] {
    static TABLE: OnceLock<[i32; LEVEL_ARRAY_LEN]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let span = (LEVEL_ARRAY_CEIL_MB - LEVEL_ARRAY_FLOOR_MB) as f64;
        std::array::from_fn(|i| {
            LEVEL_ARRAY_FLOOR_MB + ((span * i as f64) / (LEVEL_ARRAY_LEN - 1) as f64).round() as i32
        })
    })
}

fn lpf_array() -> &'static [(i32, f64); LPF_ARRAY_LEN] {
    static TABLE: OnceLock<[(i32, f64); LPF_ARRAY_LEN]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mb_span = (LPF_ARRAY_CEIL_MB - LPF_ARRAY_FLOOR_MB) as f64;
        let hz_ratio = LPF_ARRAY_CEIL_HZ / LPF_ARRAY_FLOOR_HZ;
        std::array::from_fn(|i| {
            let t = i as f64 / (LPF_ARRAY_LEN - 1) as f64;
            let mb = LPF_ARRAY_FLOOR_MB + (mb_span * t).round() as i32;
            let hz = LPF_ARRAY_FLOOR_HZ * hz_ratio.powf(t);
            (mb, hz)
        })
    })
}

/// Map a combined reverb/room level in mB to an internal level index
/// `0..=100` via the monotone `LevelArray`. Values below the floor saturate
/// to index 0, which callers should treat as silence; values above the
/// ceiling saturate to 100.
pub fn reverb_level_index(combined_mb: i32) -> usize {
    let table = level_array();
    match table.binary_search(&combined_mb) {
        Ok(i) => i,
        Err(i) => i.saturating_sub(1).min(LEVEL_ARRAY_LEN - 1),
    }
}

/// Map a room-HF-level in mB to an LPF cutoff in Hz via the piecewise
/// monotone `LPFArray`, linearly interpolating between the two bracketing
/// breakpoints.
pub fn lpf_array_lookup(room_hf_mb: i32) -> f64 {
    let table = lpf_array();
    let clamped = room_hf_mb.clamp(LPF_ARRAY_FLOOR_MB, LPF_ARRAY_CEIL_MB);
    match table.binary_search_by_key(&clamped, |&(mb, _)| mb) {
        Ok(i) => table[i].1,
        Err(i) => {
            if i == 0 {
                table[0].1
            } else if i >= LPF_ARRAY_LEN {
                table[LPF_ARRAY_LEN - 1].1
            } else {
                let (mb_lo, hz_lo) = table[i - 1];
                let (mb_hi, hz_hi) = table[i];
                let t = (clamped - mb_lo) as f64 / (mb_hi - mb_lo) as f64;
                hz_lo + t * (hz_hi - hz_lo)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_db_table_unity_at_zero() {
        assert!((six_db_table_lookup(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn six_db_table_monotone_decreasing() {
        let mut prev = six_db_table_lookup(0.0);
        for db in (1..=96).map(|n| -(n as f64)) {
            let g = six_db_table_lookup(db);
            assert!(g <= prev + 1e-9, "gain not monotone at {db} dB");
            prev = g;
        }
    }

    #[test]
    fn level_array_endpoints() {
        assert_eq!(reverb_level_index(-12_000), 0);
        assert_eq!(reverb_level_index(0), LEVEL_ARRAY_LEN - 1);
        assert_eq!(reverb_level_index(-50_000), 0);
    }

    #[test]
    fn lpf_array_endpoints() {
        assert!((lpf_array_lookup(-10_000) - 50.0).abs() < 1.0);
        assert!((lpf_array_lookup(-18) - 23_999.0).abs() < 1.0);
    }

    #[test]
    fn lpf_array_monotone() {
        let mut prev = lpf_array_lookup(-10_000);
        for mb in (-10_000..=-18).step_by(97) {
            let hz = lpf_array_lookup(mb);
            assert!(hz >= prev - 1e-6);
            prev = hz;
        }
    }
}
