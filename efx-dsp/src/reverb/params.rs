//! Reverb parameter IDs and the parameter→engine mapping. `ReverbControl`
//! is the caller-facing value set; [`EngineConfig`] is what the DSP engine
//! actually consumes, derived from it.

use super::presets::{default_properties, Preset, ReverbProperties};
use efx_core::{db_to_linear, lpf_array_lookup, mb_to_db, reverb_level_index, EfxError, EfxResult};

pub const MAX_REVERB_LEVEL_MB: i32 = 2000;
pub const MAX_T60_MS: u32 = 7000;

/// Bit-exact parameter IDs. `REFLECTIONS_LEVEL`, `REFLECTIONS_DELAY` and
/// `REVERB_DELAY` are accepted and stored but have no effect on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    RoomLevel,
    RoomHfLevel,
    DecayTime,
    DecayHfRatio,
    ReflectionsLevel,
    ReflectionsDelay,
    ReverbLevel,
    ReverbDelay,
    Diffusion,
    Density,
    Properties,
    Preset,
}

/// A settable parameter value, type-matched to each id's native unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Mb(i16),
    Ms(u32),
    PerMille(i16),
    Preset(u16),
}

/// The caller-visible parameter set: whatever was last written via
/// `set_parameter`/`PROPERTIES`/`PRESET`, independent of whether the engine
/// has picked it up yet. A preset write is readable back immediately even
/// though the engine only loads it at the next `process` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbControl {
    pub properties: ReverbProperties,
    pub cur_preset: Preset,
    pub next_preset: Preset,
    pub preset_mode: bool,
}

impl Default for ReverbControl {
    fn default() -> Self {
        Self {
            properties: default_properties(),
            cur_preset: Preset::None,
            next_preset: Preset::None,
            preset_mode: false,
        }
    }
}

impl ReverbControl {
    pub fn get(&self, id: ParamId) -> ParamValue {
        let p = &self.properties;
        match id {
            ParamId::RoomLevel => ParamValue::Mb(p.room_level_mb),
            ParamId::RoomHfLevel => ParamValue::Mb(p.room_hf_level_mb),
            ParamId::DecayTime => ParamValue::Ms(p.decay_time_ms),
            ParamId::DecayHfRatio => ParamValue::PerMille(p.decay_hf_ratio_pm),
            ParamId::ReflectionsLevel => ParamValue::Mb(p.reflections_level_mb),
            ParamId::ReflectionsDelay => ParamValue::Ms(p.reflections_delay_ms),
            ParamId::ReverbLevel => ParamValue::Mb(p.reverb_level_mb),
            ParamId::ReverbDelay => ParamValue::Ms(p.reverb_delay_ms),
            ParamId::Diffusion => ParamValue::PerMille(p.diffusion_pm),
            ParamId::Density => ParamValue::PerMille(p.density_pm),
            ParamId::Preset => ParamValue::Preset(self.next_preset as u16),
            ParamId::Properties => ParamValue::Mb(0),
        }
    }

    /// Apply a single-field parameter write. Preset writes stage
    /// `next_preset`, picked up at the top of the next `process` call rather
    /// than applied in place.
    pub fn set(&mut self, id: ParamId, value: ParamValue) -> EfxResult<()> {
        match (id, value) {
            (ParamId::RoomLevel, ParamValue::Mb(v)) => self.properties.room_level_mb = v,
            (ParamId::RoomHfLevel, ParamValue::Mb(v)) => self.properties.room_hf_level_mb = v,
            (ParamId::DecayTime, ParamValue::Ms(v)) => {
                self.properties.decay_time_ms = v.clamp(1, MAX_T60_MS)
            }
            (ParamId::DecayHfRatio, ParamValue::PerMille(v)) => self.properties.decay_hf_ratio_pm = v,
            (ParamId::ReflectionsLevel, ParamValue::Mb(v)) => self.properties.reflections_level_mb = v,
            (ParamId::ReflectionsDelay, ParamValue::Ms(v)) => self.properties.reflections_delay_ms = v,
            (ParamId::ReverbLevel, ParamValue::Mb(v)) => self.properties.reverb_level_mb = v,
            (ParamId::ReverbDelay, ParamValue::Ms(v)) => self.properties.reverb_delay_ms = v,
            (ParamId::Diffusion, ParamValue::PerMille(v)) => self.properties.diffusion_pm = v,
            (ParamId::Density, ParamValue::PerMille(v)) => self.properties.density_pm = v,
            (ParamId::Preset, ParamValue::Preset(v)) => {
                if !self.preset_mode {
                    return Err(EfxError::InvalidArgument("PRESET set outside preset mode".into()));
                }
                self.next_preset =
                    Preset::from_u16(v).ok_or_else(|| EfxError::InvalidArgument(format!("unknown preset {v}")))?;
            }
            _ => return Err(EfxError::InvalidArgument("parameter id/value type mismatch".into())),
        }
        Ok(())
    }

    pub fn set_properties(&mut self, properties: ReverbProperties) {
        self.properties = ReverbProperties {
            decay_time_ms: properties.decay_time_ms.clamp(1, MAX_T60_MS),
            ..properties
        };
    }

    /// Pick up a pending preset if one is staged, loading its full
    /// properties record.
    pub fn apply_pending_preset(&mut self) -> bool {
        if self.next_preset == self.cur_preset {
            return false;
        }
        self.properties = self.next_preset.properties();
        self.cur_preset = self.next_preset;
        true
    }
}

/// Values derived from [`ReverbControl`] that the DSP engine actually
/// consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Index into the room/reverb-level table that `wet_gain` was read
    /// from; kept alongside the gain for diagnostics.
    pub level_index: usize,
    /// Linear wet-path gain derived from the combined room/reverb-level
    /// table (0.0 at the table floor, 1.0 at its ceiling) — doubling the
    /// input and halving the reverb level land on the same gain.
    pub wet_gain: f64,
    pub lpf_hz: f64,
    pub t60_ms: f64,
    pub damping: f64,
    pub allpass_density: f64,
    pub room_size: f64,
    /// True when the control surface is in preset mode with no preset
    /// selected — the "off" state the engine should treat as a pass-through.
    pub is_none: bool,
}

impl EngineConfig {
    pub fn derive(control: &ReverbControl) -> Self {
        let p = &control.properties;

        let combined_mb = (p.room_level_mb as i32 + p.reverb_level_mb as i32 - MAX_REVERB_LEVEL_MB).max(-12_000);
        let level_index = reverb_level_index(combined_mb);
        // The table index is kept for diagnostics; the gain itself is the
        // combined mB value converted straight to linear, which is what
        // keeps doubling the input and halving the reverb level numerically
        // equivalent.
        let wet_gain = db_to_linear(mb_to_db(combined_mb));
        let lpf_hz = lpf_array_lookup(p.room_hf_level_mb as i32);

        let t60_ms = p.decay_time_ms.clamp(1, MAX_T60_MS) as f64;
        // Decay HF ratio in per-mille / 20 -> engine damping parameter.
        let damping = p.decay_hf_ratio_pm as f64 / 20.0;
        // Diffusion in per-mille / 10 -> engine density (the engine's
        // all-pass gain axis).
        let allpass_density = p.diffusion_pm as f64 / 10.0;
        // Density in per-mille -> engine room size as
        // ((density*99)/1000)+1, range 1..100.
        let room_size = ((p.density_pm as f64 * 99.0) / 1000.0) + 1.0;

        Self {
            level_index,
            wet_gain,
            lpf_hz,
            t60_ms,
            damping,
            allpass_density,
            room_size,
            is_none: control.cur_preset == Preset::None && control.preset_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_time_clamps_to_max_t60() {
        let mut c = ReverbControl::default();
        c.set(ParamId::DecayTime, ParamValue::Ms(7001)).unwrap();
        assert_eq!(c.properties.decay_time_ms, MAX_T60_MS);
    }

    #[test]
    fn preset_write_requires_preset_mode() {
        let mut c = ReverbControl::default();
        assert!(c.set(ParamId::Preset, ParamValue::Preset(Preset::Plate as u16)).is_err());
    }

    #[test]
    fn preset_reentrancy_before_process() {
        let mut c = ReverbControl::default();
        c.preset_mode = true;
        c.set(ParamId::Preset, ParamValue::Preset(Preset::Plate as u16)).unwrap();
        assert_eq!(c.get(ParamId::Preset), ParamValue::Preset(Preset::Plate as u16));
    }

    #[test]
    fn pending_preset_applies_only_once_per_change() {
        let mut c = ReverbControl::default();
        c.preset_mode = true;
        c.next_preset = Preset::LargeHall;
        assert!(c.apply_pending_preset());
        assert!(!c.apply_pending_preset());
    }
}
