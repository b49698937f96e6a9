//! The seven frozen reverb presets.

/// One preset's ten raw fields, in the units the parameter surface uses:
/// roomLevel, roomHFLevel, decayTime (ms), decayHFRatio (per-mille),
/// reflectionsLevel (mB), reflectionsDelay (ms), reverbLevel (mB),
/// reverbDelay (ms), diffusion (per-mille), density (per-mille).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbProperties {
    pub room_level_mb: i16,
    pub room_hf_level_mb: i16,
    pub decay_time_ms: u32,
    pub decay_hf_ratio_pm: i16,
    pub reflections_level_mb: i16,
    pub reflections_delay_ms: u32,
    pub reverb_level_mb: i16,
    pub reverb_delay_ms: u32,
    pub diffusion_pm: i16,
    pub density_pm: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Preset {
    None = 0,
    SmallRoom = 1,
    MediumRoom = 2,
    LargeRoom = 3,
    MediumHall = 4,
    LargeHall = 5,
    Plate = 6,
}

impl Preset {
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => Self::None,
            1 => Self::SmallRoom,
            2 => Self::MediumRoom,
            3 => Self::LargeRoom,
            4 => Self::MediumHall,
            5 => Self::LargeHall,
            6 => Self::Plate,
            _ => return None,
        })
    }

    pub fn properties(self) -> ReverbProperties {
        match self {
            Preset::None => ReverbProperties {
                room_level_mb: 0,
                room_hf_level_mb: 0,
                decay_time_ms: 0,
                decay_hf_ratio_pm: 0,
                reflections_level_mb: 0,
                reflections_delay_ms: 0,
                reverb_level_mb: 0,
                reverb_delay_ms: 0,
                diffusion_pm: 0,
                density_pm: 0,
            },
            Preset::SmallRoom => ReverbProperties {
                room_level_mb: -400,
                room_hf_level_mb: -600,
                decay_time_ms: 1100,
                decay_hf_ratio_pm: 830,
                reflections_level_mb: -400,
                reflections_delay_ms: 5,
                reverb_level_mb: 500,
                reverb_delay_ms: 10,
                diffusion_pm: 1000,
                density_pm: 1000,
            },
            Preset::MediumRoom => ReverbProperties {
                room_level_mb: -400,
                room_hf_level_mb: -600,
                decay_time_ms: 1300,
                decay_hf_ratio_pm: 830,
                reflections_level_mb: -1000,
                reflections_delay_ms: 20,
                reverb_level_mb: -200,
                reverb_delay_ms: 20,
                diffusion_pm: 1000,
                density_pm: 1000,
            },
            Preset::LargeRoom => ReverbProperties {
                room_level_mb: -400,
                room_hf_level_mb: -600,
                decay_time_ms: 1500,
                decay_hf_ratio_pm: 830,
                reflections_level_mb: -1600,
                reflections_delay_ms: 5,
                reverb_level_mb: -1000,
                reverb_delay_ms: 40,
                diffusion_pm: 1000,
                density_pm: 1000,
            },
            Preset::MediumHall => ReverbProperties {
                room_level_mb: -400,
                room_hf_level_mb: -600,
                decay_time_ms: 1800,
                decay_hf_ratio_pm: 700,
                reflections_level_mb: -1300,
                reflections_delay_ms: 15,
                reverb_level_mb: -800,
                reverb_delay_ms: 30,
                diffusion_pm: 1000,
                density_pm: 1000,
            },
            Preset::LargeHall => ReverbProperties {
                room_level_mb: -400,
                room_hf_level_mb: -600,
                decay_time_ms: 1800,
                decay_hf_ratio_pm: 700,
                reflections_level_mb: -2000,
                reflections_delay_ms: 30,
                reverb_level_mb: -1400,
                reverb_delay_ms: 60,
                diffusion_pm: 1000,
                density_pm: 1000,
            },
            Preset::Plate => ReverbProperties {
                room_level_mb: -400,
                room_hf_level_mb: -200,
                decay_time_ms: 1300,
                decay_hf_ratio_pm: 900,
                reflections_level_mb: 0,
                reflections_delay_ms: 2,
                reverb_level_mb: 0,
                reverb_delay_ms: 10,
                diffusion_pm: 1000,
                density_pm: 750,
            },
        }
    }
}

/// Default parameter set used by `init` before any preset/property is
/// selected: T60 = 1490 ms, HF damping level = 21, density 100, roomsize
/// 100, HPF 50 Hz, LPF 23999 Hz, level = 0.
pub fn default_properties() -> ReverbProperties {
    ReverbProperties {
        room_level_mb: 0,
        room_hf_level_mb: -18,
        decay_time_ms: 1490,
        decay_hf_ratio_pm: 1000,
        reflections_level_mb: 0,
        reflections_delay_ms: 0,
        reverb_level_mb: 0,
        reverb_delay_ms: 0,
        diffusion_pm: 1000,
        density_pm: 1000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u16() {
        for p in [
            Preset::None,
            Preset::SmallRoom,
            Preset::MediumRoom,
            Preset::LargeRoom,
            Preset::MediumHall,
            Preset::LargeHall,
            Preset::Plate,
        ] {
            assert_eq!(Preset::from_u16(p as u16), Some(p));
        }
    }

    #[test]
    fn none_preset_is_all_zero() {
        let p = Preset::None.properties();
        assert_eq!(p.room_level_mb, 0);
        assert_eq!(p.decay_time_ms, 0);
    }

    #[test]
    fn largehall_matches_spec_table() {
        let p = Preset::LargeHall.properties();
        assert_eq!(p.room_level_mb, -400);
        assert_eq!(p.room_hf_level_mb, -600);
        assert_eq!(p.decay_time_ms, 1800);
        assert_eq!(p.decay_hf_ratio_pm, 700);
        assert_eq!(p.reflections_level_mb, -2000);
        assert_eq!(p.reflections_delay_ms, 30);
        assert_eq!(p.reverb_level_mb, -1400);
        assert_eq!(p.reverb_delay_ms, 60);
        assert_eq!(p.diffusion_pm, 1000);
        assert_eq!(p.density_pm, 1000);
    }
}
