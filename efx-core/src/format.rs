//! Format enumerations: sample rate class, source format, speaker type, and
//! the channel-mask bitfield.

use crate::error::{EfxError, EfxResult};

/// Supported sample rates. The four "high" rates (88.2/96/176.4/192 kHz) are
/// always available here since this is a library, not a fixed-capability
/// DSP core gating them behind a build option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SampleRateClass {
    Hz8000,
    Hz11025,
    Hz12000,
    Hz16000,
    Hz22050,
    Hz24000,
    Hz32000,
    Hz44100,
    Hz48000,
    Hz88200,
    Hz96000,
    Hz176400,
    Hz192000,
}

impl SampleRateClass {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Hz8000 => 8_000,
            Self::Hz11025 => 11_025,
            Self::Hz12000 => 12_000,
            Self::Hz16000 => 16_000,
            Self::Hz22050 => 22_050,
            Self::Hz24000 => 24_000,
            Self::Hz32000 => 32_000,
            Self::Hz44100 => 44_100,
            Self::Hz48000 => 48_000,
            Self::Hz88200 => 88_200,
            Self::Hz96000 => 96_000,
            Self::Hz176400 => 176_400,
            Self::Hz192000 => 192_000,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.as_u32() as f64
    }

    /// Resolve the matching class from a raw rate, rejecting anything
    /// outside the supported set.
    pub fn from_u32(rate: u32) -> EfxResult<Self> {
        Ok(match rate {
            8_000 => Self::Hz8000,
            11_025 => Self::Hz11025,
            12_000 => Self::Hz12000,
            16_000 => Self::Hz16000,
            22_050 => Self::Hz22050,
            24_000 => Self::Hz24000,
            32_000 => Self::Hz32000,
            44_100 => Self::Hz44100,
            48_000 => Self::Hz48000,
            88_200 => Self::Hz88200,
            96_000 => Self::Hz96000,
            176_400 => Self::Hz176400,
            192_000 => Self::Hz192000,
            other => {
                return Err(EfxError::OutOfRange(format!(
                    "unsupported sample rate {other}"
                )))
            }
        })
    }
}

/// Source format: channel count 1..=8, plus a descriptive tag for the "mono
/// promoted into a stereo pipeline" case the virtualizer needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Mono,
    MonoInStereo,
    Stereo,
    Multichannel(u8),
}

impl SourceFormat {
    pub fn channel_count(self) -> usize {
        match self {
            SourceFormat::Mono => 1,
            SourceFormat::MonoInStereo | SourceFormat::Stereo => 2,
            SourceFormat::Multichannel(n) => n as usize,
        }
    }

    /// Validate and build from an explicit channel count (1..=8).
    ///
    /// `MonoInStereo` can't be produced here: a raw channel count of 2 is
    /// ambiguous between genuine stereo and mono promoted into a stereo
    /// pipeline, and only the caller (who knows the source) can tell them
    /// apart. Callers that need `MonoInStereo` must construct it directly.
    pub fn from_channel_count(channels: u8) -> EfxResult<Self> {
        match channels {
            1 => Ok(SourceFormat::Mono),
            2 => Ok(SourceFormat::Stereo),
            3..=8 => Ok(SourceFormat::Multichannel(channels)),
            other => Err(EfxError::OutOfRange(format!(
                "channel count {other} out of [1, 8]"
            ))),
        }
    }
}

/// Speaker type. Affects the virtualizer's depth and gates whether the
/// treble-enhancer's coefficients need recomputing on a control change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeakerType {
    Headphones,
    ExHeadphones,
    #[default]
    Speaker,
    MobileSpeaker,
}

/// Channel layout bitmask. Canonical masks are `(1 << n) - 1` for the
/// common front-only layouts; named masks cover the surround layouts the
/// bundle must route through an N-channel pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    pub const MONO: ChannelMask = ChannelMask(0b01);
    pub const STEREO: ChannelMask = ChannelMask(0b11);
    pub const QUAD: ChannelMask = ChannelMask(0b1111);
    pub const SURROUND_5_1: ChannelMask = ChannelMask(0b0011_1111);
    pub const SURROUND_7_1: ChannelMask = ChannelMask(0b1111_1111);

    /// Canonical index mask for `n` channels: `(1 << n) - 1`.
    pub fn canonical(channels: u8) -> Self {
        ChannelMask((1u32 << channels) - 1)
    }

    pub fn channel_count(self) -> u32 {
        self.0.count_ones()
    }
}
