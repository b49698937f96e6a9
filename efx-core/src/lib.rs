//! efx-core: shared types, errors and conversion tables for the effect engine.
//!
//! This crate provides the foundational types used by `efx-dsp`: the sample
//! type, channel/format/sample-rate enumerations, the error type, and the
//! dB/millibel/linear lookup tables shared by every effect module.

mod error;
mod format;
mod level;
mod sample;

pub use error::{EfxError, EfxResult, ReturnCode};
pub use format::{ChannelMask, SampleRateClass, SourceFormat, SpeakerType};
pub use level::{
    db_to_linear, lpf_array_lookup, mb_to_db, reverb_level_index, six_db_table_lookup,
    LPF_ARRAY_LEN, LEVEL_ARRAY_LEN,
};
pub use sample::{Sample, StereoSample};

/// Maximum samples processed in one internal reverb tick (spec §6).
pub const MAX_INTERNAL_BLOCK: usize = 256;
