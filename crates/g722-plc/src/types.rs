//! Core types for the G.722 decoder and its concealment engine

use crate::error::{CodecError, Result};
use std::fmt;

/// Samples per concealment frame (10 ms at 16 kHz)
pub const FRAME_SAMPLES: usize = 160;

/// G.722 operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum G722Mode {
    /// 64 kbit/s, 6-bit low band
    #[default]
    Mode1,
    /// 56 kbit/s, 5-bit low band
    Mode2,
    /// 48 kbit/s, 4-bit low band
    Mode3,
}

impl G722Mode {
    /// Mode from its ITU-T number (1-3)
    pub fn from_number(mode: u8) -> Result<Self> {
        match mode {
            1 => Ok(Self::Mode1),
            2 => Ok(Self::Mode2),
            3 => Ok(Self::Mode3),
            other => Err(CodecError::invalid_config(format!(
                "G.722 mode must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }

    /// ITU-T mode number
    pub fn number(self) -> u8 {
        match self {
            Self::Mode1 => 1,
            Self::Mode2 => 2,
            Self::Mode3 => 3,
        }
    }

    /// Bitrate in bits per second
    pub fn bitrate(self) -> u32 {
        match self {
            Self::Mode1 => 64000,
            Self::Mode2 => 56000,
            Self::Mode3 => 48000,
        }
    }
}

impl fmt::Display for G722Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G.722 mode {} ({} bit/s)", self.number(), self.bitrate())
    }
}

/// Optional stages of the recovery path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlcConfig {
    /// Align the first good frame with the extrapolated waveform by
    /// resampling it (otherwise a plain cross-fade is used)
    pub time_warping: bool,
    /// Replay the ADPCM adaptation with the aligned waveform after short
    /// erasures before decoding the first good frame
    pub rephasing: bool,
}

impl Default for PlcConfig {
    fn default() -> Self {
        Self {
            time_warping: true,
            rephasing: true,
        }
    }
}

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// G.722 mode of the incoming stream
    pub mode: G722Mode,
    /// Samples per call; a non-zero multiple of [`FRAME_SAMPLES`]
    pub frame_length: usize,
    /// Concealment options
    pub plc: PlcConfig,
}

impl DecoderConfig {
    /// Create a configuration for the given mode with 10 ms frames
    pub fn new(mode: G722Mode) -> Self {
        Self {
            mode,
            frame_length: FRAME_SAMPLES,
            plc: PlcConfig::default(),
        }
    }

    /// Set the frame length in samples
    pub fn with_frame_length(mut self, frame_length: usize) -> Self {
        self.frame_length = frame_length;
        self
    }

    /// Enable or disable time warping on recovery
    pub fn with_time_warping(mut self, enabled: bool) -> Self {
        self.plc.time_warping = enabled;
        self
    }

    /// Enable or disable predictor rephasing on recovery
    pub fn with_rephasing(mut self, enabled: bool) -> Self {
        self.plc.rephasing = enabled;
        self
    }

    /// Codewords (octets) carried by one frame
    pub fn encoded_len(&self) -> usize {
        self.frame_length / 2
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_frame_length(self.frame_length)
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::new(G722Mode::default())
    }
}

/// Check that a frame length is a non-zero multiple of [`FRAME_SAMPLES`]
pub fn validate_frame_length(frame_length: usize) -> Result<()> {
    if frame_length == 0 || frame_length % FRAME_SAMPLES != 0 {
        let expected = ((frame_length / FRAME_SAMPLES).max(1)) * FRAME_SAMPLES;
        return Err(CodecError::InvalidFrameSize {
            expected,
            actual: frame_length,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_numbers() {
        for n in 1..=3 {
            assert_eq!(G722Mode::from_number(n).unwrap().number(), n);
        }
        assert!(G722Mode::from_number(0).is_err());
        assert!(G722Mode::from_number(4).is_err());
        assert_eq!(G722Mode::Mode2.bitrate(), 56000);
    }

    #[test]
    fn test_frame_length_validation() {
        assert!(DecoderConfig::default().validate().is_ok());
        assert!(DecoderConfig::default()
            .with_frame_length(320)
            .validate()
            .is_ok());

        let err = DecoderConfig::default()
            .with_frame_length(170)
            .validate()
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidFrameSize {
                expected: 160,
                actual: 170
            }
        ));
        assert!(validate_frame_length(0).is_err());
    }

    #[test]
    fn test_builder() {
        let config = DecoderConfig::new(G722Mode::Mode3)
            .with_time_warping(false)
            .with_rephasing(false);
        assert_eq!(config.mode, G722Mode::Mode3);
        assert!(!config.plc.time_warping);
        assert!(!config.plc.rephasing);
        assert_eq!(config.encoded_len(), 80);
    }
}
