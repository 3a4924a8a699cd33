//! # G722-PLC: Packet-Loss Concealment for G.722
//!
//! A G.722 sub-band ADPCM decoder with a concealment engine for lost 10 ms
//! frames. Lost frames are synthesized from the recent output by periodic
//! extension mixed with LPC-filtered noise; the decoder's adaptive
//! predictors are kept running on the concealed signal so that decoding can
//! resume without clicks, and the first good frame is aligned to the
//! concealed waveform by time warping.
//!
//! ## Features
//!
//! - **G.722 codec**: encoder and decoder for modes 1-3 (64/56/48 kbit/s)
//! - **Extrapolation**: pitch-periodic waveform plus shaped noise, mixed by a
//!   voicing figure of merit, with a gain ramp that mutes after 60 ms
//! - **Predictor bridging**: both sub-band predictors adapt on the
//!   re-encoded concealment, with drift and repetition resets, scale-factor
//!   reseeding and high-band DC removal after the loss
//! - **Recovery**: lag search, resampling and cross-fade on the first good
//!   frame, optional replay of the predictor adaptation at the found phase
//! - **No allocation per frame**: all state is fixed-size
//!
//! ## Usage
//!
//! ```rust
//! use g722_plc::{DecoderConfig, G722Encoder, G722Mode, G722PlcDecoder};
//!
//! let mut encoder = G722Encoder::new();
//! let mut decoder = G722PlcDecoder::new(DecoderConfig::new(G722Mode::Mode1))?;
//!
//! let pcm = vec![0i16; 160];
//! let codes = encoder.encode(&pcm)?;
//!
//! let mut out = [0i16; 160];
//! decoder.decode_frame(&codes, &mut out)?;
//! // Packet lost
//! decoder.conceal_frame(&mut out)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codecs;
pub mod error;
pub mod plc;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use codecs::g722::{G722Decoder, G722Encoder, G722PlcDecoder, G722State};
pub use error::{CodecError, Result};
pub use plc::{ErasureStage, Merit, PlcState, Splice};
pub use types::{DecoderConfig, G722Mode, PlcConfig, FRAME_SAMPLES};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Supported G.722 modes
pub const SUPPORTED_MODES: &[G722Mode] = &[G722Mode::Mode1, G722Mode::Mode2, G722Mode::Mode3];

/// Initialize the library
///
/// Installs a default tracing subscriber if none is set and builds the
/// analysis tables. Safe to call more than once.
///
/// # Errors
///
/// Currently never fails
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    plc::tables::init_tables();

    tracing::info!("G722-PLC v{} initialized", VERSION);
    tracing::info!("Supported modes: {:?}", SUPPORTED_MODES);

    Ok(())
}

/// Get library information
pub fn info() -> LibraryInfo {
    LibraryInfo {
        version: VERSION,
        supported_modes: SUPPORTED_MODES.to_vec(),
        frame_samples: FRAME_SAMPLES,
    }
}

/// Library information structure
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    /// Library version
    pub version: &'static str,
    /// Supported G.722 modes
    pub supported_modes: Vec<G722Mode>,
    /// Samples per 10 ms frame at 16 kHz
    pub frame_samples: usize,
}
