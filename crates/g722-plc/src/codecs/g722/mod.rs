//! G.722 Wideband Audio Codec Implementation
//!
//! Sub-band ADPCM codec according to ITU-T Recommendation G.722, used as the
//! normal decode path next to the concealment engine.
//!
//! # Architecture
//!
//! - `codec`: encoder, plain decoder and the concealing decoder
//! - `qmf`: QMF analysis and synthesis filters
//! - `adpcm`: quantizers, scale factors and predictor adaptation
//! - `tables`: quantization tables and constants
//! - `state`: state management structures

pub mod adpcm;
pub mod codec;
pub mod qmf;
pub mod state;
pub mod tables;

#[cfg(test)]
mod tests;

pub use codec::{G722Decoder, G722Encoder, G722PlcDecoder};
pub use state::{AdpcmBand, G722State, SubBand};
