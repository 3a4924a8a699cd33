//! G.722 encoder and decoders
//!
//! One octet carries one pair of sub-band codes: the 6-bit low-band code in
//! bits 0-5 and the 2-bit high-band code in bits 6-7. In modes 2 and 3 the
//! decoder ignores the least significant low-band bits.

use crate::codecs::g722::adpcm::{self, ReconstructionFilter, Unfiltered};
use crate::codecs::g722::qmf::{qmf_analysis, qmf_synthesis};
use crate::codecs::g722::state::G722State;
use crate::error::{CodecError, Result};
use crate::plc::{self, PlcState};
use crate::types::{DecoderConfig, G722Mode};

/// Decode one octet into its reconstructed `(low, high)` sub-band pair
pub fn decode_subbands(state: &mut G722State, code: u8, mode: G722Mode) -> (i16, i16) {
    decode_subbands_with(state, code, mode, &mut Unfiltered)
}

/// [`decode_subbands`] with the high-band reconstruction passed through
/// `high_filter`
pub fn decode_subbands_with<F: ReconstructionFilter>(
    state: &mut G722State,
    code: u8,
    mode: G722Mode,
    high_filter: &mut F,
) -> (i16, i16) {
    let rl = adpcm::decode_low(&mut state.low_band, code & 0x3F, mode);
    let rh = adpcm::decode_high_with(&mut state.high_band, code >> 6, high_filter);
    (rl, rh)
}

fn check_even(len: usize) -> Result<()> {
    if len % 2 != 0 {
        return Err(CodecError::InvalidFrameSize {
            expected: len + 1,
            actual: len,
        });
    }
    Ok(())
}

/// G.722 encoder
#[derive(Debug, Clone, Default)]
pub struct G722Encoder {
    state: G722State,
}

impl G722Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode 16 kHz samples into octets, one per input sample pair
    pub fn encode_frame(&mut self, input: &[i16], output: &mut [u8]) -> Result<usize> {
        check_even(input.len())?;
        let needed = input.len() / 2;
        if output.len() < needed {
            return Err(CodecError::BufferTooSmall {
                needed,
                actual: output.len(),
            });
        }

        for (pair, code) in input.chunks_exact(2).zip(output.iter_mut()) {
            let (xl, xh) = qmf_analysis(pair[0], pair[1], &mut self.state.qmf_tx_delay);
            let il = adpcm::encode_low(&mut self.state.low_band, xl);
            let ih = adpcm::encode_high(&mut self.state.high_band, xh);
            *code = (ih << 6) | il;
        }
        Ok(needed)
    }

    /// Encode into a freshly allocated buffer
    pub fn encode(&mut self, input: &[i16]) -> Result<Vec<u8>> {
        let mut output = vec![0u8; input.len() / 2];
        self.encode_frame(input, &mut output)?;
        Ok(output)
    }

    /// Reset the encoder state
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

/// G.722 decoder without concealment
#[derive(Debug, Clone, Default)]
pub struct G722Decoder {
    mode: G722Mode,
    state: G722State,
}

impl G722Decoder {
    /// Create a new decoder for the given mode
    pub fn new(mode: G722Mode) -> Self {
        Self {
            mode,
            state: G722State::new(),
        }
    }

    /// Decoder mode
    pub fn mode(&self) -> G722Mode {
        self.mode
    }

    /// Decode octets into 16 kHz samples, two per octet
    pub fn decode_frame(&mut self, input: &[u8], output: &mut [i16]) -> Result<usize> {
        let needed = input.len() * 2;
        if output.len() < needed {
            return Err(CodecError::BufferTooSmall {
                needed,
                actual: output.len(),
            });
        }

        for (&code, out) in input.iter().zip(output.chunks_exact_mut(2)) {
            let (rl, rh) = decode_subbands(&mut self.state, code, self.mode);
            let (y0, y1) = qmf_synthesis(rl, rh, &mut self.state.qmf_rx_delay);
            out[0] = y0;
            out[1] = y1;
        }
        Ok(needed)
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        self.state.reset();
    }
}

/// G.722 decoder with packet-loss concealment
///
/// Owns the codec state and the concealment state of one stream.
#[derive(Debug, Clone)]
pub struct G722PlcDecoder {
    config: DecoderConfig,
    state: G722State,
    plc: PlcState,
}

impl G722PlcDecoder {
    /// Create a decoder from a validated configuration
    pub fn new(config: DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: G722State::new(),
            plc: PlcState::new(),
        })
    }

    /// Decoder configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Concealment state, for inspection
    pub fn plc_state(&self) -> &PlcState {
        &self.plc
    }

    /// Codec state, for inspection
    pub fn codec_state(&self) -> &G722State {
        &self.state
    }

    /// Process one frame of `frame_length` samples.
    ///
    /// With `bad_frame` set the frame is concealed and `indices` is ignored;
    /// otherwise `indices` must hold `frame_length / 2` octets.
    pub fn process_frame(
        &mut self,
        indices: Option<&[u8]>,
        frame_length: usize,
        bad_frame: bool,
        output: &mut [i16],
    ) -> Result<usize> {
        plc::process_frame(
            &mut self.plc,
            &mut self.state,
            &self.config,
            indices,
            frame_length,
            bad_frame,
            output,
        )
    }

    /// Decode a received frame of the configured length
    pub fn decode_frame(&mut self, input: &[u8], output: &mut [i16]) -> Result<usize> {
        let frame_length = self.config.frame_length;
        self.process_frame(Some(input), frame_length, false, output)
    }

    /// Conceal a lost frame of the configured length
    pub fn conceal_frame(&mut self, output: &mut [i16]) -> Result<usize> {
        let frame_length = self.config.frame_length;
        self.process_frame(None, frame_length, true, output)
    }

    /// Reset codec and concealment state for a new stream
    pub fn reset(&mut self) {
        plc::reset(&mut self.plc, &mut self.state);
    }
}
