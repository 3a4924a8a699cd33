//! G.722 State Management
//!
//! Per-band ADPCM predictor state and the complete codec state with both QMF
//! delay lines. Both are plain `Clone` values so the concealment engine can
//! checkpoint and roll them back with a struct copy.

use crate::codecs::g722::tables::{DETH_INIT, DETL_INIT};

/// Which sub-band a predictor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubBand {
    /// 0-4 kHz band, 6-bit quantizer
    Low,
    /// 4-8 kHz band, 2-bit quantizer
    High,
}

impl SubBand {
    /// Initial quantizer scale factor for this band
    pub fn initial_det(self) -> i16 {
        match self {
            Self::Low => DETL_INIT,
            Self::High => DETH_INIT,
        }
    }
}

/// ADPCM state for a single sub-band
///
/// Index 0 of the delay arrays holds the most recent value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdpcmBand {
    /// Band this predictor serves
    pub band: SubBand,
    /// Signal estimate `sp + sz`
    pub s: i16,
    /// Pole-section contribution to the estimate
    pub sp: i16,
    /// Zero-section contribution to the estimate
    pub sz: i16,
    /// Reconstructed signal history
    pub r: [i16; 3],
    /// Pole coefficients, `a[1]` and `a[2]` used
    pub a: [i16; 3],
    /// Partial reconstruction history
    pub p: [i16; 3],
    /// Quantized difference history
    pub d: [i16; 7],
    /// Zero coefficients, `b[1]..b[6]` used
    pub b: [i16; 7],
    /// Logarithmic quantizer scale factor
    pub nb: i16,
    /// Linear quantizer scale factor
    pub det: i16,
}

impl AdpcmBand {
    /// Create a predictor in its initial state
    pub fn new(band: SubBand) -> Self {
        Self {
            band,
            s: 0,
            sp: 0,
            sz: 0,
            r: [0; 3],
            a: [0; 3],
            p: [0; 3],
            d: [0; 7],
            b: [0; 7],
            nb: 0,
            det: band.initial_det(),
        }
    }

    /// Create the low-band predictor
    pub fn new_low_band() -> Self {
        Self::new(SubBand::Low)
    }

    /// Create the high-band predictor
    pub fn new_high_band() -> Self {
        Self::new(SubBand::High)
    }

    /// Return to the initial state, keeping the band
    pub fn reset(&mut self) {
        *self = Self::new(self.band);
    }
}

/// Complete G.722 codec state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G722State {
    /// Low-band ADPCM state
    pub low_band: AdpcmBand,
    /// High-band ADPCM state
    pub high_band: AdpcmBand,
    /// QMF transmit (analysis) delay line, newest sample first
    pub qmf_tx_delay: [i16; 24],
    /// QMF receive (synthesis) delay line, newest sample first
    pub qmf_rx_delay: [i16; 24],
}

impl G722State {
    /// Create a new G.722 state with default initialization
    pub fn new() -> Self {
        Self {
            low_band: AdpcmBand::new_low_band(),
            high_band: AdpcmBand::new_high_band(),
            qmf_tx_delay: [0; 24],
            qmf_rx_delay: [0; 24],
        }
    }

    /// Reset the state to initial values
    pub fn reset(&mut self) {
        self.low_band.reset();
        self.high_band.reset();
        self.qmf_tx_delay = [0; 24];
        self.qmf_rx_delay = [0; 24];
    }
}

impl Default for G722State {
    fn default() -> Self {
        Self::new()
    }
}
