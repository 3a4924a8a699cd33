//! Concealment state of one stream

use crate::plc::bridge::PredictorBridge;
use crate::plc::extrapolate::ErasureState;
use crate::plc::history::HistoryBuffer;
use crate::plc::lpc::{LpcCoefficients, WeightingFilter, IDENTITY};
use crate::plc::pitch::PitchTracker;
use crate::plc::recovery::Splice;

/// Everything the engine carries from frame to frame.
///
/// Owned by the caller next to the decoder state. All buffers are fixed-size;
/// cloning is a plain copy.
#[derive(Debug, Clone, PartialEq)]
pub struct PlcState {
    /// Output history
    pub history: HistoryBuffer,
    /// Current LPC coefficients
    pub a: LpcCoefficients,
    /// Coefficients of the previous good frame
    pub prev_a: LpcCoefficients,
    /// Bandwidth-expanded coefficients for perceptual weighting
    pub aw: LpcCoefficients,
    /// Perceptual weighting filter
    pub weighting: WeightingFilter,
    /// Pitch estimation state
    pub pitch: PitchTracker,
    /// Erasure bookkeeping
    pub erasure: ErasureState,
    /// Predictor state bridge
    pub bridge: PredictorBridge,
    /// Lag found at the last recovery
    pub last_lag: Option<i32>,
    /// How the last recovery spliced
    pub last_splice: Option<Splice>,
}

impl PlcState {
    /// Create the state of a new stream
    pub fn new() -> Self {
        Self {
            history: HistoryBuffer::new(),
            a: IDENTITY,
            prev_a: IDENTITY,
            aw: IDENTITY,
            weighting: WeightingFilter::new(),
            pitch: PitchTracker::new(),
            erasure: ErasureState::new(),
            bridge: PredictorBridge::new(),
            last_lag: None,
            last_splice: None,
        }
    }

    /// Return to the state of a new stream
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Consecutive lost frames so far
    pub fn erasure_count(&self) -> u16 {
        self.erasure.erasure_count
    }

    /// Last accepted pitch period
    pub fn pitch_period(&self) -> usize {
        self.pitch.pp
    }

    /// Voicing tap, Q14
    pub fn voicing_tap(&self) -> i16 {
        self.pitch.tap
    }

    /// Periodic share of the concealment mix, Q15
    pub fn mix_ratio(&self) -> i16 {
        self.erasure.mix_ratio
    }
}

impl Default for PlcState {
    fn default() -> Self {
        Self::new()
    }
}
