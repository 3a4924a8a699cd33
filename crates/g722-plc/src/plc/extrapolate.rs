//! Erasure extrapolation
//!
//! Each lost frame is synthesized as a mix of a periodic extension of the
//! history and LPC-filtered noise, weighted by the merit of the signal before
//! the loss. Synthesis runs [`TAIL_LEN`] samples past the frame so recovery
//! has material to cross-fade from. The delivered output fades from the third
//! lost frame on and is muted after [`MUTE_FRAMES`].

use tracing::{debug, trace};

use crate::plc::constants::{
    ATTN_START_FRAMES, DRIFT_MIN_FRAMES, FRAMES_SINCE_ERASURE_INIT, FRSZ, GAIN_ONE, GAIN_STEP,
    HIST_LEN, LPCO, MAXPP, MINPP, MUTE_FRAMES, NOISE_SEED, OLA_RING, TAIL_LEN,
};
use crate::plc::history::HistoryBuffer;
use crate::plc::lpc::{residual_at, synthesis_step, LpcCoefficients};
use crate::plc::merit::{self, Merit};
use crate::plc::pitch::{pitch_drift, PitchTracker};
use crate::utils::basic_ops::{l_mac, l_mult, l_shr, mult_r, saturate};

/// Frame plus lookahead
pub const SYNTH_LEN: usize = FRSZ + TAIL_LEN;

/// Position of a lost frame within an erasure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErasureStage {
    /// First lost frame after good data
    FirstLoss,
    /// Second consecutive lost frame
    SecondLoss,
    /// Later lost frames, carrying the consecutive count
    SubsequentLoss(u16),
}

impl ErasureStage {
    /// Stage for a consecutive-erasure count that already includes the
    /// current frame
    pub fn from_count(count: u16) -> Self {
        match count {
            0 | 1 => Self::FirstLoss,
            2 => Self::SecondLoss,
            n => Self::SubsequentLoss(n),
        }
    }
}

/// Erasure bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct ErasureState {
    /// Consecutive lost frames
    pub erasure_count: u16,
    /// Good frames since the last loss, saturating
    pub frames_since_erasure: u16,
    /// Merit of the signal before the loss
    pub merit: Merit,
    /// Periodic share of the mix, Q15
    pub mix_ratio: i16,
    /// Mean fractional pitch change per frame, Q15
    pub pp_drift: i32,
    /// Mean residual magnitude driving the noise
    pub avm: i32,
    /// Output gain, Q15
    pub gain: i16,
    /// LPC ringing cross-faded into the first lost frame
    pub ringing: [i16; OLA_RING],
    /// Attenuated lookahead past the last concealed frame
    pub tail: [i16; TAIL_LEN],
    /// Noise synthesis filter memory, newest first
    pub noise_mem: [i16; LPCO],
    /// Noise generator state
    pub seed: u32,
}

impl ErasureState {
    /// Create the state of a stream without losses
    pub fn new() -> Self {
        Self {
            erasure_count: 0,
            frames_since_erasure: FRAMES_SINCE_ERASURE_INIT,
            merit: Merit::SILENT,
            mix_ratio: 0,
            pp_drift: 0,
            avm: 0,
            gain: GAIN_ONE,
            ringing: [0; OLA_RING],
            tail: [0; TAIL_LEN],
            noise_mem: [0; LPCO],
            seed: NOISE_SEED,
        }
    }

    /// Count a lost frame and return its stage
    pub fn begin_frame(&mut self) -> ErasureStage {
        self.erasure_count = self.erasure_count.saturating_add(1);
        ErasureStage::from_count(self.erasure_count)
    }

    /// Count a good frame
    pub fn end_erasure(&mut self) {
        self.erasure_count = 0;
        self.frames_since_erasure = self.frames_since_erasure.saturating_add(1);
    }

    /// Whether the current loss has run past the mute threshold
    pub fn muted(&self) -> bool {
        self.erasure_count > MUTE_FRAMES
    }

    fn next_noise(&mut self) -> i32 {
        self.seed = self.seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((self.seed >> 16) & 0x7FFF) as i32 - 16384
    }
}

impl Default for ErasureState {
    fn default() -> Self {
        Self::new()
    }
}

/// Set up concealment at the first lost frame: merit, drift, ringing, noise
/// level and filter memory
pub fn start_erasure(
    state: &mut ErasureState,
    history: &HistoryBuffer,
    pitch: &PitchTracker,
    a: &LpcCoefficients,
) {
    let x = history.samples();
    let pp = pitch.pp;

    state.merit = merit::evaluate(x, pp, pitch.tap);
    state.mix_ratio = state.merit.mix_ratio();

    state.pp_drift = if state.frames_since_erasure >= DRIFT_MIN_FRAMES {
        pitch_drift(&pitch.ppt).unwrap_or(0)
    } else {
        0
    };

    // Residual magnitude over the last frame
    let mut sum = 0i32;
    for n in HIST_LEN - FRSZ..HIST_LEN {
        sum += (residual_at(x, n, a) as i32).abs();
    }
    state.avm = sum / FRSZ as i32;

    // One pitch cycle of residual through the synthesis filter
    let mut mem = history.filter_memory();
    for (t, ring) in state.ringing.iter_mut().enumerate() {
        let e = residual_at(x, HIST_LEN - pp + t, a);
        let excitation = saturate((pitch.tap as i32 * e as i32) >> 14);
        *ring = synthesis_step(a, excitation, &mut mem);
    }

    state.noise_mem = history.filter_memory();
    state.gain = GAIN_ONE;
    state.frames_since_erasure = 0;

    debug!(
        "erasure start: pp={} tap={} merit={:.2} ratio={} drift={}",
        pp, pitch.tap, state.merit.value, state.mix_ratio, state.pp_drift
    );
}

/// Apply the drift estimate to the period, once, at the second lost frame
pub fn apply_drift(pp: usize, drift_q15: i32) -> usize {
    let delta = (pp as i64 * drift_q15 as i64 + (1 << 14)) >> 15;
    (pp as i64 + delta).clamp(MINPP as i64, MAXPP as i64) as usize
}

/// Periodic extension `y[t] = tap * y[t - pp]` continuing the history
pub fn periodic_extension(
    history: &HistoryBuffer,
    pp: usize,
    tap: i16,
    out: &mut [i16; SYNTH_LEN],
) {
    let x = history.samples();
    for t in 0..SYNTH_LEN {
        let source = if t < pp { x[HIST_LEN - pp + t] } else { out[t - pp] };
        out[t] = saturate((tap as i32 * source as i32) >> 14);
    }
}

/// LPC-filtered noise uniformly distributed on `[-2 avm, 2 avm]`
pub fn filtered_noise(
    state: &mut ErasureState,
    a: &LpcCoefficients,
    out: &mut [i16; SYNTH_LEN],
) {
    let amplitude = 2 * state.avm;
    let mut mem = state.noise_mem;
    for (t, y) in out.iter_mut().enumerate() {
        let excitation = saturate((state.next_noise() * amplitude) >> 14);
        *y = synthesis_step(a, excitation, &mut mem);
        if t + 1 == FRSZ {
            state.noise_mem = mem;
        }
    }
}

#[inline]
fn mix(ratio: i16, periodic: i16, noise: i16) -> i16 {
    match ratio {
        0 => noise,
        GAIN_ONE => periodic,
        r => {
            let acc = l_mac(l_mult(periodic, r), noise, GAIN_ONE - r);
            saturate(l_shr(acc, 16))
        }
    }
}

/// Conceal one lost frame.
///
/// `synth` receives the unattenuated synthesis (frame plus lookahead),
/// `output` the delivered frame. The attenuated lookahead is kept in the
/// state for recovery.
pub fn conceal(
    state: &mut ErasureState,
    stage: ErasureStage,
    history: &HistoryBuffer,
    pitch: &mut PitchTracker,
    a: &LpcCoefficients,
    synth: &mut [i16; SYNTH_LEN],
    output: &mut [i16],
) {
    if stage == ErasureStage::SecondLoss && state.pp_drift != 0 {
        let pp = apply_drift(pitch.pp, state.pp_drift);
        trace!("pitch drift: {} -> {}", pitch.pp, pp);
        pitch.pp = pp;
    }

    let mut periodic = [0i16; SYNTH_LEN];
    let mut noise = [0i16; SYNTH_LEN];
    periodic_extension(history, pitch.pp, pitch.tap, &mut periodic);
    filtered_noise(state, a, &mut noise);

    for t in 0..SYNTH_LEN {
        synth[t] = mix(state.mix_ratio, periodic[t], noise[t]);
    }

    if stage == ErasureStage::FirstLoss {
        let len = OLA_RING as i32;
        for (t, (y, &ring)) in synth.iter_mut().zip(state.ringing.iter()).enumerate() {
            let w = (((t as i32 + 1) << 15) / (len + 1)) as i16;
            *y = saturate(mult_r(*y, w) as i32 + mult_r(ring, GAIN_ONE - w) as i32);
        }
    }

    attenuate(state, synth, output);
}

/// Apply the gain ramp to the frame and lookahead
fn attenuate(state: &mut ErasureState, synth: &[i16; SYNTH_LEN], output: &mut [i16]) {
    if state.muted() {
        output[..FRSZ].fill(0);
        state.tail = [0; TAIL_LEN];
        state.gain = 0;
        return;
    }

    let ramping = state.erasure_count > ATTN_START_FRAMES;
    let mut gain = state.gain;
    for (t, &y) in synth.iter().enumerate() {
        if ramping {
            gain = (gain - GAIN_STEP).max(0);
        }
        let v = if gain == GAIN_ONE { y } else { mult_r(y, gain) };
        if t < FRSZ {
            output[t] = v;
        } else {
            state.tail[t - FRSZ] = v;
        }
        if t + 1 == FRSZ {
            state.gain = gain;
        }
    }
}
