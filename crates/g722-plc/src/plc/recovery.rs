//! Recovery after an erasure
//!
//! On the first good frame after a loss the decoded frame is spliced onto the
//! concealed signal. For clearly voiced content a lag search aligns the
//! decoded frame with a periodic extension of the history; a valid lag is
//! absorbed by resampling the frame over `|lag|` short ramps. Everything else
//! cross-fades from the lookahead tail directly.

use tracing::trace;

use crate::plc::constants::{
    FRSZ, GAIN_ONE, HIST_LEN, MAX_WARP, MERIT_LOW, MERIT_WARP, MUTE_FRAMES, OLA_LONG, OLA_SHORT,
    OLA_WARP, RESAMPLE_MARGIN, TAIL_LEN, WARP_COARSE_STEP, WARP_COS2_MIN, WARP_FINE_SPAN,
    WARP_WINDOW_MIN,
};
use crate::plc::history::HistoryBuffer;
use crate::plc::merit::{first_autocorrelation, Merit};
use crate::plc::pitch::prescale_shift;
use crate::types::PlcConfig;
use crate::utils::basic_ops::{mult_r, saturate};

/// Longest lag-search window
pub const WARP_WINDOW_MAX: usize = FRSZ;

/// History followed by its periodic extension far enough for every lag
pub const REFERENCE_LEN: usize = HIST_LEN + WARP_WINDOW_MAX + MAX_WARP as usize;

/// How the decoded frame was joined to the concealed signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splice {
    /// Cross-fade of the given length
    Overlap(usize),
    /// Resampled by the lag, then cross-faded
    Warp(i32),
}

/// Whether a time-warped splice is worth attempting
pub fn applicable(
    config: &PlcConfig,
    merit_at_loss: &Merit,
    erasure_count: u16,
    frame: &[i16],
) -> bool {
    config.time_warping
        && merit_at_loss.value >= MERIT_WARP
        && erasure_count <= MUTE_FRAMES
        && first_autocorrelation(frame) > 0.0
}

/// Build `S(t)`: the history for `t < 0`, then `tap * S(t - pp)`
pub fn reference_signal(
    history: &HistoryBuffer,
    pp: usize,
    tap: i16,
    out: &mut [i16; REFERENCE_LEN],
) {
    out[..HIST_LEN].copy_from_slice(history.samples());
    for n in HIST_LEN..REFERENCE_LEN {
        out[n] = saturate((tap as i32 * out[n - pp] as i32) >> 14);
    }
}

/// Lag-search window for a pitch period
#[inline]
pub fn search_window(pp: usize) -> usize {
    (2 * pp).clamp(WARP_WINDOW_MIN, WARP_WINDOW_MAX)
}

struct Correlation {
    cor: i32,
    frame_energy: i32,
    reference_energy: i32,
}

impl Correlation {
    /// Signed score `cor |cor| / Es`
    fn score(&self) -> f64 {
        if self.reference_energy == 0 {
            return f64::MIN;
        }
        let c = self.cor as f64;
        c * c.abs() / self.reference_energy as f64
    }
}

fn correlate(
    frame: &[i16],
    reference: &[i16; REFERENCE_LEN],
    lag: i32,
    len: usize,
    step: usize,
    shift: i16,
) -> Correlation {
    let base = HIST_LEN as i32 + lag;
    let mut result = Correlation {
        cor: 0,
        frame_energy: 0,
        reference_energy: 0,
    };
    for t in (0..len).step_by(step) {
        let x = (frame[t] >> shift) as i32;
        let s = (reference[(base + t as i32) as usize] >> shift) as i32;
        result.cor += x * s;
        result.frame_energy += x * x;
        result.reference_energy += s * s;
    }
    result
}

/// Two-stage search for the lag `k` with `frame[t] ~ S(t + k)`.
///
/// Returns `None` when the best lag is on the search boundary, either
/// segment is silent, the correlation is not positive or its squared
/// normalized value is below [`WARP_COS2_MIN`].
pub fn search_lag(frame: &[i16; FRSZ], reference: &[i16; REFERENCE_LEN], pp: usize) -> Option<i32> {
    let len = search_window(pp);
    let span = MAX_WARP as usize;
    let shift = prescale_shift(&frame[..len], len)
        .max(prescale_shift(&reference[HIST_LEN - span..HIST_LEN + len + span], len));

    let mut coarse = 0;
    let mut best = f64::MIN;
    let mut lag = -MAX_WARP;
    while lag <= MAX_WARP {
        let score = correlate(frame, reference, lag, len, WARP_COARSE_STEP as usize, shift).score();
        if score > best {
            best = score;
            coarse = lag;
        }
        lag += WARP_COARSE_STEP;
    }

    let mut fine = coarse;
    let mut best = f64::MIN;
    let mut best_corr = None;
    let lo = (coarse - WARP_FINE_SPAN).max(-MAX_WARP);
    let hi = (coarse + WARP_FINE_SPAN).min(MAX_WARP);
    for lag in lo..=hi {
        let corr = correlate(frame, reference, lag, len, 1, shift);
        let score = corr.score();
        if score > best {
            best = score;
            fine = lag;
            best_corr = Some(corr);
        }
    }

    let corr = best_corr?;
    if fine.abs() == MAX_WARP
        || corr.frame_energy == 0
        || corr.reference_energy == 0
        || corr.cor <= 0
    {
        trace!("lag search rejected at {}", fine);
        return None;
    }
    let c = corr.cor as f64;
    let cos2 = c * c / (corr.frame_energy as f64 * corr.reference_energy as f64);
    if cos2 < WARP_COS2_MIN {
        trace!("lag search rejected at {}: cos2={:.3}", fine, cos2);
        return None;
    }
    trace!("lag search: coarse={} fine={} cos2={:.3}", coarse, fine, cos2);
    Some(fine)
}

/// Sample-shift resampler: `input` holds `FRSZ + lag` samples and is mapped
/// onto `FRSZ` by moving the read offset one sample per linear ramp
pub fn resample(input: &[i16], lag: i32, out: &mut [i16; FRSZ]) {
    let n = lag.unsigned_abs() as usize;
    if n == 0 {
        out.copy_from_slice(&input[..FRSZ]);
        return;
    }
    let sign = lag.signum();
    let width = (FRSZ - 1 - RESAMPLE_MARGIN) / n;
    let at = |t: usize, offset: usize| input[(t as i32 + sign * offset as i32) as usize];

    for (t, y) in out.iter_mut().enumerate() {
        if t < RESAMPLE_MARGIN {
            *y = input[t];
            continue;
        }
        let rel = t - RESAMPLE_MARGIN;
        let ramp = rel / width;
        if ramp >= n {
            *y = at(t, n);
            continue;
        }
        let pos = (rel % width) as i32;
        let a = at(t, ramp) as i32;
        let b = at(t, ramp + 1) as i32;
        *y = saturate((a * (width as i32 - pos) + b * pos) / width as i32);
    }
}

/// Linear cross-fade from `tail` into `frame` over `len` samples
pub fn overlap_add(tail: &[i16; TAIL_LEN], frame: &[i16; FRSZ], len: usize, out: &mut [i16; FRSZ]) {
    let len = len.min(TAIL_LEN);
    for (i, y) in out.iter_mut().enumerate() {
        *y = if i < len {
            let w = (((i as i32 + 1) << 15) / (len as i32 + 1)) as i16;
            saturate(mult_r(frame[i], w) as i32 + mult_r(tail[i], GAIN_ONE - w) as i32)
        } else {
            frame[i]
        };
    }
}

/// Splice without time warping
pub fn no_warp(
    decoded: &[i16; FRSZ],
    tail: &[i16; TAIL_LEN],
    merit_at_loss: &Merit,
    out: &mut [i16; FRSZ],
) -> Splice {
    let len = if merit_at_loss.value < MERIT_LOW {
        OLA_SHORT
    } else {
        OLA_LONG
    };
    overlap_add(tail, decoded, len, out);
    Splice::Overlap(len)
}

/// Resample the decoded frame by `lag` and cross-fade it in
pub fn warp(
    decoded: &[i16; FRSZ],
    tail: &[i16; TAIL_LEN],
    reference: &[i16; REFERENCE_LEN],
    lag: i32,
    out: &mut [i16; FRSZ],
) -> Splice {
    let n = lag.unsigned_abs() as usize;
    let mut input = [0i16; FRSZ + MAX_WARP as usize];
    let used = if lag > 0 {
        input[..n].copy_from_slice(&reference[HIST_LEN..HIST_LEN + n]);
        input[n..FRSZ + n].copy_from_slice(decoded);
        FRSZ + n
    } else {
        input[..FRSZ - n].copy_from_slice(&decoded[n..]);
        FRSZ - n
    };
    let mut resampled = [0i16; FRSZ];
    resample(&input[..used], lag, &mut resampled);
    overlap_add(tail, &resampled, OLA_WARP, out);
    Splice::Warp(lag)
}

/// Join the decoded frame to the concealed signal; a missing or zero lag
/// takes exactly the no-warp path
pub fn reconcile(
    decoded: &[i16; FRSZ],
    tail: &[i16; TAIL_LEN],
    reference: &[i16; REFERENCE_LEN],
    lag: Option<i32>,
    merit_at_loss: &Merit,
    out: &mut [i16; FRSZ],
) -> Splice {
    match lag {
        Some(k) if k != 0 => warp(decoded, tail, reference, k, out),
        _ => no_warp(decoded, tail, merit_at_loss, out),
    }
}
