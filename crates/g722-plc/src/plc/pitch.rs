//! Pitch estimation
//!
//! A coarse search runs on the perceptually weighted signal decimated 8:1,
//! then a full-rate search refines the period around the coarse estimate on
//! the history buffer. The voicing tap is the signed ratio of mean magnitudes
//! of the last window and the window one period earlier.

use tracing::trace;

use crate::plc::constants::{
    DECF, DECIMATION_TAPS, FRSZ, FRSZD, HIST_LEN, LXD, MAXPP, MAXPPD, MAX_DRIFT_Q15, MINPP,
    MINPPD, PITCH_HISTORY, PREVIOUS_PITCH_THRESHOLD, PWSZ, PWSZD, REFINE_HALF,
    SUBMULTIPLE_THRESHOLD, TAP_ONE, XWD_PEAK, DEFAULT_PP,
};
use crate::plc::history::HistoryBuffer;
use crate::plc::tables::DECIMATION_FILTER;
use crate::utils::basic_ops::{div_s, extract_h, l_shl, norm_l, saturate};

const XWD_MAX_EXP: i16 = 12;
const XWD_MIN_EXP: i16 = -8;

/// Analysis window used with period `pp`; long periods get a shorter window
/// so the window and its lagged copy fit the history
#[inline]
pub fn window_len(pp: usize) -> usize {
    PWSZ.min(HIST_LEN - pp)
}

/// Right shift making `n` products of the shifted samples sum below 2^30
pub fn prescale_shift(samples: &[i16], n: usize) -> i16 {
    let peak = samples.iter().map(|&v| (v as i32).abs()).max().unwrap_or(0) as i64;
    let mut shift = 0i16;
    while (n as i64) * (peak >> shift) * (peak >> shift) >= 1 << 30 {
        shift += 1;
    }
    shift
}

/// Left shift taking `magnitude` to at most [`XWD_PEAK`]
fn headroom(magnitude: i32) -> i16 {
    if magnitude == 0 {
        XWD_MAX_EXP
    } else {
        norm_l(magnitude) - norm_l(XWD_PEAK)
    }
}

/// 8:1 decimator with block floating-point storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimator {
    fir_mem: [i16; DECIMATION_TAPS - 1],
    xwd: [i16; LXD],
    exp: i16,
}

impl Decimator {
    /// Create a decimator with cleared memory
    pub fn new() -> Self {
        Self {
            fir_mem: [0; DECIMATION_TAPS - 1],
            xwd: [0; LXD],
            exp: XWD_MAX_EXP,
        }
    }

    /// Decimated samples, oldest first, scaled by `2^exponent()`
    pub fn samples(&self) -> &[i16; LXD] {
        &self.xwd
    }

    /// Scaling exponent shared by all stored samples
    pub fn exponent(&self) -> i16 {
        self.exp
    }

    /// Filter and decimate one frame of the weighted signal
    pub fn push_frame(&mut self, weighted: &[i16; FRSZ]) {
        const MEM: usize = DECIMATION_TAPS - 1;
        let mut input = [0i16; MEM + FRSZ];
        input[..MEM].copy_from_slice(&self.fir_mem);
        input[MEM..].copy_from_slice(weighted);

        let mut raw = [0i32; FRSZD];
        for (j, out) in raw.iter_mut().enumerate() {
            let n = MEM + j * DECF + DECF - 1;
            let mut acc = 0i64;
            for (t, &h) in DECIMATION_FILTER.iter().enumerate() {
                acc += h as i64 * input[n - t] as i64;
            }
            *out = (acc >> 15) as i32;
        }
        self.fir_mem.copy_from_slice(&input[FRSZ..]);

        let kept = LXD - FRSZD;
        self.xwd.copy_within(FRSZD.., 0);
        let old_peak = self.xwd[..kept].iter().map(|&v| (v as i32).abs()).max().unwrap_or(0);
        let new_peak = raw.iter().map(|v| v.abs()).max().unwrap_or(0);

        let old_cap = self.exp + headroom(old_peak);
        let exp = headroom(new_peak)
            .min(old_cap)
            .clamp(XWD_MIN_EXP, XWD_MAX_EXP);

        let delta = exp - self.exp;
        if delta != 0 {
            for v in self.xwd[..kept].iter_mut() {
                *v = saturate(l_shl(*v as i32, delta));
            }
        }
        for (dst, &v) in self.xwd[kept..].iter_mut().zip(raw.iter()) {
            *dst = saturate(l_shl(v, exp));
        }
        self.exp = exp;
    }
}

impl Default for Decimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Coarse pitch period (full-rate samples) from the decimated buffer.
///
/// Falls back to `previous` when no correlation peak exists.
pub fn coarse_pitch(xwd: &[i16; LXD], previous: usize) -> usize {
    const KLO: usize = MINPPD - 1;
    const KHI: usize = MAXPPD + 1;
    let target = &xwd[LXD - PWSZD..];

    // Signed normalized correlation c|c|/e per decimated lag
    let mut norm = [0f64; KHI + 1];
    for k in KLO..=KHI {
        let cand = &xwd[LXD - PWSZD - k..LXD - k];
        let mut cor = 0i32;
        let mut energy = 0i32;
        for (&t, &c) in target.iter().zip(cand.iter()) {
            cor += t as i32 * c as i32;
            energy += c as i32 * c as i32;
        }
        if energy > 0 {
            let c = cor as f64;
            norm[k] = c * c.abs() / energy as f64;
        }
    }

    let mut peaks = [0usize; MAXPPD];
    let mut count = find_peaks(&norm, &mut peaks);
    if count == 0 {
        for v in norm.iter_mut() {
            *v = -*v;
        }
        count = find_peaks(&norm, &mut peaks);
    }
    if count == 0 {
        return previous;
    }
    let peaks = &peaks[..count];

    let mut best = peaks[0];
    for &p in peaks {
        if norm[p] > norm[best] {
            best = p;
        }
    }

    // Prefer the shortest period the best peak is a multiple of
    let mut chosen = best;
    for &p in peaks.iter().filter(|&&p| p < best) {
        let m = (best as f64 / p as f64).round() as usize;
        if m < 2 {
            continue;
        }
        let err = (best as i32 - (m * p) as i32).abs() as f64;
        if err <= m as f64 / 2.0 + 1.0 && norm[p] >= SUBMULTIPLE_THRESHOLD * norm[best] {
            chosen = p;
            break;
        }
    }

    // Stay with the previous period when it is almost as good
    let prev_d = (previous + DECF / 2) / DECF;
    let mut override_peak = None;
    for &q in peaks {
        if q != chosen
            && (q as i32 - prev_d as i32).abs() <= 1
            && norm[q] >= PREVIOUS_PITCH_THRESHOLD * norm[chosen]
            && override_peak.map_or(true, |o: usize| norm[q] > norm[o])
        {
            override_peak = Some(q);
        }
    }
    if let Some(q) = override_peak {
        chosen = q;
    }

    let (y0, y1, y2) = (norm[chosen - 1], norm[chosen], norm[chosen + 1]);
    let denom = y0 - 2.0 * y1 + y2;
    let delta = if denom < 0.0 {
        (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    let coarse = ((chosen as f64 + delta) * DECF as f64).round() as usize;
    coarse.clamp(MINPP, MAXPP)
}

fn find_peaks(norm: &[f64], peaks: &mut [usize]) -> usize {
    let mut count = 0;
    for k in MINPPD..=MAXPPD {
        if norm[k] > 0.0 && norm[k] >= norm[k - 1] && norm[k] >= norm[k + 1] {
            peaks[count] = k;
            count += 1;
        }
    }
    count
}

/// Full-rate pitch estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchEstimate {
    /// Pitch period in samples
    pub period: usize,
    /// Voicing tap, Q14 in `[-16384, 16384]`
    pub tap: i16,
    /// Right shift applied before correlating
    pub shift: i16,
}

/// Refine a coarse period at full rate within `±REFINE_HALF`
pub fn refine_pitch(x: &[i16; HIST_LEN], coarse: usize) -> PitchEstimate {
    let lb = coarse.saturating_sub(REFINE_HALF).max(MINPP);
    let ub = (coarse + REFINE_HALF).min(MAXPP);
    let wsz = window_len(ub);
    let start = HIST_LEN - wsz;
    let shift = prescale_shift(&x[start - ub..], wsz);

    let mut best: Option<(usize, f64, i32)> = None;
    let mut best_any: Option<(usize, f64)> = None;
    for t in lb..=ub {
        let mut cor = 0i32;
        let mut energy = 0i32;
        for n in start..HIST_LEN {
            let a = (x[n] >> shift) as i32;
            let b = (x[n - t] >> shift) as i32;
            cor += a * b;
            energy += b * b;
        }
        if energy == 0 {
            continue;
        }
        let score = (cor as f64) * (cor as f64) / energy as f64;
        if cor > 0 && best.map_or(true, |(_, s, _)| score > s) {
            best = Some((t, score, cor));
        }
        if best_any.map_or(true, |(_, s)| score > s) {
            best_any = Some((t, score));
        }
    }

    let period = best
        .map(|(t, _, _)| t)
        .or(best_any.map(|(t, _)| t))
        .unwrap_or_else(|| coarse.clamp(MINPP, MAXPP));
    PitchEstimate {
        period,
        tap: voicing_tap(x, period),
        shift,
    }
}

/// Signed mean-magnitude ratio between the last window and the window one
/// period earlier, Q14, clamped to `[-1, 1]`
pub fn voicing_tap(x: &[i16; HIST_LEN], pp: usize) -> i16 {
    let wsz = window_len(pp);
    let mut num = 0i32;
    let mut den = 0i32;
    let mut cor = 0i64;
    for n in HIST_LEN - wsz..HIST_LEN {
        num += (x[n] as i32).abs();
        den += (x[n - pp] as i32).abs();
        cor += x[n] as i64 * x[n - pp] as i64;
    }
    if den == 0 || num == 0 {
        return 0;
    }
    let magnitude = if num >= den {
        TAP_ONE
    } else {
        let sh = norm_l(den);
        let num16 = extract_h(l_shl(num, sh));
        let den16 = extract_h(l_shl(den, sh));
        div_s(num16, den16) >> 1
    };
    if cor < 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Mean fractional period change over the pitch history, Q15.
///
/// `None` unless every consecutive change has the same non-zero sign and
/// the mean stays within [`MAX_DRIFT_Q15`].
pub fn pitch_drift(ppt: &[usize; PITCH_HISTORY]) -> Option<i32> {
    let mut sum = 0i32;
    let mut sign = 0i32;
    for w in ppt.windows(2) {
        let diff = w[1] as i32 - w[0] as i32;
        if diff == 0 || (sign != 0 && diff.signum() != sign) {
            return None;
        }
        sign = diff.signum();
        sum += (diff << 15) / w[0] as i32;
    }
    let mean = sum / (PITCH_HISTORY as i32 - 1);
    if mean.abs() > MAX_DRIFT_Q15 {
        None
    } else {
        Some(mean)
    }
}

/// Pitch state carried across frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PitchTracker {
    /// Decimated weighted signal
    pub decimator: Decimator,
    /// Last accepted period
    pub pp: usize,
    /// Accepted periods of the last frames, oldest first
    pub ppt: [usize; PITCH_HISTORY],
    /// Voicing tap of the last estimate, Q14
    pub tap: i16,
    /// Prescale shift of the last refinement
    pub shift: i16,
}

impl PitchTracker {
    /// Create a tracker at the default period
    pub fn new() -> Self {
        Self {
            decimator: Decimator::new(),
            pp: DEFAULT_PP,
            ppt: [DEFAULT_PP; PITCH_HISTORY],
            tap: 0,
            shift: 0,
        }
    }

    /// Run the full estimation for a good frame
    pub fn update(&mut self, history: &HistoryBuffer, weighted: &[i16; FRSZ]) -> PitchEstimate {
        self.decimator.push_frame(weighted);
        let coarse = coarse_pitch(self.decimator.samples(), self.pp);
        let estimate = refine_pitch(history.samples(), coarse);
        trace!(
            "pitch: coarse={} refined={} tap={}",
            coarse,
            estimate.period,
            estimate.tap
        );

        self.pp = estimate.period;
        self.tap = estimate.tap;
        self.shift = estimate.shift;
        self.ppt.copy_within(1.., 0);
        self.ppt[PITCH_HISTORY - 1] = estimate.period;
        estimate
    }

    /// Keep the decimator running through a concealed frame
    pub fn advance(&mut self, weighted: &[i16; FRSZ]) {
        self.decimator.push_frame(weighted);
    }
}

impl Default for PitchTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescale_shift_bounds_products() {
        assert_eq!(prescale_shift(&[0, 0, 0], 240), 0);
        assert_eq!(prescale_shift(&[100, -200], 240), 0);
        let s = prescale_shift(&[i16::MIN, 5], 240);
        let peak = 32768i64 >> s;
        assert!(240 * peak * peak < 1 << 30);
        assert!(240 * (32768i64 >> (s - 1)).pow(2) >= 1 << 30);
    }

    #[test]
    fn test_window_len() {
        assert_eq!(window_len(MINPP), PWSZ);
        assert_eq!(window_len(MAXPP), HIST_LEN - MAXPP);
    }

    #[test]
    fn test_decimator_keeps_headroom() {
        let mut decimator = Decimator::new();
        let loud = [30000i16; FRSZ];
        for _ in 0..4 {
            decimator.push_frame(&loud);
        }
        let peak = decimator.samples().iter().map(|&v| (v as i32).abs()).max().unwrap();
        assert!(peak <= XWD_PEAK);
        assert!(peak > XWD_PEAK / 2);
        assert!(decimator.exponent() < 0);

        let quiet = [3i16; FRSZ];
        for _ in 0..6 {
            decimator.push_frame(&quiet);
        }
        assert!(decimator.exponent() > 0);
        let peak = decimator.samples().iter().map(|&v| (v as i32).abs()).max().unwrap();
        assert!(peak <= XWD_PEAK);
    }

    #[test]
    fn test_coarse_pitch_on_decimated_pulse_train() {
        // Period of 12 decimated samples (96 at full rate)
        let mut xwd = [0i16; LXD];
        for (n, v) in xwd.iter_mut().enumerate() {
            let phase = n % 12;
            *v = match phase {
                0 => 6000,
                1 => 3000,
                11 => 2000,
                _ => -500,
            };
        }
        let pp = coarse_pitch(&xwd, DEFAULT_PP);
        assert!((pp as i32 - 96).abs() <= 4, "pp = {}", pp);
    }

    #[test]
    fn test_coarse_pitch_without_peaks_keeps_previous() {
        let xwd = [0i16; LXD];
        assert_eq!(coarse_pitch(&xwd, 123), 123);
    }

    #[test]
    fn test_refine_pitch_finds_exact_period() {
        let mut x = [0i16; HIST_LEN];
        for (n, v) in x.iter_mut().enumerate() {
            let phase = (n % 77) as f64 / 77.0;
            *v = ((phase * 2.0 * std::f64::consts::PI).sin() * 8000.0
                + (phase * 6.0 * std::f64::consts::PI).sin() * 3000.0) as i16;
        }
        let estimate = refine_pitch(&x, 79);
        assert_eq!(estimate.period, 77);
        assert!(estimate.tap > 16000);
    }

    #[test]
    fn test_voicing_tap_sign_and_clamp() {
        let mut x = [0i16; HIST_LEN];
        // Alternating polarity every 50 samples: anti-periodic at lag 50
        for (n, v) in x.iter_mut().enumerate() {
            let sign = if (n / 50) % 2 == 0 { 1.0 } else { -1.0 };
            *v = (sign * 4000.0 * (n as f64 * 0.3).sin().abs()) as i16;
        }
        let tap = voicing_tap(&x, 50);
        assert!(tap < 0);
        assert!(tap >= -TAP_ONE);

        // Growing signal: ratio above one is clamped
        let mut y = [0i16; HIST_LEN];
        for (n, v) in y.iter_mut().enumerate() {
            *v = (n as i16) * 10 + 1;
        }
        assert_eq!(voicing_tap(&y, 60), TAP_ONE);
        assert_eq!(voicing_tap(&[0i16; HIST_LEN], 60), 0);
    }

    #[test]
    fn test_pitch_drift_rules() {
        assert_eq!(pitch_drift(&[100, 100, 100, 100, 100]), None);
        assert_eq!(pitch_drift(&[100, 101, 100, 101, 102]), None);
        let drift = pitch_drift(&[100, 101, 102, 103, 104]).unwrap();
        assert!(drift > 300 && drift < 340, "drift = {}", drift);
        assert!(pitch_drift(&[100, 99, 98, 97, 96]).unwrap() < 0);
        // 10 % per frame is not drift
        assert_eq!(pitch_drift(&[100, 110, 121, 133, 146]), None);
    }
}
