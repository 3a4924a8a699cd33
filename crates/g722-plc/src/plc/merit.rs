//! Figure of merit
//!
//! One scalar rating how periodic the signal before a loss was. It combines
//! the long-term prediction gain at the accepted pitch, the first normalized
//! autocorrelation and the log energy of the analysis window.

use crate::plc::constants::{
    GAIN_ONE, HIST_LEN, LE_REF, LPG_MAX_DB, LPG_MIN_DB, MERIT_HIGH, MERIT_LOW, W_LE, W_LPG, W_NC1,
};
use crate::plc::pitch::window_len;

const LE_MAX: f64 = 32.0;

/// Merit and the terms it was built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merit {
    /// Combined figure of merit
    pub value: f64,
    /// Long-term prediction gain in dB
    pub lpg: f64,
    /// First normalized autocorrelation
    pub nc1: f64,
    /// log2 of the mean energy
    pub le: f64,
}

impl Merit {
    /// Merit of silence
    pub const SILENT: Self = Self {
        value: W_LE * -LE_REF,
        lpg: 0.0,
        nc1: 0.0,
        le: 0.0,
    };

    /// Build a merit from window sums.
    ///
    /// `energy` is the window energy, `residual` the energy left after pitch
    /// prediction, `lag1` the lag-one correlation and `len` the window length.
    pub fn from_sums(energy: i64, residual: i64, lag1: i64, len: usize) -> Self {
        if energy <= 0 {
            return Self::SILENT;
        }
        let e = energy as f64;
        let lpg = if residual <= 0 {
            LPG_MAX_DB
        } else {
            (10.0 * (e / residual as f64).log10()).clamp(LPG_MIN_DB, LPG_MAX_DB)
        };
        let nc1 = lag1 as f64 / e;
        let le = (e / len.max(1) as f64).log2().clamp(0.0, LE_MAX);
        Self {
            value: combine(lpg, nc1, le),
            lpg,
            nc1,
            le,
        }
    }

    /// Periodic share of the concealment mix, Q15
    pub fn mix_ratio(&self) -> i16 {
        mix_ratio(self.value)
    }
}

/// Weighted sum of the merit terms
#[inline]
pub fn combine(lpg: f64, nc1: f64, le: f64) -> f64 {
    W_LPG * lpg + W_NC1 * nc1 + W_LE * (le - LE_REF)
}

/// Periodic share for a merit value, Q15 in `[0, 32767]`
pub fn mix_ratio(merit: f64) -> i16 {
    let share = ((merit - MERIT_LOW) / (MERIT_HIGH - MERIT_LOW)).clamp(0.0, 1.0);
    (share * GAIN_ONE as f64).round() as i16
}

/// Evaluate the merit of the newest history window for period `pp` and
/// voicing tap `tap` (Q14)
pub fn evaluate(x: &[i16; HIST_LEN], pp: usize, tap: i16) -> Merit {
    let len = window_len(pp);
    let mut energy = 0i64;
    let mut residual = 0i64;
    let mut lag1 = 0i64;
    for n in HIST_LEN - len..HIST_LEN {
        let v = x[n] as i64;
        let predicted = (tap as i64 * x[n - pp] as i64) >> 14;
        energy += v * v;
        residual += (v - predicted) * (v - predicted);
        lag1 += v * x[n - 1] as i64;
    }
    Merit::from_sums(energy, residual, lag1, len)
}

/// First normalized autocorrelation of a block, 0 for silence
pub fn first_autocorrelation(samples: &[i16]) -> f64 {
    let mut energy = 0i64;
    let mut lag1 = 0i64;
    for (n, &v) in samples.iter().enumerate() {
        energy += v as i64 * v as i64;
        if n > 0 {
            lag1 += v as i64 * samples[n - 1] as i64;
        }
    }
    if energy == 0 {
        0.0
    } else {
        lag1 as f64 / energy as f64
    }
}
