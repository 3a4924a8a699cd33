//! Analysis tables for the concealment engine
//!
//! Windows and filters are computed once on first use.

use once_cell::sync::Lazy;
use std::f64::consts::PI;

use crate::plc::constants::{
    DECIMATION_CUTOFF_HZ, DECIMATION_TAPS, LPCO, WEIGHT_GAMMA, WINSZ, WIN_FALL, WIN_RISE,
};

const SAMPLE_RATE_HZ: f64 = 16000.0;
const LAG_WINDOW_HZ: f64 = 60.0;

fn to_q15(value: f64) -> i16 {
    (value * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Asymmetric LPC analysis window, Q15.
///
/// Rising half of a long Hann window followed by the falling half of a short
/// one, so the newest samples weigh most.
pub static LPC_WINDOW: Lazy<[i16; WINSZ]> = Lazy::new(|| {
    let mut window = [0i16; WINSZ];
    let rise = apodize::hanning_iter(2 * WIN_RISE).take(WIN_RISE);
    let fall = apodize::hanning_iter(2 * WIN_FALL).skip(WIN_FALL);
    for (w, v) in window.iter_mut().zip(rise.chain(fall)) {
        *w = to_q15(v);
    }
    window
});

/// Gaussian lag window for lags 1..=LPCO, Q15
pub static LAG_WINDOW: Lazy<[i16; LPCO]> = Lazy::new(|| {
    let mut window = [0i16; LPCO];
    for (k, w) in window.iter_mut().enumerate() {
        let arg = 2.0 * PI * LAG_WINDOW_HZ * (k + 1) as f64 / SAMPLE_RATE_HZ;
        *w = to_q15((-0.5 * arg * arg).exp());
    }
    window
});

/// Powers of the weighting factor, `gamma^i` in Q15 for i in 0..=LPCO
pub static WEIGHT_POWERS: Lazy<[i16; LPCO + 1]> = Lazy::new(|| {
    let mut powers = [0i16; LPCO + 1];
    for (i, p) in powers.iter_mut().enumerate() {
        *p = to_q15(WEIGHT_GAMMA.powi(i as i32));
    }
    powers
});

/// Decimation low-pass filter, Hamming-windowed sinc with unity DC gain, Q15
pub static DECIMATION_FILTER: Lazy<[i16; DECIMATION_TAPS]> = Lazy::new(|| {
    let fc = DECIMATION_CUTOFF_HZ / SAMPLE_RATE_HZ;
    let center = (DECIMATION_TAPS - 1) as f64 / 2.0;
    let mut taps = [0f64; DECIMATION_TAPS];
    for ((n, tap), w) in taps
        .iter_mut()
        .enumerate()
        .zip(apodize::hamming_iter(DECIMATION_TAPS))
    {
        let t = n as f64 - center;
        let sinc = if t == 0.0 {
            2.0 * fc
        } else {
            (2.0 * PI * fc * t).sin() / (PI * t)
        };
        *tap = sinc * w;
    }
    let sum: f64 = taps.iter().sum();
    let mut filter = [0i16; DECIMATION_TAPS];
    for (q, tap) in filter.iter_mut().zip(taps.iter()) {
        *q = to_q15(tap / sum);
    }
    filter
});

/// Build all tables now instead of on the first analysis
pub fn init_tables() {
    Lazy::force(&LPC_WINDOW);
    Lazy::force(&LAG_WINDOW);
    Lazy::force(&WEIGHT_POWERS);
    Lazy::force(&DECIMATION_FILTER);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lpc_window_shape() {
        let w = &*LPC_WINDOW;
        assert!(w[0] < 10);
        let peak = w.iter().enumerate().max_by_key(|(_, v)| **v).unwrap().0;
        assert!(peak >= WIN_RISE - 2 && peak <= WIN_RISE + 1);
        assert!(w[WINSZ - 1] < 200);
        assert!(w.iter().all(|&v| v >= 0));
    }

    #[test]
    fn test_lag_window_decreases() {
        let w = &*LAG_WINDOW;
        for k in 1..LPCO {
            assert!(w[k] <= w[k - 1]);
        }
        assert!(w[LPCO - 1] > 30000);
    }

    #[test]
    fn test_weight_powers() {
        let p = &*WEIGHT_POWERS;
        assert_eq!(p[0], 32767);
        assert_eq!(p[1], 24576);
        assert_eq!(p[2], 18432);
    }

    #[test]
    fn test_decimation_filter_unity_gain() {
        let sum: i32 = DECIMATION_FILTER.iter().map(|&v| v as i32).sum();
        assert!((sum - 32768).abs() < 40, "sum = {}", sum);
        // Symmetric linear-phase design
        for n in 0..DECIMATION_TAPS / 2 {
            let diff = DECIMATION_FILTER[n] as i32 - DECIMATION_FILTER[DECIMATION_TAPS - 1 - n] as i32;
            assert!(diff.abs() <= 1);
        }
    }
}
