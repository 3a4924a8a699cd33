//! G.722 QMF (Quadrature Mirror Filter) Implementation
//!
//! 24-tap analysis and synthesis filters. Delay lines hold the newest sample
//! at index 0. The functions take the delay line directly so the concealment
//! engine can run its own analysis filter next to the codec's.

use crate::codecs::g722::tables::QMF_COEFFS;
use crate::utils::basic_ops::saturate;

fn filter_pair(delay: &[i16; 24]) -> (i64, i64) {
    let mut accum_a = 0i64;
    let mut accum_b = 0i64;
    for i in 0..12 {
        accum_a += delay[i * 2] as i64 * QMF_COEFFS[i * 2] as i64;
        accum_b += delay[i * 2 + 1] as i64 * QMF_COEFFS[i * 2 + 1] as i64;
    }
    (accum_a, accum_b)
}

/// QMF analysis filter (encoder side)
///
/// Consumes two consecutive input samples, `first` then `second`, and returns
/// the `(low, high)` sub-band pair.
pub fn qmf_analysis(first: i16, second: i16, delay: &mut [i16; 24]) -> (i16, i16) {
    delay.copy_within(0..22, 2);
    delay[0] = second;
    delay[1] = first;

    let (accum_a, accum_b) = filter_pair(delay);
    let xl = saturate(((accum_a + accum_b) >> 15) as i32);
    let xh = saturate(((accum_a - accum_b) >> 15) as i32);
    (xl, xh)
}

/// QMF synthesis filter (decoder side)
///
/// Consumes one `(low, high)` sub-band pair and returns two output samples in
/// time order.
pub fn qmf_synthesis(rl: i16, rh: i16, delay: &mut [i16; 24]) -> (i16, i16) {
    delay.copy_within(0..22, 2);
    delay[0] = saturate(rl as i32 - rh as i32);
    delay[1] = saturate(rl as i32 + rh as i32);

    let (accum_a, accum_b) = filter_pair(delay);
    let first = saturate((accum_a >> 12) as i32);
    let second = saturate((accum_b >> 12) as i32);
    (first, second)
}
