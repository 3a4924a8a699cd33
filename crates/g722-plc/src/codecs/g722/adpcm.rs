//! G.722 ADPCM Implementation
//!
//! Sub-band quantizers, inverse quantizers, scale-factor adaptation and the
//! pole/zero predictor update (ITU-T G.722 blocks 1L-6L and 1H-6H).
//!
//! The predictor update is shared with the concealment engine, which replays
//! it on synthesized sub-band samples during erasures. Two seams exist for
//! that purpose: [`PoleLimits`] bounds the pole coefficients and a
//! [`ReconstructionFilter`] may condition the reconstructed signals before
//! they reach the pole section.

use crate::codecs::g722::state::AdpcmBand;
use crate::codecs::g722::tables::{
    IHN, IHP, ILA2, ILN, ILP, NBH_MAX, NBL_MAX, Q2, Q6, QTAB2, QTAB4, QTAB5, QTAB6, RLOW_MAX,
    RLOW_MIN, WHI, WLI,
};
use crate::types::G722Mode;
use crate::utils::basic_ops::saturate;

/// Stability bounds applied to the pole-section coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoleLimits {
    /// Bound on `|a2|`
    pub a2_max: i16,
    /// `|a1|` is limited to `a1_total - a2`
    pub a1_total: i16,
}

impl PoleLimits {
    /// Limits of the G.722 recommendation
    pub const STANDARD: Self = Self {
        a2_max: 12288,
        a1_total: 15360,
    };

    /// Tighter limits used while the predictor is adapting on synthetic input
    pub const TIGHT: Self = Self {
        a2_max: 8192,
        a1_total: 14336,
    };
}

impl Default for PoleLimits {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Conditioning applied to the partial and full reconstruction of a sample
/// before the pole section adapts on them
pub trait ReconstructionFilter {
    /// Returns the filtered `(partial, full)` reconstruction
    fn filter(&mut self, partial: i16, full: i16) -> (i16, i16);
}

/// Pass-through filter used by the normal codec path
#[derive(Debug, Clone, Copy, Default)]
pub struct Unfiltered;

impl ReconstructionFilter for Unfiltered {
    #[inline]
    fn filter(&mut self, partial: i16, full: i16) -> (i16, i16) {
        (partial, full)
    }
}

/// Low-band quantizer (QUANTL), 6-bit code
pub fn quantl(el: i16, det: i16) -> u8 {
    let wd = if el >= 0 { el as i32 } else { -(el as i32 + 1) };
    let mut i = 1;
    while i < 30 {
        let level = (Q6[i] as i32 * det as i32) >> 12;
        if wd < level {
            break;
        }
        i += 1;
    }
    if el < 0 {
        ILN[i]
    } else {
        ILP[i]
    }
}

/// High-band quantizer (QUANTH), 2-bit code
pub fn quanth(eh: i16, det: i16) -> u8 {
    let wd = if eh >= 0 { eh as i32 } else { -(eh as i32 + 1) };
    let level = (Q2 * det as i32) >> 12;
    let mih = if wd >= level { 2 } else { 1 };
    if eh < 0 {
        IHN[mih]
    } else {
        IHP[mih]
    }
}

/// Mode-dependent low-band inverse quantizer (INVQBL)
pub fn invqbl(il: u8, det: i16, mode: G722Mode) -> i16 {
    let il = (il & 0x3F) as usize;
    let level = match mode {
        G722Mode::Mode1 => QTAB6[il],
        G722Mode::Mode2 => QTAB5[il >> 1],
        G722Mode::Mode3 => QTAB4[il >> 2],
    };
    ((det as i32 * level as i32) >> 15) as i16
}

/// 4-bit low-band inverse quantizer feeding the predictor (INVQAL)
pub fn invqal(il: u8, det: i16) -> i16 {
    let ril = ((il & 0x3F) >> 2) as usize;
    ((det as i32 * QTAB4[ril] as i32) >> 15) as i16
}

/// High-band inverse quantizer (INVQAH)
pub fn invqah(ih: u8, det: i16) -> i16 {
    ((det as i32 * QTAB2[(ih & 0x03) as usize] as i32) >> 15) as i16
}

/// Low-band log scale factor update (LOGSCL)
pub fn logscl(il: u8, nbl: i16) -> i16 {
    let ril = ((il & 0x3F) >> 2) as usize;
    let nbpl = ((nbl as i32 * 32512) >> 15) + WLI[ril] as i32;
    nbpl.clamp(0, NBL_MAX) as i16
}

/// High-band log scale factor update (LOGSCH)
pub fn logsch(ih: u8, nbh: i16) -> i16 {
    let nbph = ((nbh as i32 * 32512) >> 15) + WHI[(ih & 0x03) as usize] as i32;
    nbph.clamp(0, NBH_MAX) as i16
}

/// Low-band linear scale factor (SCALEL)
pub fn scalel(nbpl: i16) -> i16 {
    let wd1 = ((nbpl >> 6) & 511) as usize;
    ILA2[(wd1 + 64).min(ILA2.len() - 1)]
}

/// High-band linear scale factor (SCALEH)
pub fn scaleh(nbph: i16) -> i16 {
    let wd = ((nbph >> 6) & 511) as usize;
    ILA2[wd.min(ILA2.len() - 1)]
}

/// Second pole coefficient update (UPPOL2)
fn uppol2(band: &AdpcmBand, limits: PoleLimits) -> i16 {
    let sg0 = band.p[0] >> 15;
    let sg1 = band.p[1] >> 15;
    let sg2 = band.p[2] >> 15;

    let wd1 = saturate((band.a[1] as i32) << 2) as i32;
    let wd2 = if sg0 == sg1 { -wd1 } else { wd1 };
    let wd2 = wd2.min(32767);
    let mut wd3 = if sg0 == sg2 { 128 } else { -128 };
    wd3 += wd2 >> 7;
    wd3 += (band.a[2] as i32 * 32512) >> 15;
    let bound = limits.a2_max as i32;
    wd3.clamp(-bound, bound) as i16
}

/// First pole coefficient update (UPPOL1)
fn uppol1(band: &AdpcmBand, ap2: i16, limits: PoleLimits) -> i16 {
    let sg0 = band.p[0] >> 15;
    let sg1 = band.p[1] >> 15;
    let wd1 = if sg0 == sg1 { 192 } else { -192 };
    let wd2 = (band.a[1] as i32 * 32640) >> 15;
    let ap1 = saturate(wd1 + wd2) as i32;
    let wd3 = saturate(limits.a1_total as i32 - ap2 as i32) as i32;
    ap1.clamp(-wd3, wd3) as i16
}

/// Zero coefficient update (UPZERO), returns the new `b[1..=6]`
fn upzero(band: &AdpcmBand, dx: i16) -> [i16; 7] {
    let wd1 = if dx == 0 { 0 } else { 128 };
    let sg0 = dx >> 15;
    let mut bp = [0i16; 7];
    for i in 1..7 {
        let sgi = band.d[i] >> 15;
        let wd2 = if sgi == sg0 { wd1 } else { -wd1 };
        let wd3 = (band.b[i] as i32 * 32640) >> 15;
        bp[i] = saturate(wd2 + wd3);
    }
    bp
}

/// Pole-section prediction (FILTEP)
pub fn filtep(r: &[i16; 3], a: &[i16; 3]) -> i16 {
    let wd1 = saturate(r[1] as i32 + r[1] as i32) as i32;
    let wd1 = (a[1] as i32 * wd1) >> 15;
    let wd2 = saturate(r[2] as i32 + r[2] as i32) as i32;
    let wd2 = (a[2] as i32 * wd2) >> 15;
    saturate(wd1 + wd2)
}

/// Zero-section prediction (FILTEZ)
pub fn filtez(d: &[i16; 7], b: &[i16; 7]) -> i16 {
    let mut sz = 0i32;
    for i in (1..7).rev() {
        let wd1 = saturate(d[i] as i32 + d[i] as i32) as i32;
        sz += (b[i] as i32 * wd1) >> 15;
    }
    saturate(sz)
}

/// Recompute the pole-section estimate and the full estimate from the
/// current coefficients (FILTEP + PREDIC)
pub fn refresh_pole_prediction(band: &mut AdpcmBand) {
    band.sp = filtep(&band.r, &band.a);
    band.s = saturate(band.sp as i32 + band.sz as i32);
}

/// Predictor adaptation for one quantized difference (block 4).
///
/// Returns the full reconstruction as seen by the pole section, i.e. after
/// `filter`.
pub fn adapt_predictor<F: ReconstructionFilter>(
    band: &mut AdpcmBand,
    dx: i16,
    limits: PoleLimits,
    filter: &mut F,
) -> i16 {
    // RECONS and PARREC
    let r0 = saturate(band.s as i32 + dx as i32);
    let p0 = saturate(band.sz as i32 + dx as i32);
    let (p0, r0) = filter.filter(p0, r0);
    band.d[0] = dx;
    band.r[0] = r0;
    band.p[0] = p0;

    let ap2 = uppol2(band, limits);
    let ap1 = uppol1(band, ap2, limits);
    let bp = upzero(band, dx);

    // DELAYZ
    for i in (1..7).rev() {
        band.d[i] = band.d[i - 1];
        band.b[i] = bp[i];
    }
    // DELAYA
    for i in (1..3).rev() {
        band.r[i] = band.r[i - 1];
        band.p[i] = band.p[i - 1];
    }
    band.a[1] = ap1;
    band.a[2] = ap2;

    band.sz = filtez(&band.d, &band.b);
    refresh_pole_prediction(band);
    r0
}

/// Encode one low-band sample, returning the 6-bit code
pub fn encode_low(band: &mut AdpcmBand, xl: i16) -> u8 {
    encode_low_with(band, xl, PoleLimits::STANDARD)
}

/// Low-band encoder step with explicit pole limits
pub fn encode_low_with(band: &mut AdpcmBand, xl: i16, limits: PoleLimits) -> u8 {
    let el = saturate(xl as i32 - band.s as i32);
    let il = quantl(el, band.det);
    let dlow = invqal(il, band.det);
    band.nb = logscl(il, band.nb);
    band.det = scalel(band.nb);
    adapt_predictor(band, dlow, limits, &mut Unfiltered);
    il
}

/// Encode one high-band sample, returning the 2-bit code
pub fn encode_high(band: &mut AdpcmBand, xh: i16) -> u8 {
    encode_high_with(band, xh, PoleLimits::STANDARD, &mut Unfiltered)
}

/// High-band encoder step with explicit pole limits and reconstruction
/// filter
pub fn encode_high_with<F: ReconstructionFilter>(
    band: &mut AdpcmBand,
    xh: i16,
    limits: PoleLimits,
    filter: &mut F,
) -> u8 {
    let eh = saturate(xh as i32 - band.s as i32);
    let ih = quanth(eh, band.det);
    let dhigh = invqah(ih, band.det);
    band.nb = logsch(ih, band.nb);
    band.det = scaleh(band.nb);
    adapt_predictor(band, dhigh, limits, filter);
    ih
}

/// Decode one low-band code, returning the reconstructed sub-band sample
pub fn decode_low(band: &mut AdpcmBand, il: u8, mode: G722Mode) -> i16 {
    let dq = invqbl(il, band.det, mode);
    let rlow = (band.s as i32 + dq as i32).clamp(RLOW_MIN, RLOW_MAX) as i16;

    let dlowt = invqal(il, band.det);
    band.nb = logscl(il, band.nb);
    band.det = scalel(band.nb);
    adapt_predictor(band, dlowt, PoleLimits::STANDARD, &mut Unfiltered);
    rlow
}

/// Decode one high-band code, returning the reconstructed sub-band sample
pub fn decode_high(band: &mut AdpcmBand, ih: u8) -> i16 {
    decode_high_with(band, ih, &mut Unfiltered)
}

/// Decode one high-band code through a reconstruction filter; the returned
/// sample is the filtered reconstruction
pub fn decode_high_with<F: ReconstructionFilter>(band: &mut AdpcmBand, ih: u8, filter: &mut F) -> i16 {
    let dhigh = invqah(ih, band.det);
    band.nb = logsch(ih, band.nb);
    band.det = scaleh(band.nb);
    let rhigh = adapt_predictor(band, dhigh, PoleLimits::STANDARD, filter);
    (rhigh as i32).clamp(RLOW_MIN, RLOW_MAX) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::g722::state::AdpcmBand;

    #[test]
    fn test_quantl_small_differences() {
        // With det = 4096 the decision levels equal the Q6 table
        assert_eq!(quantl(0, 4096), 61);
        assert_eq!(quantl(-1, 4096), 63);
        assert_eq!(quantl(40, 4096), 60);
    }

    #[test]
    fn test_quantl_saturates_to_outer_level() {
        assert_eq!(quantl(i16::MAX, 32), ILP[30]);
        assert_eq!(quantl(i16::MIN, 32), ILN[30]);
    }

    #[test]
    fn test_quanth_levels() {
        // 564 * 8 >> 12 == 1
        assert_eq!(quanth(0, 8), 3);
        assert_eq!(quanth(5, 8), 2);
        assert_eq!(quanth(-1, 8), 1);
        assert_eq!(quanth(-10, 8), 0);
    }

    #[test]
    fn test_scale_factor_bounds() {
        let mut nb = 0;
        for _ in 0..1000 {
            nb = logscl(4, nb);
        }
        assert_eq!(nb as i32, NBL_MAX);
        assert_eq!(scalel(0), 32);
        assert_eq!(scaleh(0), 8);

        let mut nbh = 0;
        for _ in 0..1000 {
            nbh = logsch(0, nbh);
        }
        assert_eq!(nbh as i32, NBH_MAX);
    }

    #[test]
    fn test_pole_coefficients_respect_limits() {
        let mut band = AdpcmBand::new_low_band();
        for n in 0..2000 {
            let x = if (n / 3) % 2 == 0 { 12000 } else { -12000 };
            encode_low(&mut band, x);
            assert!(band.a[2].abs() <= PoleLimits::STANDARD.a2_max);
            assert!(band.a[1].abs() as i32 <= 15360 - band.a[2] as i32);
        }

        let mut band = AdpcmBand::new_low_band();
        for n in 0..2000 {
            let dx = if n % 5 < 2 { 3000 } else { -2000 };
            adapt_predictor(&mut band, dx, PoleLimits::TIGHT, &mut Unfiltered);
            assert!(band.a[2].abs() <= PoleLimits::TIGHT.a2_max);
            assert!(band.a[1].abs() as i32 <= 14336 - band.a[2] as i32);
        }
    }

    #[test]
    fn test_encoder_and_decoder_track_each_other() {
        let mut enc = AdpcmBand::new_low_band();
        let mut dec = AdpcmBand::new_low_band();
        for n in 0..400 {
            let x = ((n as f64 * 0.2).sin() * 6000.0) as i16;
            let il = encode_low(&mut enc, x);
            decode_low(&mut dec, il, G722Mode::Mode1);
            assert_eq!(enc, dec);
        }

        let mut enc = AdpcmBand::new_high_band();
        let mut dec = AdpcmBand::new_high_band();
        for n in 0..400 {
            let x = ((n as f64 * 1.3).sin() * 2000.0) as i16;
            let ih = encode_high(&mut enc, x);
            decode_high(&mut dec, ih);
            assert_eq!(enc, dec);
        }
    }

    struct Halve;

    impl ReconstructionFilter for Halve {
        fn filter(&mut self, partial: i16, full: i16) -> (i16, i16) {
            (partial / 2, full / 2)
        }
    }

    #[test]
    fn test_filtered_high_band_decode() {
        let mut plain = AdpcmBand::new_high_band();
        let mut filtered = AdpcmBand::new_high_band();
        let mut through = AdpcmBand::new_high_band();
        for ih in [3u8, 2, 2, 1, 0, 3, 2, 1] {
            let r = decode_high(&mut plain, ih);
            assert_eq!(decode_high_with(&mut through, ih, &mut Unfiltered), r);
            let h = decode_high_with(&mut filtered, ih, &mut Halve);
            // The filtered value is what the pole section keeps
            assert_eq!(h, filtered.r[0]);
        }
        assert_eq!(plain, through);
        assert_eq!(plain.nb, filtered.nb);
        assert_ne!(plain.r, filtered.r);
    }

    #[test]
    fn test_low_band_reconstruction_follows_input() {
        let mut enc = AdpcmBand::new_low_band();
        let mut dec = AdpcmBand::new_low_band();
        let mut err = 0i64;
        let mut energy = 0i64;
        for n in 0..800 {
            let x = ((n as f64 * 0.15).sin() * 8000.0) as i16;
            let il = encode_low(&mut enc, x);
            let r = decode_low(&mut dec, il, G722Mode::Mode1);
            if n >= 200 {
                err += (x as i64 - r as i64).pow(2);
                energy += (x as i64).pow(2);
            }
        }
        assert!(err * 30 < energy, "SNR below 15 dB: err={} energy={}", err, energy);
    }
}
