//! Concealment engine constants
//!
//! Sample counts are at 16 kHz unless the name ends in `D` (decimated by
//! [`DECF`]) or `SB` (sub-band, 8 kHz).

// Frame geometry
/// Samples per frame
pub const FRSZ: usize = 160;
/// Sub-band samples per frame
pub const FRSZ_SB: usize = FRSZ / 2;
/// Decimated samples per frame
pub const FRSZD: usize = FRSZ / DECF;

// History and spectral analysis
/// History buffer length
pub const HIST_LEN: usize = 400;
/// LPC order
pub const LPCO: usize = 8;
/// LPC analysis window length
pub const WINSZ: usize = 320;
/// Rising part of the asymmetric analysis window
pub const WIN_RISE: usize = 280;
/// Falling part of the asymmetric analysis window
pub const WIN_FALL: usize = WINSZ - WIN_RISE;
/// Right shifts of the windowed signal tried before giving up on the analysis
pub const MAX_RESCALE_ATTEMPTS: usize = 4;
/// Largest reflection coefficient magnitude accepted by Levinson-Durbin
pub const STABILITY_LIMIT: f64 = 0.9995;
/// Bandwidth-expansion factor of the perceptual weighting filter
pub const WEIGHT_GAMMA: f64 = 0.75;

// Pitch analysis
/// Decimation factor
pub const DECF: usize = 8;
/// Minimum pitch period
pub const MINPP: usize = 40;
/// Maximum pitch period
pub const MAXPP: usize = 265;
/// Minimum decimated pitch period
pub const MINPPD: usize = 5;
/// Maximum decimated pitch period
pub const MAXPPD: usize = 33;
/// Pitch analysis window
pub const PWSZ: usize = 240;
/// Decimated pitch analysis window
pub const PWSZD: usize = PWSZ / DECF;
/// Decimated buffer length
pub const LXD: usize = MAXPPD + 1 + PWSZD + 2;
/// Taps of the decimation low-pass filter
pub const DECIMATION_TAPS: usize = 60;
/// Decimation filter cut-off in Hz
pub const DECIMATION_CUTOFF_HZ: f64 = 900.0;
/// Largest magnitude kept in the decimated buffer
pub const XWD_PEAK: i32 = 8191;
/// Search radius of the full-rate refinement
pub const REFINE_HALF: usize = 3;
/// Share of the best peak a sub-multiple must reach to replace it
pub const SUBMULTIPLE_THRESHOLD: f64 = 0.75;
/// Share of the chosen peak a peak near the previous pitch must reach
pub const PREVIOUS_PITCH_THRESHOLD: f64 = 0.7;
/// Pitch period used before any analysis
pub const DEFAULT_PP: usize = 100;
/// Entries in the pitch history
pub const PITCH_HISTORY: usize = 5;
/// Unity voicing tap in Q14
pub const TAP_ONE: i16 = 16384;

// Merit
/// Below this merit the frame is treated as unvoiced
pub const MERIT_LOW: f64 = 3.0;
/// Above this merit the frame is treated as fully voiced
pub const MERIT_HIGH: f64 = 12.0;
/// Minimum merit at loss for time-warped recovery
pub const MERIT_WARP: f64 = 7.5;
/// Long-term prediction gain clamp in dB
pub const LPG_MIN_DB: f64 = -10.0;
/// Upper long-term prediction gain clamp in dB
pub const LPG_MAX_DB: f64 = 30.0;
/// Log-energy reference (log2 of mean energy)
pub const LE_REF: f64 = 16.0;
/// Weight of the prediction gain term
pub const W_LPG: f64 = 1.0;
/// Weight of the first normalized autocorrelation term
pub const W_NC1: f64 = 4.0;
/// Weight of the log-energy term
pub const W_LE: f64 = 0.5;

// Erasure extrapolation
/// Samples of LPC ringing cross-faded at the first lost frame
pub const OLA_RING: usize = 20;
/// Lookahead produced beyond each concealed frame
pub const TAIL_LEN: usize = 64;
/// Lost frames played at full gain
pub const ATTN_START_FRAMES: u16 = 2;
/// Lost frames after which the output is muted; the ramp reaches zero
/// within the last of them
pub const MUTE_FRAMES: u16 = 6;
/// Per-sample Q15 gain decrement once attenuation starts
pub const GAIN_STEP: i16 = 52;
/// Unity gain in Q15
pub const GAIN_ONE: i16 = 32767;
/// Largest mean fractional pitch change accepted as drift, Q15 (0.05)
pub const MAX_DRIFT_Q15: i32 = 1638;
/// Good frames required before drift is estimated
pub const DRIFT_MIN_FRAMES: u16 = PITCH_HISTORY as u16;
/// Initial value of the frames-since-erasure counter
pub const FRAMES_SINCE_ERASURE_INIT: u16 = 255;
/// Initial noise generator state
pub const NOISE_SEED: u32 = 12345;

// Recovery
/// Largest time-warp lag
pub const MAX_WARP: i32 = 28;
/// Minimum lag-search window
pub const WARP_WINDOW_MIN: usize = 2 * MINPP;
/// Lag step of the quarter-rate search
pub const WARP_COARSE_STEP: i32 = 4;
/// Radius of the full-rate lag search around the coarse lag
pub const WARP_FINE_SPAN: i32 = 4;
/// Minimum squared normalized correlation of an accepted lag
pub const WARP_COS2_MIN: f64 = 0.49;
/// Samples at the start of a resampled frame left untouched
pub const RESAMPLE_MARGIN: usize = 32;
/// Cross-fade after a time-warped frame
pub const OLA_WARP: usize = OLA_LONG;
/// Cross-fade after unvoiced content
pub const OLA_SHORT: usize = 8;
/// Cross-fade after voiced content
pub const OLA_LONG: usize = 40;

// Predictor state bridge
/// DC-removal pole in Q15 (0.97)
pub const DC_POLE_Q15: i16 = 31785;
/// Good frames after a loss whose high band is decoded through the DC
/// blocker
pub const DC_BLOCK_FRAMES: u16 = 4;
/// Mean |delta a1| above which the tight pole limits apply
pub const POLE_STATIONARITY_LIMIT: i32 = 256;
/// Sub-band samples per drift detection window
pub const DRIFT_WINDOW: u16 = 240;
/// Share (percent) of same-sign partial reconstructions flagged as drift
pub const DRIFT_SIGN_PERCENT: u32 = 95;
/// Repeated partial reconstructions within one bridged frame flagged as
/// stuck
pub const STUCK_LIMIT: u16 = 40;
/// Sub-band samples retained on each side of the rephase buffer
pub const REPHASE_MARGIN: usize = (MAX_WARP as usize) / 2;
/// Longest erasure (frames) that can be rephased
pub const REPHASE_FRAMES: u16 = 2;
/// Rephase buffer length per band
pub const REPHASE_LEN: usize = 2 * REPHASE_MARGIN + REPHASE_FRAMES as usize * FRSZ_SB;
/// Scale-factor tracker weights `(old, new)` in Q15 (0.97, 0.03)
pub const NB_TRACK_WEIGHTS: (i16, i16) = (31785, 983);
/// Scale-factor change and mean weights `(old, new)` in Q15 (127/128, 1/128)
pub const NB_CHANGE_WEIGHTS: (i16, i16) = (32512, 256);
/// Low-band change below which `nb` is reseeded to its pre-loss mean
pub const NBL_STEADY_CHANGE: i16 = 6554;
/// Low-band change above which the bridged `nb` is kept
pub const NBL_UNSTEADY_CHANGE: i16 = 9830;
/// High-band change below which the long scale-factor smoothing runs
pub const NBH_STEADY_CHANGE: i16 = 819;
/// High-band change below which the short scale-factor smoothing runs
pub const NBH_SEMI_STEADY_CHANGE: i16 = 1311;
/// Sub-band samples of the short high-band scale-factor smoothing
pub const NBH_SMOOTH_SHORT: u16 = FRSZ_SB as u16;
/// Sub-band samples of the long high-band scale-factor smoothing
pub const NBH_SMOOTH_LONG: u16 = 3 * FRSZ_SB as u16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_sizes() {
        assert_eq!(FRSZD * DECF, FRSZ);
        assert!(MAXPP / DECF == MAXPPD);
        assert!(MINPP / DECF == MINPPD);
        assert!(LXD >= MAXPPD + 1 + PWSZD);
        assert!(HIST_LEN >= WINSZ);
        assert!(HIST_LEN >= PWSZ.min(HIST_LEN - MAXPP) + MAXPP);
        assert!(TAIL_LEN >= OLA_LONG);
        assert!(OLA_RING <= MINPP);
        assert_eq!(REPHASE_LEN, 188);
        assert!(TAIL_LEN >= 2 * REPHASE_MARGIN);
        assert!(NBL_STEADY_CHANGE < NBL_UNSTEADY_CHANGE);
        assert!(NBH_STEADY_CHANGE < NBH_SEMI_STEADY_CHANGE);
        // The ramp ends inside the last audible frame
        let ramp = (MUTE_FRAMES - ATTN_START_FRAMES) as i32 * FRSZ as i32;
        assert!(ramp * GAIN_STEP as i32 >= GAIN_ONE as i32);
        assert!((ramp - FRSZ as i32) * (GAIN_STEP as i32) < GAIN_ONE as i32);
    }
}
