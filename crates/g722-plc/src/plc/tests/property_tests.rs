//! Property-based tests

use proptest::prelude::*;

use crate::codecs::g722::G722PlcDecoder;
use crate::plc::constants::{
    FRSZ, GAIN_ONE, MAXPP, MAX_DRIFT_Q15, MERIT_HIGH, MERIT_LOW, MINPP, MUTE_FRAMES, OLA_LONG,
    TAIL_LEN, TAP_ONE,
};
use crate::plc::extrapolate::apply_drift;
use crate::plc::merit::{mix_ratio, Merit};
use crate::plc::recovery::{overlap_add, reconcile, REFERENCE_LEN};
use crate::plc::Splice;
use crate::types::{DecoderConfig, G722Mode};

fn frame_from(values: &[i16]) -> [i16; FRSZ] {
    let mut frame = [0i16; FRSZ];
    frame.copy_from_slice(values);
    frame
}

fn tail_from(values: &[i16]) -> [i16; TAIL_LEN] {
    let mut tail = [0i16; TAIL_LEN];
    tail.copy_from_slice(values);
    tail
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn state_stays_in_range_for_any_stream(
        codes in prop::collection::vec(any::<u8>(), 80 * 16),
        lost in prop::collection::vec(any::<bool>(), 16),
        mode in 1u8..=3,
    ) {
        let config = DecoderConfig::new(G722Mode::from_number(mode).unwrap());
        let mut decoder = G722PlcDecoder::new(config).unwrap();
        let mut run = 0u16;
        for (frame_codes, &bad) in codes.chunks_exact(80).zip(lost.iter()) {
            let mut out = [0i16; FRSZ];
            decoder.process_frame(Some(frame_codes), FRSZ, bad, &mut out).unwrap();
            run = if bad { run + 1 } else { 0 };

            let state = decoder.plc_state();
            prop_assert_eq!(state.erasure_count(), run);
            prop_assert!(state.pitch_period() >= MINPP && state.pitch_period() <= MAXPP);
            prop_assert!(state.voicing_tap().abs() <= TAP_ONE);
            prop_assert!(state.mix_ratio() >= 0);
            prop_assert!(state.erasure.gain >= 0);
            if run > MUTE_FRAMES {
                prop_assert!(out.iter().all(|&v| v == 0));
            }
        }
    }

    #[test]
    fn merit_falls_as_prediction_residual_grows(
        energy in 1i64..1_000_000_000_000,
        a in 0i64..2_000_000_000_000,
        b in 0i64..2_000_000_000_000,
        lag1 in -1_000_000i64..1_000_000,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let better = Merit::from_sums(energy, low, lag1, 240);
        let worse = Merit::from_sums(energy, high, lag1, 240);
        prop_assert!(better.value >= worse.value);
        prop_assert!(better.lpg >= worse.lpg);
    }

    #[test]
    fn mix_ratio_is_monotone_and_clamped(a in -50.0f64..50.0, b in -50.0f64..50.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(mix_ratio(low) <= mix_ratio(high));
        prop_assert!(mix_ratio(low) >= 0);
        if low <= MERIT_LOW {
            prop_assert_eq!(mix_ratio(low), 0);
        }
        if high >= MERIT_HIGH {
            prop_assert_eq!(mix_ratio(high), GAIN_ONE);
        }
    }

    #[test]
    fn drift_keeps_period_in_range(
        pp in MINPP..=MAXPP,
        drift in -MAX_DRIFT_Q15..=MAX_DRIFT_Q15,
    ) {
        let adjusted = apply_drift(pp, drift);
        prop_assert!(adjusted >= MINPP && adjusted <= MAXPP);
        // At most a 5% change, rounded
        prop_assert!((adjusted as i64 - pp as i64).abs() <= (pp as i64 * 5 + 99) / 100);
    }

    #[test]
    fn zero_lag_is_the_plain_cross_fade(
        decoded in prop::collection::vec(any::<i16>(), FRSZ),
        tail in prop::collection::vec(any::<i16>(), TAIL_LEN),
        merit in 0.0f64..20.0,
    ) {
        let decoded = frame_from(&decoded);
        let tail = tail_from(&tail);
        let reference = [0i16; REFERENCE_LEN];
        let merit = Merit { value: merit, ..Merit::SILENT };

        let mut none = [0i16; FRSZ];
        let mut zero = [0i16; FRSZ];
        let a = reconcile(&decoded, &tail, &reference, None, &merit, &mut none);
        let b = reconcile(&decoded, &tail, &reference, Some(0), &merit, &mut zero);
        prop_assert_eq!(a, b);
        prop_assert!(matches!(a, Splice::Overlap(_)));
        prop_assert_eq!(&none[..], &zero[..]);
    }

    #[test]
    fn cross_fade_ends_on_the_frame(
        decoded in prop::collection::vec(any::<i16>(), FRSZ),
        tail in prop::collection::vec(any::<i16>(), TAIL_LEN),
        len in 1usize..=OLA_LONG,
    ) {
        let decoded = frame_from(&decoded);
        let tail = tail_from(&tail);
        let mut out = [0i16; FRSZ];
        overlap_add(&tail, &decoded, len, &mut out);
        prop_assert_eq!(&out[len..], &decoded[len..]);
    }
}
