//! G.722 Packet-Loss Concealment
//!
//! Conceals erased 10 ms frames of a G.722 stream and brings the decoder's
//! adaptive predictors back in line when data resumes.
//!
//! # Architecture
//!
//! - `history`: output history feeding every analysis
//! - `lpc`: order-8 LPC analysis, weighting and synthesis filters
//! - `pitch`: decimated coarse search, full-rate refinement, voicing tap
//! - `merit`: voicing figure of merit and the periodic/noise mix ratio
//! - `extrapolate`: lost-frame synthesis and gain ramp
//! - `recovery`: lag search, resampling and cross-fade on the first good frame
//! - `bridge`: predictor adaptation on concealed samples, drift and stuck
//!   resets, post-loss scale-factor reseeding, high-band smoothing and DC
//!   removal
//! - `state`: the per-stream [`PlcState`]
//!
//! # Frame flow
//!
//! A good frame is decoded (after the recovery bookkeeping if the previous
//! frame was lost), spliced onto the concealed signal when needed, appended
//! to the history and analyzed. A lost frame is synthesized from the
//! analysis, appended to the history and replayed through both predictors.

pub mod bridge;
pub mod constants;
pub mod extrapolate;
pub mod history;
pub mod lpc;
pub mod merit;
pub mod pitch;
pub mod recovery;
pub mod state;
pub mod tables;

#[cfg(test)]
mod tests;

pub use extrapolate::ErasureStage;
pub use merit::Merit;
pub use recovery::Splice;
pub use state::PlcState;

use tracing::{debug, trace};

use crate::codecs::g722::codec::decode_subbands_with;
use crate::codecs::g722::qmf::qmf_synthesis;
use crate::codecs::g722::state::G722State;
use crate::error::{CodecError, Result};
use crate::types::{validate_frame_length, DecoderConfig, G722Mode};

use bridge::HighBandFilter;
use constants::{FRSZ, REPHASE_FRAMES};
use extrapolate::SYNTH_LEN;
use recovery::REFERENCE_LEN;

/// Process one frame of `frame_length` samples.
///
/// With `bad_frame` set the frame is concealed and `indices` is ignored.
/// Otherwise `indices` must hold one octet per sample pair. The frame is
/// processed in 160-sample sub-frames; the sample count is returned.
pub fn process_frame(
    plc: &mut PlcState,
    decoder: &mut G722State,
    config: &DecoderConfig,
    indices: Option<&[u8]>,
    frame_length: usize,
    bad_frame: bool,
    output: &mut [i16],
) -> Result<usize> {
    validate_frame_length(frame_length)?;
    if output.len() < frame_length {
        return Err(CodecError::BufferTooSmall {
            needed: frame_length,
            actual: output.len(),
        });
    }

    let output = &mut output[..frame_length];
    if bad_frame {
        for out in output.chunks_exact_mut(FRSZ) {
            conceal_subframe(plc, decoder, out);
        }
        return Ok(frame_length);
    }

    let codes = indices
        .ok_or_else(|| CodecError::invalid_payload("good frame without codewords"))?;
    if codes.len() != frame_length / 2 {
        return Err(CodecError::invalid_payload(format!(
            "expected {} codewords for {} samples, got {}",
            frame_length / 2,
            frame_length,
            codes.len()
        )));
    }
    for (out, codes) in output.chunks_exact_mut(FRSZ).zip(codes.chunks_exact(FRSZ / 2)) {
        decode_good_subframe(plc, decoder, config, codes, out);
    }
    Ok(frame_length)
}

/// Return both states to the start of a stream
pub fn reset(plc: &mut PlcState, decoder: &mut G722State) {
    plc.reset();
    decoder.reset();
}

fn decode_subframe(
    plc: &mut PlcState,
    decoder: &mut G722State,
    mode: G722Mode,
    codes: &[u8],
    out: &mut [i16; FRSZ],
) {
    let filter = HighBandFilter::after_loss(plc.erasure.frames_since_erasure);
    for (&code, pair) in codes.iter().zip(out.chunks_exact_mut(2)) {
        let mut stage = plc.bridge.dc.stage(filter);
        let (rl, rh) = decode_subbands_with(decoder, code, mode, &mut stage);
        plc.bridge.smooth(decoder);
        plc.bridge.observe_decoded(decoder);
        let (y0, y1) = qmf_synthesis(rl, rh, &mut decoder.qmf_rx_delay);
        pair[0] = y0;
        pair[1] = y1;
    }
}

fn decode_good_subframe(
    plc: &mut PlcState,
    decoder: &mut G722State,
    config: &DecoderConfig,
    codes: &[u8],
    out: &mut [i16],
) {
    let losses = plc.erasure.erasure_count;
    let mut frame = [0i16; FRSZ];
    if losses == 0 {
        decode_subframe(plc, decoder, config.mode, codes, &mut frame);
    } else {
        plc.bridge.prepare_recovery(decoder, losses);
        let rx_snapshot = decoder.qmf_rx_delay;
        let mut decoded = [0i16; FRSZ];
        decode_subframe(plc, decoder, config.mode, codes, &mut decoded);
        recover(plc, decoder, config, codes, &rx_snapshot, &mut decoded, &mut frame);
    }
    out.copy_from_slice(&frame);
    analyze_good(plc, &frame);
    plc.erasure.end_erasure();
}

fn recover(
    plc: &mut PlcState,
    decoder: &mut G722State,
    config: &DecoderConfig,
    codes: &[u8],
    rx_snapshot: &[i16; 24],
    decoded: &mut [i16; FRSZ],
    out: &mut [i16; FRSZ],
) {
    let losses = plc.erasure.erasure_count;
    let merit = plc.erasure.merit;
    let mut reference = [0i16; REFERENCE_LEN];
    recovery::reference_signal(&plc.history, plc.pitch.pp, plc.pitch.tap, &mut reference);

    let lag = if recovery::applicable(&config.plc, &merit, losses, &decoded[..]) {
        recovery::search_lag(decoded, &reference, plc.pitch.pp)
    } else {
        None
    };

    if let Some(k) = lag.filter(|&k| k != 0) {
        if config.plc.rephasing && losses <= REPHASE_FRAMES && plc.bridge.replay(decoder, k / 2) {
            plc.bridge.prepare_recovery(decoder, losses);
            decoder.qmf_rx_delay = *rx_snapshot;
            decode_subframe(plc, decoder, config.mode, codes, decoded);
        }
    }

    let splice = recovery::reconcile(decoded, &plc.erasure.tail, &reference, lag, &merit, out);
    debug!(
        "recovered after {} lost frames: merit={:.2} lag={:?} splice={:?}",
        losses, merit.value, lag, splice
    );
    plc.last_lag = lag;
    plc.last_splice = Some(splice);
    plc.bridge.checkpoint = None;
}

fn analyze_good(plc: &mut PlcState, frame: &[i16; FRSZ]) {
    plc.history.push_frame(frame);

    plc.prev_a = plc.a;
    let analysis = lpc::analyze(&plc.history, &plc.prev_a);
    plc.a = analysis.a;
    plc.aw = lpc::weighted_coefficients(&plc.a);

    let mut weighted = [0i16; FRSZ];
    plc.weighting
        .filter_newest(&plc.history, &plc.a, &plc.aw, &mut weighted);
    let estimate = plc.pitch.update(&plc.history, &weighted);
    trace!(
        "good frame: lpc stable={} pp={} tap={}",
        analysis.stable,
        estimate.period,
        estimate.tap
    );

    plc.bridge.observe_output(frame);
}

fn conceal_subframe(plc: &mut PlcState, decoder: &mut G722State, out: &mut [i16]) {
    let stage = plc.erasure.begin_frame();
    if stage == ErasureStage::FirstLoss {
        extrapolate::start_erasure(&mut plc.erasure, &plc.history, &plc.pitch, &plc.a);
        plc.bridge.begin_loss(decoder);
    }

    let mut synth = [0i16; SYNTH_LEN];
    let mut frame = [0i16; FRSZ];
    extrapolate::conceal(
        &mut plc.erasure,
        stage,
        &plc.history,
        &mut plc.pitch,
        &plc.a,
        &mut synth,
        &mut frame,
    );
    trace!("concealed frame: stage={:?} gain={}", stage, plc.erasure.gain);

    plc.history.push_frame(&synth[..FRSZ]);
    let mut weighted = [0i16; FRSZ];
    plc.weighting
        .filter_newest(&plc.history, &plc.a, &plc.aw, &mut weighted);
    plc.pitch.advance(&weighted);

    let losses = plc.erasure.erasure_count;
    plc.bridge.bridge_frame(decoder, &frame, &plc.erasure.tail, losses);
    out.copy_from_slice(&frame);
}
