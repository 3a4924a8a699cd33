//! Test signals and stream helpers

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::codecs::g722::{G722Encoder, G722PlcDecoder};
use crate::plc::constants::HIST_LEN;
use crate::plc::history::HistoryBuffer;

/// Sample `n` of a two-harmonic waveform with an integer period
pub fn periodic(n: usize, period: usize) -> i16 {
    let phase = (n % period) as f64 / period as f64 * 2.0 * std::f64::consts::PI;
    (phase.sin() * 5000.0 + (2.0 * phase).sin() * 1500.0) as i16
}

/// History filled with [`periodic`]
pub fn periodic_history(period: usize) -> HistoryBuffer {
    let frame: Vec<i16> = (0..HIST_LEN).map(|n| periodic(n, period)).collect();
    let mut history = HistoryBuffer::new();
    history.push_frame(&frame);
    history
}

/// Uniform noise in `[-amplitude, amplitude]`
pub fn noise(len: usize, amplitude: i16, seed: u64) -> Vec<i16> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-amplitude..=amplitude)).collect()
}

/// Voiced test signal at 16 kHz with a slowly varying level
pub fn voiced_pcm(len: usize, period: usize) -> Vec<i16> {
    (0..len)
        .map(|n| {
            let level = 0.8 + 0.2 * (n as f64 / 4000.0).sin();
            (periodic(n, period) as f64 * level) as i16
        })
        .collect()
}

/// Two-harmonic voiced signal whose period glides linearly from `from` to
/// `to` samples over `len` samples
pub fn gliding_pcm(len: usize, from: f64, to: f64) -> Vec<i16> {
    let mut phase = 0.0f64;
    (0..len)
        .map(|n| {
            let period = from + (to - from) * n as f64 / len as f64;
            phase += 2.0 * std::f64::consts::PI / period;
            (phase.sin() * 4000.0 + (2.0 * phase).sin() * 1200.0) as i16
        })
        .collect()
}

/// Encode a signal into G.722 octets
pub fn encode(pcm: &[i16]) -> Vec<u8> {
    let mut encoder = G722Encoder::new();
    encoder.encode(pcm).expect("even-length input")
}

/// Run `codes` through `decoder` in frames of `frame_length` samples;
/// `lost[i]` marks frame `i` as erased
pub fn run_stream(
    decoder: &mut G722PlcDecoder,
    codes: &[u8],
    frame_length: usize,
    lost: &[bool],
) -> Vec<i16> {
    let mut output = vec![0i16; codes.len() * 2];
    let frames = codes
        .chunks_exact(frame_length / 2)
        .zip(output.chunks_exact_mut(frame_length));
    for (i, (frame_codes, out)) in frames.enumerate() {
        let bad = lost.get(i).copied().unwrap_or(false);
        let written = decoder
            .process_frame(Some(frame_codes), frame_length, bad, out)
            .expect("valid frame");
        assert_eq!(written, frame_length);
    }
    output
}
