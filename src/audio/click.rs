//! Click - synthesized fallback beat sample
//!
//! When no WAV asset is configured the metronome plays a short burst of
//! white noise. The burst is generated from a fixed seed so every run (and
//! every test) hears exactly the same click.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Duration of metronome click in milliseconds
pub const CLICK_DURATION_MS: f32 = 20.0;

/// Fraction of the click over which the amplitude decays to silence
const DECAY_FRACTION: f32 = 0.75;

/// Generates a metronome click sample (20ms white noise burst).
///
/// The tail of the burst is faded out linearly so the click ends without a
/// pop when the output stream returns to silence.
///
/// # Arguments
/// * `sample_rate` - Sample rate in Hz (typically 48000)
///
/// # Returns
/// A `Vec<f32>` containing exactly 20ms worth of samples in range [-1.0, 1.0]
///
/// # Examples
/// ```
/// use plectrum_metronome::audio::click::generate_click_sample;
///
/// let sample_rate = 48000;
/// let click = generate_click_sample(sample_rate);
/// assert_eq!(click.len(), 960);
/// ```
pub fn generate_click_sample(sample_rate: u32) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * CLICK_DURATION_MS / 1000.0) as usize;
    let fade_start = ((num_samples as f32) * (1.0 - DECAY_FRACTION)) as usize;
    let fade_len = num_samples.saturating_sub(fade_start).max(1) as f32;

    let mut rng = StdRng::seed_from_u64(42);

    (0..num_samples)
        .map(|i| {
            let noise: f32 = rng.gen_range(-1.0..1.0);
            if i < fade_start {
                noise
            } else {
                noise * (1.0 - (i - fade_start) as f32 / fade_len)
            }
        })
        .collect()
}
