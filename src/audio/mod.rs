// Audio module - beat sample sources, decoding and device playback

pub mod click;
#[cfg(feature = "desktop-audio")]
pub mod playback;
pub mod sample;

// Re-export commonly used types for convenience
pub use click::generate_click_sample;
#[cfg(feature = "desktop-audio")]
pub use playback::{PlayerCommand, SamplePlayer};
pub use sample::{decode_wav, SampleBuffer, SampleSource, DEFAULT_SAMPLE_RATE};
