//! Voice processing module
//!
//! Azure speech gateways (STT and TTS), WAV capture inspection and
//! terminal playback of synthesized replies.

mod playback;
mod stt;
mod tts;
mod wav;

pub use playback::{AudioPlayback, ScopedAudioFile};
pub use stt::AzureSpeechToText;
pub use tts::{AzureTextToSpeech, OUTPUT_MIME};
pub use wav::{SAMPLE_RATE, WavInfo, inspect_wav, samples_to_wav};
