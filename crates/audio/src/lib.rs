//! # VoiceArena Audio
//!
//! Der komplette Audio-Pfad einer Sitzung: Mikrofon-Capture mit
//! Frame-Schnitt, lueckenloser Playback-Scheduler fuer Agent-Audio,
//! Aufnahme-Mixdown beider Seiten und der PCM16-Codec fuer den
//! Transport.
//!
//! ## Architektur
//!
//! ```text
//! Mikrofon --> [capture] --> Ring-Buffer --> [runtime] --> Sende-Pfad
//!                                               |
//!                                               v
//! Agent-Frames --> [scheduler] --> [playback] --> Lautsprecher
//!                        |             |
//!                        +-----> [mixer] --> versiegelte Aufnahme
//! ```
//!
//! Scheduler und Mixer sind der einzige geteilte Zustand; beide
//! liegen hinter `parking_lot::Mutex` (Lock-Reihenfolge: Scheduler
//! vor Mixer).

pub mod capture;
pub mod codec;
pub mod device;
pub mod error;
pub mod mixer;
pub mod playback;
pub mod runtime;
pub mod scheduler;

pub use capture::{open_capture_stream, CaptureConfig, CaptureConsumer, CaptureStream, FrameSchneider};
pub use codec::{
    decode_pcm16, encode_pcm16, BYTES_PER_SAMPLE, CHANNELS, FRAME_BYTES, FRAME_SAMPLES,
    SAMPLE_RATE,
};
pub use error::{AudioError, AudioResult};
pub use mixer::{RecordingMixer, VersiegelteAufnahme};
pub use playback::{open_playback_stream, PlaybackConfig, PlaybackStream};
pub use runtime::{AudioRuntime, AudioRuntimeConfig};
pub use scheduler::{PlaybackScheduler, SchedulerStatistik};
