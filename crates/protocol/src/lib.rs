//! # VoiceArena Protocol
//!
//! Wire-Protokoll zwischen Client und Sprach-Agent: JSON-Ereignisse mit
//! `event`-Tag, gerahmt als laengen-praefixierte Frames. Dazu das
//! Phasen-Modell der Verbindung.
//!
//! ## Module
//!
//! - [`events`] - Ereignis-Typen (start, ack, media_input, media_output, clear)
//! - [`wire`] - Frame-Codec fuer tokio-util `Framed`
//! - [`phase`] - Verbindungsphasen mit validierten Uebergaengen

pub mod events;
pub mod phase;
pub mod wire;

pub use events::{AgentBeschreibung, AgentEvent, StreamConfig, INPUT_FORMAT_PCM_44100};
pub use phase::{PhasenMaschine, TransportPhase, UngueltigerUebergang};
pub use wire::{AgentCodec, DEFAULT_MAX_FRAME_SIZE, LENGTH_FIELD_SIZE};
