//! Wire-Format der Agenten-Verbindung
//!
//! Frame-basiertes Protokoll: Laenge (u32 big-endian) + JSON-Payload.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | JSON       |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge zaehlt nur die Payload-Bytes. Ein Media-Frame (4096 Samples
//! PCM16 als Base64) liegt bei rund 11 KB; das Start-Ereignis kann durch
//! den Persona-Text deutlich groesser werden. Das Maximum ist deshalb
//! grosszuegig, aber hart begrenzt.

use bytes::{Buf, BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::events::AgentEvent;

/// Standard-maximale Frame-Groesse (256 KB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 256 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

/// tokio-util Codec fuer die Agenten-Verbindung
///
/// Implementiert `Encoder<AgentEvent>` und `Decoder` fuer die Verwendung
/// mit `tokio_util::codec::Framed`.
#[derive(Debug, Clone)]
pub struct AgentCodec {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
}

impl AgentCodec {
    /// Erstellt einen neuen Codec mit Standard-Limit
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen Codec mit eigenem Frame-Limit
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn laenge_pruefen(&self, laenge: usize, richtung: &str) -> io::Result<()> {
        if laenge > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "{richtung}-Frame zu gross: {laenge} Bytes (Maximum: {} Bytes)",
                    self.max_frame_size
                ),
            ));
        }
        Ok(())
    }
}

impl Default for AgentCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AgentCodec {
    type Item = AgentEvent;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_FIELD_SIZE {
            return Ok(None);
        }

        // Laenge lesen ohne den Buffer zu veraendern
        let laenge = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;
        self.laenge_pruefen(laenge, "Empfangener")?;

        let gesamt = LENGTH_FIELD_SIZE + laenge;
        if src.len() < gesamt {
            // Speicher vorbelegen um Reallocations zu vermeiden
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_FIELD_SIZE);
        let payload = src.split_to(laenge);

        let ereignis: AgentEvent = serde_json::from_slice(&payload).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Deserialisierung fehlgeschlagen: {e}"),
            )
        })?;

        Ok(Some(ereignis))
    }
}

impl Encoder<AgentEvent> for AgentCodec {
    type Error = io::Error;

    fn encode(&mut self, item: AgentEvent, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {e}"),
            )
        })?;

        self.laenge_pruefen(json.len(), "Gesendeter")?;

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}
