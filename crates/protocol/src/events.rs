//! Ereignisse des Agenten-Protokolls
//!
//! Beide Seiten schieben Ereignisse unabhaengig voneinander ueber die
//! persistente Verbindung – es gibt kein Request/Response-Pairing.
//!
//! ## Design
//! - Tagged Enum mit Diskriminanten-Feld `event` (snake_case)
//! - Media-Payloads als Base64-String im JSON (rohe PCM16-LE-Bytes)
//! - Unbekannte Tags landen im Catch-All `Unbekannt` und werden vom
//!   Empfaenger verworfen statt die Sitzung zu beenden
//!   (Vorwaertskompatibilitaet mit neuen Ereignisarten)

use serde::{Deserialize, Serialize};

/// Eingabeformat das der Client im Start-Ereignis ankuendigt
pub const INPUT_FORMAT_PCM_44100: &str = "pcm_44100";

// ---------------------------------------------------------------------------
// Start-Deskriptor
// ---------------------------------------------------------------------------

/// Stream-Konfiguration im Start-Ereignis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Format der Media-Payloads, z.B. "pcm_44100"
    pub input_format: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            input_format: INPUT_FORMAT_PCM_44100.into(),
        }
    }
}

/// Beschreibung des Agenten fuer die Sitzung
///
/// `system_prompt` ist der Persona-Text – er wird upstream erzeugt und
/// hier unveraendert durchgereicht.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBeschreibung {
    pub system_prompt: String,
    /// Einleitungssatz des Agenten (leer = Agent wartet auf den Anrufer)
    #[serde(default)]
    pub introduction: String,
}

// ---------------------------------------------------------------------------
// AgentEvent
// ---------------------------------------------------------------------------

/// Alle Ereignisse die ueber die Agenten-Verbindung fliessen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Client eroeffnet den Stream (Idle -> Opening)
    Start {
        /// Vom Client vorgeschlagene Stream-ID
        stream_id: String,
        config: StreamConfig,
        agent: AgentBeschreibung,
        /// Freie Sitzungs-Metadaten, werden unveraendert mitgefuehrt
        #[serde(default)]
        metadata: serde_json::Value,
    },

    /// Server bestaetigt mit der kanonischen Stream-ID (Opening -> Open)
    ///
    /// Die kanonische ID darf von der vorgeschlagenen abweichen und
    /// gewinnt in dem Fall.
    Ack { stream_id: String },

    /// Audio vom Client zum Agenten (Mikrofon)
    MediaInput {
        #[serde(with = "base64_payload")]
        payload: Vec<u8>,
    },

    /// Audio vom Agenten zum Client (Sprachausgabe)
    MediaOutput {
        #[serde(with = "base64_payload")]
        payload: Vec<u8>,
    },

    /// Agent unterbricht: alle noch nicht abgespielten Puffer sofort
    /// verwerfen. Schliesst die Sitzung nicht.
    Clear,

    /// Unbekanntes Ereignis-Tag – wird verworfen, nie fatal
    #[serde(other)]
    Unbekannt,
}

impl AgentEvent {
    /// Erstellt ein Start-Ereignis mit Standard-Streamkonfiguration
    pub fn start(
        stream_id: impl Into<String>,
        system_prompt: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self::Start {
            stream_id: stream_id.into(),
            config: StreamConfig::default(),
            agent: AgentBeschreibung {
                system_prompt: system_prompt.into(),
                introduction: String::new(),
            },
            metadata,
        }
    }

    /// Erstellt ein Ack-Ereignis
    pub fn ack(stream_id: impl Into<String>) -> Self {
        Self::Ack {
            stream_id: stream_id.into(),
        }
    }

    /// Erstellt ein Media-Input-Ereignis aus rohen Wire-Bytes
    pub fn media_input(payload: Vec<u8>) -> Self {
        Self::MediaInput { payload }
    }

    /// Erstellt ein Media-Output-Ereignis aus rohen Wire-Bytes
    pub fn media_output(payload: Vec<u8>) -> Self {
        Self::MediaOutput { payload }
    }

    /// Serialisiert das Ereignis als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert ein Ereignis aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Base64-Kodierung der Media-Payloads
// ---------------------------------------------------------------------------

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_ereignis_json_form() {
        let e = AgentEvent::start(
            "stream-1",
            "Du bist Chloe Dubois, Einkaufsleiterin.",
            serde_json::json!({"language_code": "fr-FR"}),
        );
        let json = e.to_json().unwrap();
        assert!(json.contains("\"event\":\"start\""));
        assert!(json.contains("\"input_format\":\"pcm_44100\""));
        assert!(json.contains("\"introduction\":\"\""));
    }

    #[test]
    fn media_payload_rundreise() {
        let bytes = vec![0u8, 1, 2, 254, 255];
        let e = AgentEvent::media_input(bytes.clone());
        let json = e.to_json().unwrap();
        assert!(json.contains("\"event\":\"media_input\""));

        match AgentEvent::from_json(&json).unwrap() {
            AgentEvent::MediaInput { payload } => assert_eq!(payload, bytes),
            other => panic!("Unerwartetes Ereignis: {other:?}"),
        }
    }

    #[test]
    fn clear_ereignis_minimal() {
        let json = AgentEvent::Clear.to_json().unwrap();
        assert_eq!(json, "{\"event\":\"clear\"}");
        assert!(matches!(
            AgentEvent::from_json(&json).unwrap(),
            AgentEvent::Clear
        ));
    }

    #[test]
    fn unbekanntes_tag_wird_toleriert() {
        // Neue Ereignisarten der Gegenseite duerfen nie fatal sein
        let json = "{\"event\":\"dtmf\",\"digit\":\"4\"}";
        assert!(matches!(
            AgentEvent::from_json(json).unwrap(),
            AgentEvent::Unbekannt
        ));
    }

    #[test]
    fn ack_uebernimmt_kanonische_id() {
        let json = "{\"event\":\"ack\",\"stream_id\":\"srv-7\"}";
        match AgentEvent::from_json(json).unwrap() {
            AgentEvent::Ack { stream_id } => assert_eq!(stream_id, "srv-7"),
            other => panic!("Unerwartetes Ereignis: {other:?}"),
        }
    }

    #[test]
    fn metadata_ist_optional() {
        let json = "{\"event\":\"start\",\"stream_id\":\"s\",\
                    \"config\":{\"input_format\":\"pcm_44100\"},\
                    \"agent\":{\"system_prompt\":\"p\"}}";
        match AgentEvent::from_json(json).unwrap() {
            AgentEvent::Start {
                metadata, agent, ..
            } => {
                assert!(metadata.is_null());
                assert_eq!(agent.introduction, "");
            }
            other => panic!("Unerwartetes Ereignis: {other:?}"),
        }
    }
}
