//! Fehlertypen fuer den Audio-Pfad

use thiserror::Error;

/// Alle moeglichen Fehler des Audio-Pfads
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio-Geraet nicht gefunden: {0}")]
    GeraetNichtGefunden(String),

    #[error("Kein Standard-Eingabegeraet verfuegbar")]
    KeinStandardEingabegeraet,

    #[error("Kein Standard-Ausgabegeraet verfuegbar")]
    KeinStandardAusgabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Ungueltige Frame-Laenge: {0} Bytes ist kein Vielfaches der Sample-Breite")]
    UngueltigeFrameLaenge(usize),

    #[error("Audio-Thread antwortet nicht")]
    ThreadAntwortetNicht,

    #[error("WAV-Fehler: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unerwarteter Fehler: {0}")]
    Anyhow(#[from] anyhow::Error),
}

pub type AudioResult<T> = Result<T, AudioError>;
