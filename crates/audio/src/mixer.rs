//! Aufnahme-Mixdown der Sitzung
//!
//! Fuehrt Mikrofon und Agent-Wiedergabe auf einer gemeinsamen
//! Zeitachse zusammen. Das Mikrofon schreibt fortlaufend an seinem
//! eigenen Cursor, die Wiedergabe an der Uhr-Position des Ausgabe-
//! Fensters. Dadurch landet im Mixdown genau das, was tatsaechlich
//! hoerbar war: per Clear verworfene Frames tauchen nie auf.
//!
//! Der Mixdown pausiert nie. Stummschalten des Mikrofons gatet nur
//! das Senden, die Frames fliessen weiter in den Mixer; faellt eine
//! Quelle ganz aus, fuellt `versiegeln()` bis zur Wanduhr-Dauer mit
//! Stille auf. Versiegelt wird genau einmal.

use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use crate::codec::sample_zu_i16;
use crate::error::AudioResult;

/// Mischt ein Sample additiv in die Zeitachse (mit Klemmen)
#[inline]
fn mischen(ziel: &mut f32, quelle: f32) {
    *ziel = (*ziel + quelle).clamp(-1.0, 1.0);
}

/// Aufnahme-Mixer einer Sitzung
#[derive(Debug)]
pub struct RecordingMixer {
    /// Gemischte Zeitachse, mono bei `sample_rate`
    zeitachse: Vec<f32>,
    /// Naechste Schreibposition des Mikrofons
    mic_cursor: usize,
    sample_rate: u32,
    versiegelt: bool,
}

impl RecordingMixer {
    /// Erstellt einen leeren Mixer
    pub fn neu(sample_rate: u32) -> Self {
        Self {
            zeitachse: Vec::new(),
            mic_cursor: 0,
            sample_rate,
            versiegelt: false,
        }
    }

    /// Schreibt Mikrofon-Samples am laufenden Mikrofon-Cursor
    pub fn mic_schreiben(&mut self, samples: &[f32]) {
        if self.versiegelt {
            warn!("Mixer bereits versiegelt, Mikrofon-Frame verworfen");
            return;
        }
        let ende = self.mic_cursor + samples.len();
        if self.zeitachse.len() < ende {
            self.zeitachse.resize(ende, 0.0);
        }
        for (ziel, &quelle) in self.zeitachse[self.mic_cursor..ende].iter_mut().zip(samples) {
            mischen(ziel, quelle);
        }
        self.mic_cursor = ende;
    }

    /// Mischt ein Wiedergabe-Fenster an seiner Uhr-Position ein
    ///
    /// `position` ist die Ausgabe-Uhr des ersten Samples, wie von
    /// `PlaybackScheduler::render()` geliefert.
    pub fn wiedergabe_schreiben_bei(&mut self, position: u64, samples: &[f32]) {
        if self.versiegelt {
            return;
        }
        let start = position as usize;
        let ende = start + samples.len();
        if self.zeitachse.len() < ende {
            self.zeitachse.resize(ende, 0.0);
        }
        for (ziel, &quelle) in self.zeitachse[start..ende].iter_mut().zip(samples) {
            mischen(ziel, quelle);
        }
    }

    /// Bisher belegte Zeitachse in Samples
    pub fn laenge(&self) -> usize {
        self.zeitachse.len()
    }

    /// Ob der Mixer bereits versiegelt wurde
    pub fn ist_versiegelt(&self) -> bool {
        self.versiegelt
    }

    /// Versiegelt den Mixdown genau einmal
    ///
    /// Fuellt die Zeitachse bis `mindest_dauer` (die Wanduhr-Dauer der
    /// Sitzung) mit Stille auf. Der zweite Aufruf gibt `None` zurueck.
    pub fn versiegeln(&mut self, mindest_dauer: Duration) -> Option<VersiegelteAufnahme> {
        if self.versiegelt {
            return None;
        }
        self.versiegelt = true;

        let mindest_samples = (mindest_dauer.as_secs_f64() * self.sample_rate as f64) as usize;
        if self.zeitachse.len() < mindest_samples {
            self.zeitachse.resize(mindest_samples, 0.0);
        }

        debug!(
            samples = self.zeitachse.len(),
            sekunden = self.zeitachse.len() as f64 / self.sample_rate as f64,
            "Aufnahme versiegelt"
        );

        Some(VersiegelteAufnahme {
            samples: std::mem::take(&mut self.zeitachse),
            sample_rate: self.sample_rate,
        })
    }
}

// ---------------------------------------------------------------------------
// VersiegelteAufnahme
// ---------------------------------------------------------------------------

/// Fertige, unveraenderliche Sitzungsaufnahme
#[derive(Debug, Clone)]
pub struct VersiegelteAufnahme {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl VersiegelteAufnahme {
    /// Die gemischten Samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Abtastrate der Aufnahme
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Dauer der Aufnahme
    pub fn dauer(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Serialisiert die Aufnahme als WAV (PCM16 mono)
    pub fn wav_bytes(&self) -> AudioResult<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample(sample_zu_i16(sample))?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Schreibt die Aufnahme als WAV-Datei
    pub fn speichern(&self, pfad: &Path) -> AudioResult<()> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(pfad, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample_zu_i16(sample))?;
        }
        writer.finalize()?;
        debug!(pfad = %pfad.display(), "Aufnahme gespeichert");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    #[test]
    fn mikrofon_schreibt_fortlaufend() {
        let mut mixer = RecordingMixer::neu(RATE);
        mixer.mic_schreiben(&[0.1; 100]);
        mixer.mic_schreiben(&[0.2; 50]);

        assert_eq!(mixer.laenge(), 150);
        let aufnahme = mixer.versiegeln(Duration::ZERO).unwrap();
        assert!(aufnahme.samples()[..100].iter().all(|&x| x == 0.1));
        assert!(aufnahme.samples()[100..].iter().all(|&x| x == 0.2));
    }

    #[test]
    fn quellen_mischen_additiv_mit_klemmen() {
        let mut mixer = RecordingMixer::neu(RATE);
        mixer.mic_schreiben(&[0.4; 100]);
        mixer.wiedergabe_schreiben_bei(0, &[0.4; 100]);
        mixer.wiedergabe_schreiben_bei(50, &[0.8; 100]);

        let aufnahme = mixer.versiegeln(Duration::ZERO).unwrap();
        let s = aufnahme.samples();
        assert_eq!(s.len(), 150);
        assert!((s[0] - 0.8).abs() < 1e-6);
        // 0.4 + 0.4 + 0.8 klemmt bei 1.0
        assert!((s[60] - 1.0).abs() < 1e-6);
        assert!((s[120] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn wiedergabe_unabhaengig_vom_mikrofon_cursor() {
        let mut mixer = RecordingMixer::neu(RATE);
        // Wiedergabe weit vorn, Mikrofon noch bei 0
        mixer.wiedergabe_schreiben_bei(1000, &[0.5; 100]);
        mixer.mic_schreiben(&[0.25; 10]);

        assert_eq!(mixer.laenge(), 1100);
        let aufnahme = mixer.versiegeln(Duration::ZERO).unwrap();
        assert!((aufnahme.samples()[5] - 0.25).abs() < 1e-6);
        assert_eq!(aufnahme.samples()[500], 0.0);
        assert!((aufnahme.samples()[1050] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn versiegeln_genau_einmal() {
        let mut mixer = RecordingMixer::neu(RATE);
        mixer.mic_schreiben(&[0.1; 10]);

        assert!(mixer.versiegeln(Duration::ZERO).is_some());
        assert!(mixer.ist_versiegelt());
        assert!(mixer.versiegeln(Duration::ZERO).is_none());

        // Nach dem Versiegeln werden Schreibzugriffe verworfen
        mixer.mic_schreiben(&[0.9; 10]);
        mixer.wiedergabe_schreiben_bei(0, &[0.9; 10]);
        assert!(mixer.versiegeln(Duration::ZERO).is_none());
    }

    #[test]
    fn dauer_folgt_wanduhr() {
        let mut mixer = RecordingMixer::neu(RATE);
        // Nur 1 Sekunde Audio, aber 3 Sekunden Sitzung
        mixer.mic_schreiben(&vec![0.1; RATE as usize]);

        let aufnahme = mixer.versiegeln(Duration::from_secs(3)).unwrap();
        assert_eq!(aufnahme.samples().len(), 3 * RATE as usize);
        assert!((aufnahme.dauer().as_secs_f64() - 3.0).abs() < 1e-9);
        // Aufgefuellter Teil ist Stille
        assert!(aufnahme.samples()[2 * RATE as usize..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn laengere_aufnahme_wird_nicht_gekuerzt() {
        let mut mixer = RecordingMixer::neu(RATE);
        mixer.mic_schreiben(&vec![0.1; 2 * RATE as usize]);

        let aufnahme = mixer.versiegeln(Duration::from_secs(1)).unwrap();
        assert_eq!(aufnahme.samples().len(), 2 * RATE as usize);
    }

    #[test]
    fn wav_bytes_sind_lesbar() {
        let mut mixer = RecordingMixer::neu(RATE);
        mixer.mic_schreiben(&[0.5; 441]);

        let aufnahme = mixer.versiegeln(Duration::ZERO).unwrap();
        let bytes = aufnahme.wav_bytes().unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, RATE);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 441);
    }
}
