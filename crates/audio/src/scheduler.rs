//! Lueckenloser Playback-Scheduler
//!
//! Plant eingehende Agent-Frames fuer die Ausgabe ein. Der Scheduler
//! fuehrt zwei Zeitmarken in Samples:
//! - **abgespielt**: die Ausgabe-Uhr, vorangetrieben durch `render()`
//! - **cursor**: der naechste freie Startzeitpunkt
//!
//! Jeder Frame startet bei `max(cursor, abgespielt)` und rueckt den
//! Cursor um seine Laenge vor. Ein Schwall nachgelieferter Frames wird
//! dadurch Ruecken an Ruecken eingeplant statt gestaucht. Faellt der
//! Cursor hinter die Uhr (Unterlauf), springt er auf die Uhr und die
//! Wiedergabe setzt lueckenlos neu auf. `leeren()` verwirft alles
//! Ungespielte und setzt den Cursor ebenfalls auf die Uhr; das ist der
//! einzige Pfad der geplante Ausgabe verwerfen darf.
//!
//! Der Scheduler ist nicht thread-safe; der Besitzer synchronisiert
//! (Ausgabe-Callback und Empfangspfad teilen ihn per Mutex).

use std::collections::VecDeque;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Statistiken
// ---------------------------------------------------------------------------

/// Statistiken des Schedulers (Snapshot)
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatistik {
    /// Anzahl eingeplanter Frames gesamt
    pub eingeplant: u64,
    /// Anzahl vollstaendig abgespielter Frames
    pub abgespielt: u64,
    /// Anzahl durch `leeren()` verworfener Frames
    pub verworfen: u64,
    /// Anzahl Unterlaeufe (Cursor hinter der Ausgabe-Uhr)
    pub unterlaeufe: u64,
    /// Aktuell wartende Samples
    pub fuellstand: usize,
}

// ---------------------------------------------------------------------------
// PlaybackScheduler
// ---------------------------------------------------------------------------

/// Ein eingeplanter, noch nicht fertig abgespielter Frame
#[derive(Debug)]
struct GeplanterFrame {
    /// Startzeitpunkt in Samples seit Sitzungsbeginn
    start: u64,
    samples: Vec<f32>,
    /// Bereits gerenderte Samples dieses Frames
    offset: usize,
}

/// Lueckenloser Playback-Scheduler
#[derive(Debug)]
pub struct PlaybackScheduler {
    /// Ausgabe-Uhr in Samples, vorangetrieben durch `render()`
    abgespielt: u64,
    /// Naechster freier Startzeitpunkt in Samples
    cursor: u64,
    warteschlange: VecDeque<GeplanterFrame>,
    statistik: SchedulerStatistik,
    /// Unterscheidet den ersten Frame von einem echten Unterlauf
    jemals_eingeplant: bool,
}

impl PlaybackScheduler {
    /// Erstellt einen neuen Scheduler mit Uhr und Cursor bei 0
    pub fn neu() -> Self {
        Self {
            abgespielt: 0,
            cursor: 0,
            warteschlange: VecDeque::new(),
            statistik: SchedulerStatistik::default(),
            jemals_eingeplant: false,
        }
    }

    /// Plant einen Frame ein und gibt seinen Startzeitpunkt zurueck
    ///
    /// Startzeitpunkt ist `max(cursor, abgespielt)`. Faellt der Cursor
    /// hinter die Uhr, wird das als Unterlauf gezaehlt und der Cursor
    /// auf die Uhr gesetzt.
    pub fn einplanen(&mut self, samples: Vec<f32>) -> u64 {
        if self.cursor < self.abgespielt {
            if self.jemals_eingeplant {
                self.statistik.unterlaeufe += 1;
                debug!(
                    cursor = self.cursor,
                    uhr = self.abgespielt,
                    "Unterlauf: Cursor auf Ausgabe-Uhr gesetzt"
                );
            }
            self.cursor = self.abgespielt;
        }

        let start = self.cursor;
        self.cursor = start + samples.len() as u64;
        self.jemals_eingeplant = true;

        self.statistik.eingeplant += 1;
        self.statistik.fuellstand += samples.len();
        trace!(start, laenge = samples.len(), "Frame eingeplant");

        self.warteschlange.push_back(GeplanterFrame {
            start,
            samples,
            offset: 0,
        });

        start
    }

    /// Rendert das naechste Ausgabefenster und rueckt die Uhr vor
    ///
    /// Fuellt `ziel` mit den faelligen Samples (Stille wo nichts
    /// eingeplant ist) und gibt die Uhr-Position des ersten Samples
    /// zurueck. Der Aufrufer verwendet diese Position um das Fenster
    /// in den Aufnahme-Mixdown zu spiegeln.
    pub fn render(&mut self, ziel: &mut [f32]) -> u64 {
        ziel.fill(0.0);
        let fenster_start = self.abgespielt;
        let fenster_ende = fenster_start + ziel.len() as u64;

        while let Some(front) = self.warteschlange.front_mut() {
            let position = front.start + front.offset as u64;
            if position >= fenster_ende {
                break;
            }

            let ziel_idx = (position - fenster_start) as usize;
            let kopierbar = (ziel.len() - ziel_idx).min(front.samples.len() - front.offset);
            ziel[ziel_idx..ziel_idx + kopierbar]
                .copy_from_slice(&front.samples[front.offset..front.offset + kopierbar]);

            front.offset += kopierbar;
            self.statistik.fuellstand -= kopierbar;

            if front.offset == front.samples.len() {
                self.warteschlange.pop_front();
                self.statistik.abgespielt += 1;
            } else {
                // Fenster voll, Rest des Frames kommt im naechsten Aufruf
                break;
            }
        }

        self.abgespielt = fenster_ende;
        fenster_start
    }

    /// Verwirft alle ungespielten Frames und setzt den Cursor auf die Uhr
    ///
    /// Wird beim Clear-Signal des Agenten aufgerufen (Barge-in). Gibt
    /// die Anzahl verworfener Frames zurueck.
    pub fn leeren(&mut self) -> usize {
        let anzahl = self.warteschlange.len();
        self.warteschlange.clear();
        self.cursor = self.abgespielt;
        self.statistik.verworfen += anzahl as u64;
        self.statistik.fuellstand = 0;
        if anzahl > 0 {
            debug!(verworfen = anzahl, "Wiedergabe-Warteschlange geleert");
        }
        anzahl
    }

    /// Aktuelle Ausgabe-Uhr in Samples
    pub fn uhr(&self) -> u64 {
        self.abgespielt
    }

    /// Naechster freier Startzeitpunkt in Samples
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Aktuell wartende Samples
    pub fn fuellstand(&self) -> usize {
        self.statistik.fuellstand
    }

    /// Gibt eine Referenz auf die aktuellen Statistiken
    pub fn statistik(&self) -> &SchedulerStatistik {
        &self.statistik
    }
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
