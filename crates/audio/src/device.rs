//! Audio-Geraete-Auswahl
//!
//! Waehlt das Ein- und Ausgabegeraet fuer eine Sitzung aus. Ohne
//! expliziten Namen wird das Systemstandard-Geraet verwendet.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use tracing::debug;

use crate::error::{AudioError, AudioResult};

/// Waehlt das Eingabegeraet (Mikrofon)
///
/// `name = None` liefert das Standardgeraet, sonst das erste Geraet
/// dessen Name den gegebenen Teilstring enthaelt.
pub fn eingabegeraet_waehlen(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_input_device()
            .ok_or(AudioError::KeinStandardEingabegeraet),
        Some(n) => {
            let devices = host
                .input_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
            for device in devices {
                if let Ok(dev_name) = device.name() {
                    if dev_name.contains(n) {
                        debug!(geraet = %dev_name, "Eingabegeraet gewaehlt");
                        return Ok(device);
                    }
                }
            }
            Err(AudioError::GeraetNichtGefunden(n.to_string()))
        }
    }
}

/// Waehlt das Ausgabegeraet (Lautsprecher)
pub fn ausgabegeraet_waehlen(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();
    match name {
        None => host
            .default_output_device()
            .ok_or(AudioError::KeinStandardAusgabegeraet),
        Some(n) => {
            let devices = host
                .output_devices()
                .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
            for device in devices {
                if let Ok(dev_name) = device.name() {
                    if dev_name.contains(n) {
                        debug!(geraet = %dev_name, "Ausgabegeraet gewaehlt");
                        return Ok(device);
                    }
                }
            }
            Err(AudioError::GeraetNichtGefunden(n.to_string()))
        }
    }
}

/// Listet die Namen aller Ein- und Ausgabegeraete auf
///
/// Fuer die Geraeteauswahl in der Kommandozeile. Geraete deren Name
/// nicht lesbar ist werden uebersprungen.
pub fn geraete_auflisten() -> AudioResult<(Vec<String>, Vec<String>)> {
    let host = cpal::default_host();

    let eingaben = host
        .input_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .filter_map(|d| d.name().ok())
        .collect();

    let ausgaben = host
        .output_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .filter_map(|d| d.name().ok())
        .collect();

    Ok((eingaben, ausgaben))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn standardgeraete_waehlbar() {
        let eingabe = eingabegeraet_waehlen(None);
        let ausgabe = ausgabegeraet_waehlen(None);
        assert!(eingabe.is_ok() || ausgabe.is_ok());
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn geraeteliste_abrufbar() {
        let (eingaben, ausgaben) = geraete_auflisten().expect("Liste sollte abrufbar sein");
        println!("Eingabegeraete: {eingaben:?}");
        println!("Ausgabegeraete: {ausgaben:?}");
    }

    #[test]
    fn unbekannter_name_ist_fehler() {
        let result = eingabegeraet_waehlen(Some("definitiv-kein-geraet-xyz"));
        assert!(matches!(
            result,
            Err(AudioError::GeraetNichtGefunden(_)) | Err(AudioError::StreamFehler(_))
        ));
    }
}
