//! Client-Engine: Broker-Anbindung, Agent-Transport und
//! Sitzungs-Lebenszyklus
//!
//! Die Engine verbindet drei Schichten: der [`broker`] legt Sitzungen
//! serverseitig an und laedt Abschluesse hoch, der [`transport`]
//! spricht das Frame-Protokoll mit dem Agenten, und die [`session`]
//! samt [`controller`] halten Audio-Pipeline und Lebenszyklus
//! zusammen.

pub mod broker;
pub mod controller;
pub mod session;
pub mod transport;

pub use broker::{
    AbschlussAntwort, BrokerSitzung, HttpBroker, SitzungsAuskunft, SitzungsBroker, StartAnfrage,
};
pub use controller::{
    EngineConfig, MikrofonZustand, SessionController, SitzungsGriff, SitzungsPhase,
};
pub use session::{SitzungsTeile, VoiceSession};
pub use transport::AgentTransport;
