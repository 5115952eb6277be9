//! REST-Handler der Broker-API

pub mod health;
pub mod sitzungen;
