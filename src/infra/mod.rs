//! Usage: Infrastructure adapters (settings file + environment, tracing setup).

pub mod logging;
pub mod settings;
