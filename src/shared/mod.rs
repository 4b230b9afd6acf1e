//! Usage: Cross-cutting helpers (error model, lock recovery, credential hygiene, time, blocking IO).

pub(crate) mod blocking;
pub mod error;
pub(crate) mod mutex_ext;
pub(crate) mod security;
pub(crate) mod time;
