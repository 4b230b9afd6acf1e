//! Usage: Request/response pipeline (descriptors, cache, transport, dispatch, error taxonomy).

pub mod cache;
pub mod decoder;
pub mod dispatcher;
pub mod error_code;
pub mod errors;
pub mod fingerprint;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
