//! Usage: Authentication flows (grant descriptors, session handling, pin code polling).

pub mod authenticator;
pub mod code_grant;
pub mod grants;
pub mod pin_code;
pub mod scope;
pub mod session;
pub(crate) mod token_exchange;
