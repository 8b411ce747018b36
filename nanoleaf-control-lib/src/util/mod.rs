pub mod auth;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod transport;
