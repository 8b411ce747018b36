use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use log::Level;

use crate::util::error::NanoleafError;
use crate::util::transport::Method;

/// A status event meant for the human operating the lights.
///
/// Discovery, pairing and the device client report every failure here exactly
/// once before collapsing it into an absent result.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    DiscoveryStarted {
        seek: Duration,
    },
    DeviceDiscovered {
        address: String,
    },
    /// The discovery socket failed; the run stopped early.
    DiscoveryFailed {
        reason: String,
    },
    DiscoveryFinished {
        found: usize,
    },
    Paired {
        address: String,
    },
    PairingFailed {
        address: String,
        error: NanoleafError,
    },
    RequestFailed {
        address: String,
        method: Method,
        path: String,
        error: NanoleafError,
    },
    NoAlternativeEffect {
        address: String,
        active: Option<String>,
    },
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::DiscoveryStarted { .. }
            | Diagnostic::DeviceDiscovered { .. }
            | Diagnostic::Paired { .. } => Level::Info,
            Diagnostic::DiscoveryFinished { found } => {
                if *found == 0 {
                    Level::Warn
                } else {
                    Level::Info
                }
            }
            Diagnostic::NoAlternativeEffect { .. } => Level::Warn,
            Diagnostic::DiscoveryFailed { .. }
            | Diagnostic::PairingFailed { .. }
            | Diagnostic::RequestFailed { .. } => Level::Error,
        }
    }

    /// The error carried by this diagnostic, if it reports one.
    pub fn error(&self) -> Option<&NanoleafError> {
        match self {
            Diagnostic::PairingFailed { error, .. } | Diagnostic::RequestFailed { error, .. } => {
                Some(error)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DiscoveryStarted { seek } => write!(
                f,
                "Starting discovery. This will continue for {:.1} seconds.",
                seek.as_secs_f64()
            ),
            Diagnostic::DeviceDiscovered { address } => {
                write!(f, "New Aurora found at {}", address)
            }
            Diagnostic::DiscoveryFailed { reason } => write!(
                f,
                "Socket error while discovering SSDP devices: {}. \
                 Check that this machine's network connection allows multicast.",
                reason
            ),
            Diagnostic::DiscoveryFinished { found: 0 } => write!(
                f,
                "Discovery complete, but no Auroras found! Try increasing the seek time."
            ),
            Diagnostic::DiscoveryFinished { found } => {
                write!(f, "Discovery complete! Found {} Auroras.", found)
            }
            Diagnostic::Paired { address } => {
                write!(f, "Auth token for {} successfully generated", address)
            }
            Diagnostic::PairingFailed { address, error } => match error {
                NanoleafError::BadRequest => write!(
                    f,
                    "Forbidden by {}! Press and hold the power button for 5-7 seconds first \
                     (the light will begin flashing), then try again.",
                    address
                ),
                NanoleafError::Unauthorized => write!(
                    f,
                    "Not authorized by {}! The device refused to hand out a token.",
                    address
                ),
                NanoleafError::Unprocessable => write!(
                    f,
                    "Unprocessable entity from {}! This usually points at the network \
                     between you and the device.",
                    address
                ),
                other => write!(f, "Pairing with {} failed: {}", address, other),
            },
            Diagnostic::RequestFailed {
                address,
                method,
                path,
                error,
            } => match error.status() {
                Some(status) => write!(
                    f,
                    "Error {}: {} ({} /{} on {})",
                    status, error, method, path, address
                ),
                None => write!(f, "Error: {} ({} /{} on {})", error, method, path, address),
            },
            Diagnostic::NoAlternativeEffect { address, active } => write!(
                f,
                "No effect on {} to switch to besides {}",
                address,
                active.as_deref().unwrap_or("the active one")
            ),
        }
    }
}

/// Receives diagnostics. Implementations must tolerate calls from any thread.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to the `log` facade at the diagnostic's level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&self, diagnostic: Diagnostic) {
        log::log!(diagnostic.level(), "{}", diagnostic);
    }
}

/// Keeps diagnostics in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of everything emitted so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drains everything emitted so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(
            &mut *self
                .diagnostics
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// The errors of all failure diagnostics, in emission order.
    pub fn errors(&self) -> Vec<NanoleafError> {
        self.diagnostics()
            .iter()
            .filter_map(|diagnostic| diagnostic.error().cloned())
            .collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }
}
