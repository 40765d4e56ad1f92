// ── Core error types ──
//
// User-facing errors from irdeck-core. Consumers never see HTTP status
// codes or stream framing failures directly; the `From<irdeck_api::Error>`
// impl collapses transport-layer errors into `Transport` / `NotFound`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Backend errors ───────────────────────────────────────────────
    /// The backend could not be reached or rejected the call. Recoverable:
    /// the next reconciliation pass retries.
    #[error("Backend unavailable: {message}")]
    Transport { message: String },

    /// The referenced remote, button or accessory does not exist.
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Host errors ──────────────────────────────────────────────────
    #[error("Accessory host error: {message}")]
    Host { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub(crate) fn not_found(entity_type: &str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type: entity_type.to_owned(),
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<irdeck_api::Error> for CoreError {
    fn from(err: irdeck_api::Error) -> Self {
        if err.is_not_found() {
            let identifier = match &err {
                irdeck_api::Error::Rpc { message, .. } => message.clone(),
                other => other.to_string(),
            };
            return CoreError::NotFound {
                entity_type: "resource".into(),
                identifier,
            };
        }

        match err {
            irdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            irdeck_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            other => CoreError::Transport {
                message: other.to_string(),
            },
        }
    }
}
