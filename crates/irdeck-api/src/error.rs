use thiserror::Error;

/// Top-level error type for the `irdeck-api` crate.
///
/// Covers every failure mode of the RPC surface: transport, status
/// errors reported by the backend, payload decoding and stream framing.
/// `irdeck-core` collapses these into `Transport` / `NotFound`.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── RPC ─────────────────────────────────────────────────────────
    /// Structured error returned by the backend (`{ code, message }`).
    #[error("RPC error {code} (HTTP {status}): {message}")]
    Rpc {
        code: String,
        message: String,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A streamed response violated the envelope framing.
    #[error("Malformed stream frame: {0}")]
    Framing(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::Rpc { code, .. } => matches!(
                code.as_str(),
                "unavailable" | "deadline_exceeded" | "resource_exhausted" | "aborted"
            ),
            Self::Framing(_) => true,
            _ => false,
        }
    }

    /// Returns `true` if the backend reported the referenced entity as missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Rpc { code, status, .. } => code == "not_found" || *status == 404,
            _ => false,
        }
    }

    /// Extract the RPC error code, if available.
    pub fn rpc_code(&self) -> Option<&str> {
        match self {
            Self::Rpc { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc(code: &str, status: u16) -> Error {
        Error::Rpc {
            code: code.into(),
            message: "boom".into(),
            status,
        }
    }

    #[test]
    fn not_found_by_code_or_status() {
        assert!(rpc("not_found", 404).is_not_found());
        assert!(rpc("unknown", 404).is_not_found());
        assert!(!rpc("internal", 500).is_not_found());
    }

    #[test]
    fn unavailable_is_transient() {
        assert!(rpc("unavailable", 503).is_transient());
        assert!(!rpc("invalid_argument", 400).is_transient());
        assert!(Error::Framing("short".into()).is_transient());
    }

    #[test]
    fn rpc_code_only_for_rpc_errors() {
        assert_eq!(rpc("not_found", 404).rpc_code(), Some("not_found"));
        assert_eq!(Error::Tls("x".into()).rpc_code(), None);
    }
}
