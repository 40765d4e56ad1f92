//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable
//! help text.

use miette::Diagnostic;
use thiserror::Error;

use irdeck_config::ConfigError;
use irdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the irdeck backend")]
    #[diagnostic(
        code(irdeck::connection_failed),
        help(
            "Check that aim (and pirem, for the relay backend) are running.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { reason: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(irdeck::not_found),
        help("Run: irdeck {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Host ─────────────────────────────────────────────────────────
    #[error("Accessory host error: {message}")]
    #[diagnostic(
        code(irdeck::host),
        help("Check that the accessory cache file is readable and writable.")
    )]
    Host { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("{field} is not configured")]
    #[diagnostic(
        code(irdeck::missing_setting),
        help(
            "Set {field} in {path}\n\
             or export {env}."
        )
    )]
    MissingSetting {
        field: String,
        env: String,
        path: String,
    },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(irdeck::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(irdeck::config))]
    Config(ConfigError),

    // ── Internal / IO ────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    #[diagnostic(code(irdeck::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::MissingSetting { .. } | Self::Validation { .. } | Self::Config(_) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the config file location to a config error.
    pub fn from_config(err: ConfigError, path: &std::path::Path) -> Self {
        match err {
            ConfigError::Missing { field } => Self::MissingSetting {
                env: format!("IRDECK_{}", field.to_uppercase()),
                path: path.display().to_string(),
                field,
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message } => Self::ConnectionFailed { reason: message },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => Self::NotFound {
                list_command: match entity_type.as_str() {
                    "accessory" => "accessories".into(),
                    _ => "remotes".into(),
                },
                resource_type: entity_type,
                identifier,
            },

            CoreError::Host { message } => Self::Host { message },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn missing_setting_names_env_var() {
        let err = CliError::from_config(
            ConfigError::Missing {
                field: "pirem_url".into(),
            },
            Path::new("/etc/irdeck/config.toml"),
        );
        match &err {
            CliError::MissingSetting { env, path, .. } => {
                assert_eq!(env, "IRDECK_PIREM_URL");
                assert_eq!(path, "/etc/irdeck/config.toml");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn core_errors_map_to_exit_codes() {
        let transport: CliError = CoreError::Transport {
            message: "refused".into(),
        }
        .into();
        assert_eq!(transport.exit_code(), exit_code::CONNECTION);

        let missing: CliError = CoreError::NotFound {
            entity_type: "button".into(),
            identifier: "boost on Fan".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);
        assert!(missing.to_string().contains("boost on Fan"));

        let host: CliError = CoreError::Host {
            message: "disk full".into(),
        }
        .into();
        assert_eq!(host.exit_code(), exit_code::GENERAL);
    }
}
