//! Host error type

use cmpi_core::{CmpiError, ConfigError};
use serde::Serialize;

/// Errors surfaced through the host API
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A request reached a provider (or the broker) and failed
    #[error("{0}")]
    Cmpi(#[from] CmpiError),

    #[error("Malformed request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Panic in {0}")]
    Panic(&'static str),
}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// JSON shape of a failed request
#[derive(Debug, Serialize)]
pub struct ErrorReply {
    /// CMPI return code, or `CMPI_RC_ERR_FAILED` for host-side errors
    pub rc: i32,
    pub message: String,
}

impl HostError {
    pub fn invalid(message: impl Into<String>) -> Self {
        HostError::InvalidArgument(message.into())
    }

    /// The CMPI return code this error maps to
    pub fn rc(&self) -> i32 {
        match self {
            HostError::Cmpi(e) => e.rc(),
            HostError::Json(_) | HostError::InvalidArgument(_) => cmpi_core::sdk::CMPI_RC_ERR_INVALID_PARAMETER,
            HostError::Config(_) | HostError::Panic(_) => cmpi_core::sdk::CMPI_RC_ERR_FAILED,
        }
    }

    pub fn reply(&self) -> ErrorReply {
        let message = match self {
            HostError::Cmpi(e) => e.text().map(str::to_string).unwrap_or_else(|| e.to_string()),
            other => other.to_string(),
        };
        ErrorReply { rc: self.rc(), message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmpi_core::ReturnCode;

    #[test]
    fn test_reply_keeps_provider_rc() {
        let err = HostError::from(CmpiError::with_message(ReturnCode::ErrNotFound, "no fan 7"));
        let reply = err.reply();
        assert_eq!(reply.rc, cmpi_core::sdk::CMPI_RC_ERR_NOT_FOUND);
        assert_eq!(reply.message, "no fan 7");

        let err = HostError::invalid("missing class");
        assert_eq!(err.rc(), cmpi_core::sdk::CMPI_RC_ERR_INVALID_PARAMETER);
        assert_eq!(err.reply().message, "Invalid argument: missing class");
    }
}
