//! Error types for provider loading

use cmpi_sdk::CMPIrc;

/// Error type for provider loading operations
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Provider module could not be opened
    #[error("Library not found: {path} ({reason})")]
    LibraryNotFound { path: String, reason: String },

    /// Neither the named nor the generic factory symbol exists
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Factory ran but returned no MI
    #[error("Factory failed for {symbol}: rc={rc} {message}")]
    FactoryFailed {
        symbol: String,
        rc: CMPIrc,
        message: String,
    },

    /// Provider or module name is not usable as a symbol or path
    #[error("Invalid name: {0}")]
    InvalidName(String),
}
