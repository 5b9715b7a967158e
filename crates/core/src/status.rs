//! Return codes, errors and status conversion

use std::fmt;

use crate::handles::{BrokerHandle, StringRef};
use crate::sdk::*;
use crate::value::ErrorData;

/// Every return code defined by CMPI 2.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReturnCode {
    Ok = CMPI_RC_OK,
    ErrFailed = CMPI_RC_ERR_FAILED,
    ErrAccessDenied = CMPI_RC_ERR_ACCESS_DENIED,
    ErrInvalidNamespace = CMPI_RC_ERR_INVALID_NAMESPACE,
    ErrInvalidParameter = CMPI_RC_ERR_INVALID_PARAMETER,
    ErrInvalidClass = CMPI_RC_ERR_INVALID_CLASS,
    ErrNotFound = CMPI_RC_ERR_NOT_FOUND,
    ErrNotSupported = CMPI_RC_ERR_NOT_SUPPORTED,
    ErrClassHasChildren = CMPI_RC_ERR_CLASS_HAS_CHILDREN,
    ErrClassHasInstances = CMPI_RC_ERR_CLASS_HAS_INSTANCES,
    ErrInvalidSuperclass = CMPI_RC_ERR_INVALID_SUPERCLASS,
    ErrAlreadyExists = CMPI_RC_ERR_ALREADY_EXISTS,
    ErrNoSuchProperty = CMPI_RC_ERR_NO_SUCH_PROPERTY,
    ErrTypeMismatch = CMPI_RC_ERR_TYPE_MISMATCH,
    ErrQueryLanguageNotSupported = CMPI_RC_ERR_QUERY_LANGUAGE_NOT_SUPPORTED,
    ErrInvalidQuery = CMPI_RC_ERR_INVALID_QUERY,
    ErrMethodNotAvailable = CMPI_RC_ERR_METHOD_NOT_AVAILABLE,
    ErrMethodNotFound = CMPI_RC_ERR_METHOD_NOT_FOUND,
    ErrNamespaceNotEmpty = CMPI_RC_ERR_NAMESPACE_NOT_EMPTY,
    ErrInvalidEnumerationContext = CMPI_RC_ERR_INVALID_ENUMERATION_CONTEXT,
    ErrInvalidOperationTimeout = CMPI_RC_ERR_INVALID_OPERATION_TIMEOUT,
    ErrPullHasBeenAbandoned = CMPI_RC_ERR_PULL_HAS_BEEN_ABANDONED,
    ErrPullCannotBeAbandoned = CMPI_RC_ERR_PULL_CANNOT_BE_ABANDONED,
    ErrFilteredEnumerationNotSupported = CMPI_RC_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED,
    ErrContinuationOnErrorNotSupported = CMPI_RC_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED,
    ErrServerLimitsExceeded = CMPI_RC_ERR_SERVER_LIMITS_EXCEEDED,
    ErrServerIsShuttingDown = CMPI_RC_ERR_SERVER_IS_SHUTTING_DOWN,
    DoNotUnload = CMPI_RC_DO_NOT_UNLOAD,
    NeverUnload = CMPI_RC_NEVER_UNLOAD,
    ErrInvalidHandle = CMPI_RC_ERR_INVALID_HANDLE,
    ErrInvalidDataType = CMPI_RC_ERR_INVALID_DATA_TYPE,
    ErrNotInCodepage = CMPI_RC_ERR_NOT_IN_CODEPAGE,
    ErrorSystem = CMPI_RC_ERROR_SYSTEM,
    Error = CMPI_RC_ERROR,
}

/// Disjoint numeric ranges of return codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcCategory {
    /// 0
    Success,
    /// 1-28: mirrors of CIM status codes
    CimStatus,
    /// 50-51: only meaningful as the result of `cleanup`
    CleanupOnly,
    /// 60-62: misuse of the interface itself
    Interface,
    /// 100, 200: OS-level failures
    System,
}

impl ReturnCode {
    pub const ALL: [ReturnCode; 34] = [
        ReturnCode::Ok,
        ReturnCode::ErrFailed,
        ReturnCode::ErrAccessDenied,
        ReturnCode::ErrInvalidNamespace,
        ReturnCode::ErrInvalidParameter,
        ReturnCode::ErrInvalidClass,
        ReturnCode::ErrNotFound,
        ReturnCode::ErrNotSupported,
        ReturnCode::ErrClassHasChildren,
        ReturnCode::ErrClassHasInstances,
        ReturnCode::ErrInvalidSuperclass,
        ReturnCode::ErrAlreadyExists,
        ReturnCode::ErrNoSuchProperty,
        ReturnCode::ErrTypeMismatch,
        ReturnCode::ErrQueryLanguageNotSupported,
        ReturnCode::ErrInvalidQuery,
        ReturnCode::ErrMethodNotAvailable,
        ReturnCode::ErrMethodNotFound,
        ReturnCode::ErrNamespaceNotEmpty,
        ReturnCode::ErrInvalidEnumerationContext,
        ReturnCode::ErrInvalidOperationTimeout,
        ReturnCode::ErrPullHasBeenAbandoned,
        ReturnCode::ErrPullCannotBeAbandoned,
        ReturnCode::ErrFilteredEnumerationNotSupported,
        ReturnCode::ErrContinuationOnErrorNotSupported,
        ReturnCode::ErrServerLimitsExceeded,
        ReturnCode::ErrServerIsShuttingDown,
        ReturnCode::DoNotUnload,
        ReturnCode::NeverUnload,
        ReturnCode::ErrInvalidHandle,
        ReturnCode::ErrInvalidDataType,
        ReturnCode::ErrNotInCodepage,
        ReturnCode::ErrorSystem,
        ReturnCode::Error,
    ];

    pub fn from_raw(rc: CMPIrc) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_raw() == rc)
    }

    pub const fn as_raw(self) -> CMPIrc {
        self as CMPIrc
    }

    pub const fn category(self) -> RcCategory {
        match self as CMPIrc {
            0 => RcCategory::Success,
            1..=49 => RcCategory::CimStatus,
            50..=59 => RcCategory::CleanupOnly,
            60..=99 => RcCategory::Interface,
            _ => RcCategory::System,
        }
    }

    /// Local misuse (bad handle, bad type, codepage) rather than a domain condition
    pub const fn is_interface_error(self) -> bool {
        matches!(self.category(), RcCategory::Interface)
    }

    /// Symbolic C name, e.g. `CMPI_RC_ERR_NOT_FOUND`
    pub const fn name(self) -> &'static str {
        match self {
            ReturnCode::Ok => "CMPI_RC_OK",
            ReturnCode::ErrFailed => "CMPI_RC_ERR_FAILED",
            ReturnCode::ErrAccessDenied => "CMPI_RC_ERR_ACCESS_DENIED",
            ReturnCode::ErrInvalidNamespace => "CMPI_RC_ERR_INVALID_NAMESPACE",
            ReturnCode::ErrInvalidParameter => "CMPI_RC_ERR_INVALID_PARAMETER",
            ReturnCode::ErrInvalidClass => "CMPI_RC_ERR_INVALID_CLASS",
            ReturnCode::ErrNotFound => "CMPI_RC_ERR_NOT_FOUND",
            ReturnCode::ErrNotSupported => "CMPI_RC_ERR_NOT_SUPPORTED",
            ReturnCode::ErrClassHasChildren => "CMPI_RC_ERR_CLASS_HAS_CHILDREN",
            ReturnCode::ErrClassHasInstances => "CMPI_RC_ERR_CLASS_HAS_INSTANCES",
            ReturnCode::ErrInvalidSuperclass => "CMPI_RC_ERR_INVALID_SUPERCLASS",
            ReturnCode::ErrAlreadyExists => "CMPI_RC_ERR_ALREADY_EXISTS",
            ReturnCode::ErrNoSuchProperty => "CMPI_RC_ERR_NO_SUCH_PROPERTY",
            ReturnCode::ErrTypeMismatch => "CMPI_RC_ERR_TYPE_MISMATCH",
            ReturnCode::ErrQueryLanguageNotSupported => "CMPI_RC_ERR_QUERY_LANGUAGE_NOT_SUPPORTED",
            ReturnCode::ErrInvalidQuery => "CMPI_RC_ERR_INVALID_QUERY",
            ReturnCode::ErrMethodNotAvailable => "CMPI_RC_ERR_METHOD_NOT_AVAILABLE",
            ReturnCode::ErrMethodNotFound => "CMPI_RC_ERR_METHOD_NOT_FOUND",
            ReturnCode::ErrNamespaceNotEmpty => "CMPI_RC_ERR_NAMESPACE_NOT_EMPTY",
            ReturnCode::ErrInvalidEnumerationContext => "CMPI_RC_ERR_INVALID_ENUMERATION_CONTEXT",
            ReturnCode::ErrInvalidOperationTimeout => "CMPI_RC_ERR_INVALID_OPERATION_TIMEOUT",
            ReturnCode::ErrPullHasBeenAbandoned => "CMPI_RC_ERR_PULL_HAS_BEEN_ABANDONED",
            ReturnCode::ErrPullCannotBeAbandoned => "CMPI_RC_ERR_PULL_CANNOT_BE_ABANDONED",
            ReturnCode::ErrFilteredEnumerationNotSupported => {
                "CMPI_RC_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED"
            }
            ReturnCode::ErrContinuationOnErrorNotSupported => {
                "CMPI_RC_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED"
            }
            ReturnCode::ErrServerLimitsExceeded => "CMPI_RC_ERR_SERVER_LIMITS_EXCEEDED",
            ReturnCode::ErrServerIsShuttingDown => "CMPI_RC_ERR_SERVER_IS_SHUTTING_DOWN",
            ReturnCode::DoNotUnload => "CMPI_RC_DO_NOT_UNLOAD",
            ReturnCode::NeverUnload => "CMPI_RC_NEVER_UNLOAD",
            ReturnCode::ErrInvalidHandle => "CMPI_RC_ERR_INVALID_HANDLE",
            ReturnCode::ErrInvalidDataType => "CMPI_RC_ERR_INVALID_DATA_TYPE",
            ReturnCode::ErrNotInCodepage => "CMPI_RC_ERR_NOT_IN_CODEPAGE",
            ReturnCode::ErrorSystem => "CMPI_RC_ERROR_SYSTEM",
            ReturnCode::Error => "CMPI_RC_ERROR",
        }
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed CMPI operation: non-OK return code plus optional message
///
/// The raw code is kept so that codes this crate does not know survive a
/// round trip through a foreign broker or provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub struct CmpiError {
    rc: CMPIrc,
    message: Option<String>,
    /// Extended errors a provider returned through `returnError`
    errors: Vec<ErrorData>,
}

impl fmt::Display for CmpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ReturnCode::from_raw(self.rc) {
            Some(code) => write!(f, "{code}")?,
            None => write!(f, "rc={}", self.rc)?,
        }
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

/// Result type for CMPI operations
pub type CmpiResult<T> = Result<T, CmpiError>;

impl CmpiError {
    pub fn new(code: ReturnCode) -> Self {
        Self::from_rc(code.as_raw())
    }

    pub fn from_rc(rc: CMPIrc) -> Self {
        Self {
            rc,
            message: None,
            errors: Vec::new(),
        }
    }

    pub fn with_message(code: ReturnCode, message: impl Into<String>) -> Self {
        Self::new(code).message(message)
    }

    /// Replace the message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<ErrorData>) -> Self {
        self.errors = errors;
        self
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_message(ReturnCode::ErrFailed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ReturnCode::ErrNotFound, message)
    }

    pub fn not_supported() -> Self {
        Self::new(ReturnCode::ErrNotSupported)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::with_message(ReturnCode::ErrInvalidParameter, message)
    }

    pub fn invalid_handle(what: &str) -> Self {
        Self::with_message(ReturnCode::ErrInvalidHandle, format!("invalid {what} handle"))
    }

    pub fn invalid_data_type(message: impl Into<String>) -> Self {
        Self::with_message(ReturnCode::ErrInvalidDataType, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::with_message(ReturnCode::ErrTypeMismatch, message)
    }

    pub fn no_such_property(name: &str) -> Self {
        Self::with_message(ReturnCode::ErrNoSuchProperty, name.to_string())
    }

    pub fn rc(&self) -> CMPIrc {
        self.rc
    }

    pub fn code(&self) -> Option<ReturnCode> {
        ReturnCode::from_raw(self.rc)
    }

    pub fn text(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn errors(&self) -> &[ErrorData] {
        &self.errors
    }

    pub fn is(&self, code: ReturnCode) -> bool {
        self.rc == code.as_raw()
    }

    /// Encode as a `CMPIStatus`
    ///
    /// With a broker, the message is allocated as a broker string which the
    /// receiver releases. Without one, only the code is carried.
    pub fn to_status(&self, broker: Option<&BrokerHandle>) -> CMPIStatus {
        let msg = match (&self.message, broker) {
            (Some(text), Some(broker)) => broker
                .new_string(text)
                .map(|s| s.as_ptr())
                .unwrap_or(std::ptr::null_mut()),
            _ => std::ptr::null_mut(),
        };
        CMPIStatus { rc: self.rc, msg }
    }

    /// Decode a `CMPIStatus`, taking ownership of (and releasing) its message
    ///
    /// # Safety
    /// `status.msg` must be null or a live string handle.
    pub unsafe fn check(status: CMPIStatus) -> CmpiResult<()> {
        let message = StringRef::take_status_message(status.msg);
        if status.rc == CMPI_RC_OK {
            return Ok(());
        }
        Err(CmpiError {
            rc: status.rc,
            message,
            errors: Vec::new(),
        })
    }
}

impl From<ReturnCode> for CmpiError {
    fn from(code: ReturnCode) -> Self {
        CmpiError::new(code)
    }
}

/// A failing factory keeps its own code; anything else is `CMPI_RC_ERR_FAILED`
impl From<crate::engine::LoadError> for CmpiError {
    fn from(err: crate::engine::LoadError) -> Self {
        match err {
            crate::engine::LoadError::FactoryFailed { symbol, rc, message } => {
                let text = if message.is_empty() { symbol } else { format!("{symbol}: {message}") };
                CmpiError::from_rc(rc).message(text)
            }
            other => CmpiError::failed(other.to_string()),
        }
    }
}

/// Outcome of a provider `cleanup`
///
/// The only place the cleanup-only return codes can be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CleanupOutcome {
    /// Provider may be unloaded
    #[default]
    Unload,
    /// Keep loaded for now; may be asked again later
    DoNotUnload,
    /// Keep loaded until the broker terminates
    NeverUnload,
}

impl CleanupOutcome {
    pub const fn as_raw(self) -> CMPIrc {
        match self {
            CleanupOutcome::Unload => CMPI_RC_OK,
            CleanupOutcome::DoNotUnload => CMPI_RC_DO_NOT_UNLOAD,
            CleanupOutcome::NeverUnload => CMPI_RC_NEVER_UNLOAD,
        }
    }

    /// Interpret a cleanup return code; other failures mean "unload anyway"
    pub const fn from_raw(rc: CMPIrc) -> Self {
        match rc {
            CMPI_RC_DO_NOT_UNLOAD => CleanupOutcome::DoNotUnload,
            CMPI_RC_NEVER_UNLOAD => CleanupOutcome::NeverUnload,
            _ => CleanupOutcome::Unload,
        }
    }

    /// Apply broker shutdown, which a provider cannot veto
    pub const fn when_terminating(self, terminating: bool) -> Self {
        if terminating {
            CleanupOutcome::Unload
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_code_values() {
        assert_eq!(ReturnCode::Ok.as_raw(), 0);
        assert_eq!(ReturnCode::ErrFailed.as_raw(), 1);
        assert_eq!(ReturnCode::ErrNotFound.as_raw(), 6);
        assert_eq!(ReturnCode::ErrNotSupported.as_raw(), 7);
        assert_eq!(ReturnCode::ErrMethodNotFound.as_raw(), 17);
        assert_eq!(ReturnCode::ErrNamespaceNotEmpty.as_raw(), 20);
        assert_eq!(ReturnCode::ErrServerIsShuttingDown.as_raw(), 28);
        assert_eq!(ReturnCode::DoNotUnload.as_raw(), 50);
        assert_eq!(ReturnCode::NeverUnload.as_raw(), 51);
        assert_eq!(ReturnCode::ErrInvalidHandle.as_raw(), 60);
        assert_eq!(ReturnCode::ErrInvalidDataType.as_raw(), 61);
        assert_eq!(ReturnCode::ErrNotInCodepage.as_raw(), 62);
        assert_eq!(ReturnCode::ErrorSystem.as_raw(), 100);
        assert_eq!(ReturnCode::Error.as_raw(), 200);
    }

    #[test]
    fn test_return_code_round_trip() {
        for code in ReturnCode::ALL {
            assert_eq!(ReturnCode::from_raw(code.as_raw()), Some(code));
        }
        assert_eq!(ReturnCode::from_raw(18), None);
        assert_eq!(ReturnCode::from_raw(300), None);
    }

    #[test]
    fn test_categories_are_disjoint() {
        assert_eq!(ReturnCode::Ok.category(), RcCategory::Success);
        assert_eq!(ReturnCode::ErrAccessDenied.category(), RcCategory::CimStatus);
        assert_eq!(ReturnCode::ErrServerLimitsExceeded.category(), RcCategory::CimStatus);
        assert_eq!(ReturnCode::DoNotUnload.category(), RcCategory::CleanupOnly);
        assert_eq!(ReturnCode::NeverUnload.category(), RcCategory::CleanupOnly);
        assert_eq!(ReturnCode::ErrNotInCodepage.category(), RcCategory::Interface);
        assert_eq!(ReturnCode::ErrorSystem.category(), RcCategory::System);
        assert_eq!(ReturnCode::Error.category(), RcCategory::System);

        assert!(ReturnCode::ErrInvalidHandle.is_interface_error());
        assert!(!ReturnCode::ErrNotFound.is_interface_error());
        assert!(!ReturnCode::ErrTypeMismatch.is_interface_error());
    }

    #[test]
    fn test_error_display() {
        let err = CmpiError::not_found("Sample.Id=3");
        assert_eq!(err.to_string(), "CMPI_RC_ERR_NOT_FOUND: Sample.Id=3");
        assert_eq!(CmpiError::from_rc(999).to_string(), "rc=999");
        assert!(err.is(ReturnCode::ErrNotFound));
    }

    #[test]
    fn test_check_ok_and_error_without_message() {
        assert!(unsafe { CmpiError::check(CMPIStatus::ok()) }.is_ok());
        let err = unsafe { CmpiError::check(CMPIStatus::rc(CMPI_RC_ERR_ACCESS_DENIED)) };
        assert_eq!(err.unwrap_err().code(), Some(ReturnCode::ErrAccessDenied));
    }

    #[test]
    fn test_status_without_broker_drops_message() {
        let st = CmpiError::failed("boom").to_status(None);
        assert_eq!(st.rc, CMPI_RC_ERR_FAILED);
        assert!(st.msg.is_null());
    }

    #[test]
    fn test_load_error_conversion() {
        let err = CmpiError::from(crate::engine::LoadError::FactoryFailed {
            symbol: "Fan_Create_InstanceMI".into(),
            rc: CMPI_RC_ERR_ACCESS_DENIED,
            message: "no license".into(),
        });
        assert_eq!(err.code(), Some(ReturnCode::ErrAccessDenied));
        assert_eq!(err.text(), Some("Fan_Create_InstanceMI: no license"));

        let err = CmpiError::from(crate::engine::LoadError::SymbolNotFound("X_Create_MethodMI".into()));
        assert_eq!(err.code(), Some(ReturnCode::ErrFailed));
    }

    #[test]
    fn test_cleanup_outcome_codes() {
        assert_eq!(CleanupOutcome::Unload.as_raw(), CMPI_RC_OK);
        assert_eq!(CleanupOutcome::DoNotUnload.as_raw(), 50);
        assert_eq!(CleanupOutcome::NeverUnload.as_raw(), 51);
        assert_eq!(CleanupOutcome::from_raw(51), CleanupOutcome::NeverUnload);
        assert_eq!(CleanupOutcome::from_raw(CMPI_RC_ERR_FAILED), CleanupOutcome::Unload);
        assert_eq!(
            CleanupOutcome::NeverUnload.when_terminating(true),
            CleanupOutcome::Unload
        );
        assert_eq!(
            CleanupOutcome::DoNotUnload.when_terminating(false),
            CleanupOutcome::DoNotUnload
        );
    }
}
