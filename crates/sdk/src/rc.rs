//! Return codes
//!
//! Four disjoint numeric ranges:
//! - `0..=28` - success and mirrors of the CIM status codes
//! - `50..=51` - only meaningful as the result of a provider `cleanup`
//! - `60..=62` - CMPI interface usage errors
//! - `100`, `200` - OS level and generic errors

use std::ffi::c_int;

pub type CMPIrc = c_int;

pub const CMPI_RC_OK: CMPIrc = 0;
pub const CMPI_RC_ERR_FAILED: CMPIrc = 1;
pub const CMPI_RC_ERR_ACCESS_DENIED: CMPIrc = 2;
pub const CMPI_RC_ERR_INVALID_NAMESPACE: CMPIrc = 3;
pub const CMPI_RC_ERR_INVALID_PARAMETER: CMPIrc = 4;
pub const CMPI_RC_ERR_INVALID_CLASS: CMPIrc = 5;
pub const CMPI_RC_ERR_NOT_FOUND: CMPIrc = 6;
pub const CMPI_RC_ERR_NOT_SUPPORTED: CMPIrc = 7;
pub const CMPI_RC_ERR_CLASS_HAS_CHILDREN: CMPIrc = 8;
pub const CMPI_RC_ERR_CLASS_HAS_INSTANCES: CMPIrc = 9;
pub const CMPI_RC_ERR_INVALID_SUPERCLASS: CMPIrc = 10;
pub const CMPI_RC_ERR_ALREADY_EXISTS: CMPIrc = 11;
pub const CMPI_RC_ERR_NO_SUCH_PROPERTY: CMPIrc = 12;
pub const CMPI_RC_ERR_TYPE_MISMATCH: CMPIrc = 13;
pub const CMPI_RC_ERR_QUERY_LANGUAGE_NOT_SUPPORTED: CMPIrc = 14;
pub const CMPI_RC_ERR_INVALID_QUERY: CMPIrc = 15;
pub const CMPI_RC_ERR_METHOD_NOT_AVAILABLE: CMPIrc = 16;
pub const CMPI_RC_ERR_METHOD_NOT_FOUND: CMPIrc = 17;
pub const CMPI_RC_ERR_NAMESPACE_NOT_EMPTY: CMPIrc = 20;
pub const CMPI_RC_ERR_INVALID_ENUMERATION_CONTEXT: CMPIrc = 21;
pub const CMPI_RC_ERR_INVALID_OPERATION_TIMEOUT: CMPIrc = 22;
pub const CMPI_RC_ERR_PULL_HAS_BEEN_ABANDONED: CMPIrc = 23;
pub const CMPI_RC_ERR_PULL_CANNOT_BE_ABANDONED: CMPIrc = 24;
pub const CMPI_RC_ERR_FILTERED_ENUMERATION_NOT_SUPPORTED: CMPIrc = 25;
pub const CMPI_RC_ERR_CONTINUATION_ON_ERROR_NOT_SUPPORTED: CMPIrc = 26;
pub const CMPI_RC_ERR_SERVER_LIMITS_EXCEEDED: CMPIrc = 27;
pub const CMPI_RC_ERR_SERVER_IS_SHUTTING_DOWN: CMPIrc = 28;

// Cleanup-only
pub const CMPI_RC_DO_NOT_UNLOAD: CMPIrc = 50;
pub const CMPI_RC_NEVER_UNLOAD: CMPIrc = 51;

// Interface usage
pub const CMPI_RC_ERR_INVALID_HANDLE: CMPIrc = 60;
pub const CMPI_RC_ERR_INVALID_DATA_TYPE: CMPIrc = 61;
pub const CMPI_RC_ERR_NOT_IN_CODEPAGE: CMPIrc = 62;

// OS level
pub const CMPI_RC_ERROR_SYSTEM: CMPIrc = 100;
pub const CMPI_RC_ERROR: CMPIrc = 200;
