//! C-compatible exports for embedding the broker
//!
//! Strings returned by this module are owned by the caller and must be
//! released with [`cmpi_host_string_free`].

use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use tracing::instrument;

use crate::error::HostError;
use crate::host::{Host, Reply};

static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();

/// Opaque broker handle owned by the embedding process
pub struct CmpiHost {
    host: Host,
}

/// Create a broker from a TOML config file
///
/// Returns null on failure and writes the reason to `error`.
///
/// # Safety
/// - `config_path` must be a valid null-terminated C string
/// - `error` must be a valid pointer to a buffer of at least `maxlen` bytes, or null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn cmpi_host_create(
    config_path: *const c_char,
    error: *mut c_char,
    maxlen: usize,
) -> *mut CmpiHost {
    if config_path.is_null() {
        write_error(error, maxlen, "Config path is null");
        return std::ptr::null_mut();
    }
    let path = CStr::from_ptr(config_path).to_string_lossy().into_owned();

    match catch_unwind(|| Host::load(Path::new(&path))) {
        Ok(Ok(host)) => Box::into_raw(Box::new(CmpiHost { host })),
        Ok(Err(e)) => {
            tracing::error!("Failed to create broker: {}", e);
            write_error(error, maxlen, &e.to_string());
            std::ptr::null_mut()
        }
        Err(_) => {
            write_error(error, maxlen, "Panic while creating broker");
            std::ptr::null_mut()
        }
    }
}

/// Shut the broker down and free it
///
/// # Safety
/// - `host` must come from [`cmpi_host_create`] and not be used afterwards, or be null
#[no_mangle]
#[instrument(skip_all)]
pub unsafe extern "C" fn cmpi_host_destroy(host: *mut CmpiHost) {
    if host.is_null() {
        return;
    }
    let host = Box::from_raw(host);
    if catch_unwind(AssertUnwindSafe(move || drop(host))).is_err() {
        tracing::error!("Panic during broker shutdown");
    }
}

/// Run one JSON request; returns a JSON reply
///
/// # Safety
/// - `host` must be a live handle from [`cmpi_host_create`]
/// - `request` must be a valid null-terminated C string
#[no_mangle]
pub unsafe extern "C" fn cmpi_host_request(host: *const CmpiHost, request: *const c_char) -> *mut c_char {
    let Some(host) = host.as_ref() else {
        return reply_error(HostError::invalid("host is null"));
    };
    if request.is_null() {
        return reply_error(HostError::invalid("request is null"));
    }
    let request = CStr::from_ptr(request).to_string_lossy();

    match catch_unwind(AssertUnwindSafe(|| host.host.execute_json(&request))) {
        Ok(reply) => into_c_string(reply),
        Err(_) => reply_error(HostError::Panic("cmpi_host_request")),
    }
}

/// Take every queued indication; returns a JSON array
///
/// # Safety
/// - `host` must be a live handle from [`cmpi_host_create`]
#[no_mangle]
pub unsafe extern "C" fn cmpi_host_drain_indications(host: *const CmpiHost) -> *mut c_char {
    let Some(host) = host.as_ref() else {
        return std::ptr::null_mut();
    };
    match catch_unwind(AssertUnwindSafe(|| host.host.drain_indications_json())) {
        Ok(events) => into_c_string(events),
        Err(_) => std::ptr::null_mut(),
    }
}

/// Unload providers that agree to it; returns how many MIs were released
///
/// # Safety
/// - `host` must be a live handle from [`cmpi_host_create`]
#[no_mangle]
pub unsafe extern "C" fn cmpi_host_unload_idle(host: *const CmpiHost) -> c_int {
    let Some(host) = host.as_ref() else {
        return -1;
    };
    match catch_unwind(AssertUnwindSafe(|| host.host.broker().unload_idle())) {
        Ok(n) => c_int::try_from(n).unwrap_or(c_int::MAX),
        Err(_) => -1,
    }
}

/// Free a string returned by this library
///
/// # Safety
/// - `s` must come from this library and not be freed twice, or be null
#[no_mangle]
pub unsafe extern "C" fn cmpi_host_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[no_mangle]
pub extern "C" fn cmpi_host_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

fn reply_error(error: HostError) -> *mut c_char {
    let reply = serde_json::to_string(&Reply::Error(error.reply())).unwrap_or_default();
    into_c_string(reply)
}

fn into_c_string(s: String) -> *mut c_char {
    // serde_json escapes control characters, so interior NULs cannot occur
    CString::new(s).map(CString::into_raw).unwrap_or(std::ptr::null_mut())
}

/// Helper to write an error message to a C buffer
///
/// # Safety
/// - `error` must be a valid pointer or null
/// - `maxlen` must accurately reflect the buffer size
unsafe fn write_error(error: *mut c_char, maxlen: usize, msg: &str) {
    if !error.is_null() && maxlen > 0 {
        let bytes = msg.as_bytes();
        let len = bytes.len().min(maxlen - 1);
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), error as *mut u8, len);
        *error.add(len) = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(s: *mut c_char) -> String {
        assert!(!s.is_null());
        // SAFETY: returned by this module
        let out = unsafe { CStr::from_ptr(s).to_string_lossy().into_owned() };
        unsafe { cmpi_host_string_free(s) };
        out
    }

    #[test]
    fn test_create_reports_missing_config() {
        let path = CString::new("/nonexistent/cmpi-host-test/cmpi.toml").unwrap();
        let mut buf = [0 as c_char; 128];
        let host = unsafe { cmpi_host_create(path.as_ptr(), buf.as_mut_ptr(), buf.len()) };
        assert!(host.is_null());
        let msg = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_string_lossy();
        assert!(msg.starts_with("Config error"), "{msg}");
    }

    #[test]
    fn test_null_host_is_an_error_reply() {
        let req = CString::new("{}").unwrap();
        let reply = take(unsafe { cmpi_host_request(std::ptr::null(), req.as_ptr()) });
        let json: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(json["error"]["rc"], cmpi_core::sdk::CMPI_RC_ERR_INVALID_PARAMETER);
    }

    #[test]
    fn test_write_error_truncates() {
        let mut buf = [0x7f as c_char; 4];
        unsafe { write_error(buf.as_mut_ptr(), buf.len(), "too long") };
        assert_eq!(unsafe { CStr::from_ptr(buf.as_ptr()) }.to_str().unwrap(), "too");
    }

    #[test]
    fn test_version_is_nul_terminated() {
        let v = unsafe { CStr::from_ptr(cmpi_host_version()) };
        assert_eq!(v.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
