//! `CMPIString`

use std::ffi::{c_char, CString};
use std::ptr;

use super::finish;
use crate::broker::memory;
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::CmpiError;

pub(crate) type NativeString = Native<CMPIString, CString>;

/// C string of `s` up to its first NUL
pub(crate) fn c_lossy(s: &str) -> CString {
    let bytes: Vec<u8> = s.bytes().take_while(|b| *b != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

pub(crate) fn create(s: CString, scope: Scope) -> *mut CMPIString {
    NativeString::create(&STRING_FT, s, scope)
}

/// String tracked in the current arena
pub(crate) fn new_tracked(s: &str) -> *mut CMPIString {
    create(c_lossy(s), Scope::Tracked)
}

unsafe extern "C" fn release(st: *mut CMPIString) -> CMPIStatus {
    NativeString::release(st, &STRING_FT)
}

unsafe extern "C" fn clone(st: *const CMPIString, rc: *mut CMPIStatus) -> *mut CMPIString {
    NativeString::clone_handle(st, &STRING_FT, rc)
}

unsafe extern "C" fn get_char_ptr(st: *const CMPIString, rc: *mut CMPIStatus) -> *const c_char {
    // the CString buffer does not move while the object lives
    let out = NativeString::from_handle(st, &STRING_FT).map(|o| o.lock().as_ptr());
    finish(rc, out, ptr::null())
}

unsafe extern "C" fn new_chars_cp(st: *const CMPIString, cpid: CMPICodepageID, rc: *mut CMPIStatus) -> *mut c_char {
    let out = NativeString::from_handle(st, &STRING_FT).and_then(|o| {
        let s = o.lock();
        let bytes = encode(&s.to_string_lossy(), cpid)?;
        Ok(memory::tracked_copy(&bytes).cast::<c_char>())
    });
    finish(rc, out, ptr::null_mut())
}

/// Encode with a terminator in codepage `cpid`
pub(crate) fn encode(s: &str, cpid: CMPICodepageID) -> Result<Vec<u8>, CmpiError> {
    match cpid {
        CMPI_CPID_UTF8 | CMPI_CPID_SYSTEM => {
            let mut out = s.as_bytes().to_vec();
            out.push(0);
            Ok(out)
        }
        CMPI_CPID_UTF16 => Ok(s
            .encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(u16::to_ne_bytes)
            .collect()),
        other => Err(CmpiError::from_rc(CMPI_RC_ERR_NOT_IN_CODEPAGE).message(format!("codepage {other}"))),
    }
}

/// Decode NUL-terminated bytes from codepage `cpid`
///
/// # Safety
/// `data` must be NUL-terminated in the given codepage (a 16-bit zero for
/// UTF-16).
pub(crate) unsafe fn decode(data: *const c_char, cpid: CMPICodepageID) -> Result<String, CmpiError> {
    match cpid {
        CMPI_CPID_UTF8 | CMPI_CPID_SYSTEM => std::ffi::CStr::from_ptr(data)
            .to_str()
            .map(str::to_string)
            .map_err(|e| CmpiError::from_rc(CMPI_RC_ERR_NOT_IN_CODEPAGE).message(e.to_string())),
        CMPI_CPID_UTF16 => {
            let wide = data as *const u16;
            let mut len = 0;
            while wide.add(len).read_unaligned() != 0 {
                len += 1;
            }
            let units: Vec<u16> = (0..len).map(|i| wide.add(i).read_unaligned()).collect();
            String::from_utf16(&units)
                .map_err(|e| CmpiError::from_rc(CMPI_RC_ERR_NOT_IN_CODEPAGE).message(e.to_string()))
        }
        other => Err(CmpiError::from_rc(CMPI_RC_ERR_NOT_IN_CODEPAGE).message(format!("codepage {other}"))),
    }
}

pub(crate) static STRING_FT: CMPIStringFT = CMPIStringFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    getCharPtr: get_char_ptr,
    newCharsCP: new_chars_cp,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use std::ffi::CStr;

    #[test]
    fn test_char_ptr_and_clone() {
        let _arena = ArenaGuard::push();
        let s = new_tracked("hello");
        unsafe {
            let mut rc = CMPIStatus::ok();
            let p = get_char_ptr(s, &mut rc);
            assert_eq!(CStr::from_ptr(p).to_str().unwrap(), "hello");
            let copy = clone(s, &mut rc);
            assert_eq!(rc.rc, CMPI_RC_OK);
            assert_ne!(copy, s);
            assert_eq!(release(copy).rc, CMPI_RC_OK);
        }
    }

    #[test]
    fn test_embedded_nul_truncates() {
        assert_eq!(c_lossy("ab\0cd").to_str().unwrap(), "ab");
    }

    #[test]
    fn test_codepages() {
        assert_eq!(encode("hé", CMPI_CPID_UTF8).unwrap(), b"h\xc3\xa9\0");
        let wide = encode("hé", CMPI_CPID_UTF16).unwrap();
        assert_eq!(wide.len(), 6);
        unsafe {
            assert_eq!(decode(wide.as_ptr().cast(), CMPI_CPID_UTF16).unwrap(), "hé");
            assert_eq!(decode(c"plain".as_ptr(), CMPI_CPID_SYSTEM).unwrap(), "plain");
        }
        let err = encode("x", 819).unwrap_err();
        assert_eq!(err.rc(), CMPI_RC_ERR_NOT_IN_CODEPAGE);
    }

    #[test]
    fn test_new_chars_cp_is_tracked() {
        let _arena = ArenaGuard::push();
        let s = new_tracked("abc");
        unsafe {
            let mut rc = CMPIStatus::ok();
            let p = new_chars_cp(s, CMPI_CPID_UTF8, &mut rc);
            assert_eq!(CStr::from_ptr(p).to_bytes(), b"abc");
            assert!(memory::untrack(p.cast()));
            libc::free(p.cast());

            let p = new_chars_cp(s, 37, &mut rc);
            assert!(p.is_null());
            assert_eq!(rc.rc, CMPI_RC_ERR_NOT_IN_CODEPAGE);
        }
    }
}
