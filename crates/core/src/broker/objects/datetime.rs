//! `CMPIDateTime`

use super::{finish, string};
use crate::broker::native::{Native, Scope};
use crate::datetime::CimDateTime;
use crate::sdk::*;

pub(crate) type NativeDateTime = Native<CMPIDateTime, CimDateTime>;

pub(crate) fn create(dt: CimDateTime, scope: Scope) -> *mut CMPIDateTime {
    NativeDateTime::create(&DATETIME_FT, dt, scope)
}

unsafe extern "C" fn release(dt: *mut CMPIDateTime) -> CMPIStatus {
    NativeDateTime::release(dt, &DATETIME_FT)
}

unsafe extern "C" fn clone(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> *mut CMPIDateTime {
    NativeDateTime::clone_handle(dt, &DATETIME_FT, rc)
}

unsafe extern "C" fn get_binary_format(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> CMPIUint64 {
    let out = NativeDateTime::from_handle(dt, &DATETIME_FT).map(|o| o.lock().binary());
    finish(rc, out, 0)
}

unsafe extern "C" fn get_string_format(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> *mut CMPIString {
    let out = NativeDateTime::from_handle(dt, &DATETIME_FT)
        .map(|o| string::new_tracked(&o.lock().to_cim_string()));
    finish(rc, out, std::ptr::null_mut())
}

unsafe extern "C" fn is_interval(dt: *const CMPIDateTime, rc: *mut CMPIStatus) -> CMPIBoolean {
    let out = NativeDateTime::from_handle(dt, &DATETIME_FT).map(|o| u8::from(o.lock().is_interval()));
    finish(rc, out, 0)
}

pub(crate) static DATETIME_FT: CMPIDateTimeFT = CMPIDateTimeFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    getBinaryFormat: get_binary_format,
    getStringFormat: get_string_format,
    isInterval: is_interval,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::native_string;

    #[test]
    fn test_interval_formats() {
        let _arena = ArenaGuard::push();
        let dt = create(CimDateTime::from_interval(90_061_000_001).unwrap(), Scope::Tracked);
        unsafe {
            let mut rc = CMPIStatus::ok();
            assert_eq!(get_binary_format(dt, &mut rc), 90_061_000_001);
            assert_eq!(is_interval(dt, &mut rc), 1);
            let s = get_string_format(dt, &mut rc);
            assert_eq!(native_string(s).unwrap(), "00000001010101.000001:000");
        }
    }

    #[test]
    fn test_wrong_handle_type() {
        let _arena = ArenaGuard::push();
        let s = string::new_tracked("not a datetime");
        unsafe {
            let mut rc = CMPIStatus::ok();
            get_binary_format(s.cast(), &mut rc);
            assert_eq!(rc.rc, CMPI_RC_ERR_INVALID_HANDLE);
        }
    }
}
