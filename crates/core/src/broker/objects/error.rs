//! `CMPIError`

use std::ffi::c_char;
use std::ptr;

use super::{array, done, finish, native_array, string};
use crate::broker::convert::arg_str;
use crate::broker::native::{Native, Scope};
use crate::sdk::*;
use crate::status::{CmpiError, CmpiResult};
use crate::value::raw::read_array;
use crate::value::{ArrayData, ErrorData, Value};

pub(crate) type NativeError = Native<CMPIError, ErrorData>;

pub(crate) fn create(data: ErrorData, scope: Scope) -> *mut CMPIError {
    NativeError::create(&ERROR_FT, data, scope)
}

unsafe fn read<T>(er: *const CMPIError, rc: *mut CMPIStatus, fallback: T, f: impl FnOnce(&ErrorData) -> T) -> T {
    let out = NativeError::from_handle(er, &ERROR_FT).map(|o| f(&*o.lock()));
    finish(rc, out, fallback)
}

unsafe fn write(er: *const CMPIError, f: impl FnOnce(&mut ErrorData)) -> CMPIStatus {
    done(NativeError::from_handle(er, &ERROR_FT).map(|o| f(&mut *o.lock())))
}

fn opt_string(s: &Option<String>, field: &str) -> CmpiResult<*mut CMPIString> {
    s.as_deref()
        .map(string::new_tracked)
        .ok_or_else(|| CmpiError::no_such_property(field))
}

fn opt_array(values: &Option<Vec<String>>, field: &str) -> CmpiResult<*mut CMPIArray> {
    values
        .as_ref()
        .map(|v| array::create(ArrayData::from_values(CMPI_string, v.iter().map(String::as_str)), Scope::Tracked))
        .ok_or_else(|| CmpiError::no_such_property(field))
}

/// Copy a string array argument; the caller keeps its array
unsafe fn strings_of(ar: *const CMPIArray) -> CmpiResult<Vec<String>> {
    if ar.is_null() {
        return Err(CmpiError::invalid_parameter("array"));
    }
    let data = match native_array(ar) {
        Some(a) => a,
        None => read_array(ar)?,
    };
    if data.element_type != CMPI_string && data.element_type != CMPI_chars {
        return Err(CmpiError::type_mismatch("expected a string array"));
    }
    Ok(data
        .elements
        .into_iter()
        .filter_map(|d| match d.into_value() {
            Some(Value::String(s) | Value::Chars(s)) => Some(s),
            _ => None,
        })
        .collect())
}

unsafe extern "C" fn release(er: *mut CMPIError) -> CMPIStatus {
    NativeError::release(er, &ERROR_FT)
}

unsafe extern "C" fn clone(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIError {
    NativeError::clone_handle(er, &ERROR_FT, rc)
}

macro_rules! string_getters {
    ($($fn_name:ident => $field:ident;)*) => {
        $(
            unsafe extern "C" fn $fn_name(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIString {
                let out = NativeError::from_handle(er, &ERROR_FT)
                    .and_then(|o| opt_string(&o.lock().$field, stringify!($field)));
                finish(rc, out, ptr::null_mut())
            }
        )*
    };
}

string_getters! {
    get_other_error_type => other_error_type;
    get_owning_entity => owning_entity;
    get_message_id => message_id;
    get_message => message;
    get_probable_cause_description => probable_cause_description;
    get_error_source => error_source;
    get_other_error_source_format => other_error_source_format;
    get_cim_status_code_description => cim_status_code_description;
}

macro_rules! string_setters {
    ($($fn_name:ident => $field:ident;)*) => {
        $(
            unsafe extern "C" fn $fn_name(er: *const CMPIError, value: *const c_char) -> CMPIStatus {
                let value = arg_str(value).map(str::to_string);
                write(er, |e| e.$field = value)
            }
        )*
    };
}

string_setters! {
    set_other_error_type => other_error_type;
    set_probable_cause_description => probable_cause_description;
    set_error_source => error_source;
    set_other_error_source_format => other_error_source_format;
    set_cim_status_code_description => cim_status_code_description;
}

unsafe extern "C" fn get_error_type(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorType {
    read(er, rc, UnknownErrorType, |e| e.error_type)
}

unsafe extern "C" fn get_perceived_severity(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorSeverity {
    read(er, rc, ErrorSevUnknown, |e| e.perceived_severity)
}

unsafe extern "C" fn get_probable_cause(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorProbableCause {
    read(er, rc, ErrorProbCauseUnknown, |e| e.probable_cause)
}

unsafe extern "C" fn get_error_source_format(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIErrorSrcFormat {
    read(er, rc, CMPIErrSrcUnknown, |e| e.error_source_format)
}

unsafe extern "C" fn get_cim_status_code(er: *const CMPIError, rc: *mut CMPIStatus) -> CMPIrc {
    read(er, rc, CMPI_RC_OK, |e| e.cim_status_code)
}

unsafe extern "C" fn get_recommended_actions(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIArray {
    let out = NativeError::from_handle(er, &ERROR_FT)
        .and_then(|o| opt_array(&o.lock().recommended_actions, "recommended_actions"));
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn get_message_arguments(er: *const CMPIError, rc: *mut CMPIStatus) -> *mut CMPIArray {
    let out = NativeError::from_handle(er, &ERROR_FT)
        .and_then(|o| opt_array(&o.lock().message_arguments, "message_arguments"));
    finish(rc, out, ptr::null_mut())
}

unsafe extern "C" fn set_error_type(er: *const CMPIError, et: CMPIErrorType) -> CMPIStatus {
    write(er, |e| e.error_type = et)
}

unsafe extern "C" fn set_error_source_format(er: *const CMPIError, esf: CMPIErrorSrcFormat) -> CMPIStatus {
    write(er, |e| e.error_source_format = esf)
}

unsafe extern "C" fn set_recommended_actions(er: *const CMPIError, ra: *const CMPIArray) -> CMPIStatus {
    done(NativeError::from_handle(er, &ERROR_FT).and_then(|o| {
        let actions = strings_of(ra)?;
        o.lock().recommended_actions = Some(actions);
        Ok(())
    }))
}

unsafe extern "C" fn set_message_arguments(er: *const CMPIError, values: *const CMPIArray) -> CMPIStatus {
    done(NativeError::from_handle(er, &ERROR_FT).and_then(|o| {
        let args = strings_of(values)?;
        o.lock().message_arguments = Some(args);
        Ok(())
    }))
}

pub(crate) static ERROR_FT: CMPIErrorFT = CMPIErrorFT {
    ftVersion: CMPICurrentVersion,
    release,
    clone,
    getErrorType: get_error_type,
    getOtherErrorType: get_other_error_type,
    getOwningEntity: get_owning_entity,
    getMessageID: get_message_id,
    getMessage: get_message,
    getPerceivedSeverity: get_perceived_severity,
    getProbableCause: get_probable_cause,
    getProbableCauseDescription: get_probable_cause_description,
    getRecommendedActions: get_recommended_actions,
    getErrorSource: get_error_source,
    getErrorSourceFormat: get_error_source_format,
    getOtherErrorSourceFormat: get_other_error_source_format,
    getCIMStatusCode: get_cim_status_code,
    getCIMStatusCodeDescription: get_cim_status_code_description,
    getMessageArguments: get_message_arguments,
    setErrorType: set_error_type,
    setOtherErrorType: set_other_error_type,
    setProbableCauseDescription: set_probable_cause_description,
    setRecommendedActions: set_recommended_actions,
    setErrorSource: set_error_source,
    setErrorSourceFormat: set_error_source_format,
    setOtherErrorSourceFormat: set_other_error_source_format,
    setCIMStatusCodeDescription: set_cim_status_code_description,
    setMessageArguments: set_message_arguments,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::ArenaGuard;
    use crate::broker::objects::{native_error, native_string};

    fn sample() -> *mut CMPIError {
        let data = ErrorData::new("ACME", "ACME0001", "disk full", ErrorSevHigh, ErrorProbCauseUnknown, CMPI_RC_ERR_FAILED);
        create(data, Scope::Tracked)
    }

    #[test]
    fn test_getters() {
        let _arena = ArenaGuard::push();
        let er = sample();
        unsafe {
            let mut rc = CMPIStatus::ok();
            assert_eq!(native_string(get_message(er, &mut rc)).unwrap(), "disk full");
            assert_eq!(get_perceived_severity(er, &mut rc), ErrorSevHigh);
            assert_eq!(get_cim_status_code(er, &mut rc), CMPI_RC_ERR_FAILED);

            let s = get_error_source(er, &mut rc);
            assert!(s.is_null());
            assert_eq!(rc.rc, CMPI_RC_ERR_NO_SUCH_PROPERTY);
        }
    }

    #[test]
    fn test_setters_copy_arrays() {
        let _arena = ArenaGuard::push();
        let er = sample();
        unsafe {
            assert_eq!(set_error_type(er, SoftwareError).rc, CMPI_RC_OK);
            assert_eq!(set_error_source(er, c"sda".as_ptr()).rc, CMPI_RC_OK);

            let actions = array::create(ArrayData::from_values(CMPI_string, ["retry", "replace"]), Scope::Owned);
            assert_eq!(set_recommended_actions(er, actions).rc, CMPI_RC_OK);
            assert_eq!(array::NativeArray::release(actions, &array::ARRAY_FT).rc, CMPI_RC_OK);

            let data = native_error(er).unwrap();
            assert_eq!(data.error_type, SoftwareError);
            assert_eq!(data.error_source.as_deref(), Some("sda"));
            assert_eq!(data.recommended_actions, Some(vec!["retry".to_string(), "replace".to_string()]));

            let numbers = array::create(ArrayData::from_values(CMPI_uint8, [1u8]), Scope::Tracked);
            assert_eq!(set_message_arguments(er, numbers).rc, CMPI_RC_ERR_TYPE_MISMATCH);
        }
    }
}
